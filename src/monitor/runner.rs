use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capture::Screenshotter;
use crate::config::Config;
use crate::event::RoomRecord;
use crate::listing::RoomSource;
use crate::monitor::state::{MonitorState, Transition};
use crate::notify::{Notifier, messages};

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub target_room: String,
    pub check_interval: Duration,
    pub screenshot_interval: Duration,
    /// Stop after this many checks. 0 means never.
    pub max_checks: u64,
}

impl MonitorSettings {
    pub fn from_config(config: &Config, max_checks: u64) -> Self {
        Self {
            target_room: config.target_room.clone(),
            check_interval: config.check_interval(),
            screenshot_interval: config.screenshot_interval(),
            max_checks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub checks: u64,
    pub screenshots: u64,
}

/// The polling loop for a single room.
///
/// Each tick polls the listing, announces state changes and, while the room
/// is active, captures and sends a screenshot once per screenshot interval.
pub struct Monitor {
    settings: MonitorSettings,
    source: Arc<dyn RoomSource>,
    camera: Arc<dyn Screenshotter>,
    notifier: Arc<dyn Notifier>,
    state: MonitorState,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        source: Arc<dyn RoomSource>,
        camera: Arc<dyn Screenshotter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            source,
            camera,
            notifier,
            state: MonitorState::default(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            checks: self.state.check_count,
            screenshots: self.state.screenshot_count,
        }
    }

    /// Checks the notification credentials and sends the startup message.
    pub async fn self_test(&self) -> Result<()> {
        info!("Testing Telegram setup...");

        if !self.notifier.is_configured() {
            anyhow::bail!("TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must both be set");
        }

        self.notifier
            .send_text(&messages::startup(&self.settings.target_room))
            .await
            .context("Telegram rejected the startup message")?;

        info!("Telegram setup OK");
        Ok(())
    }

    /// Runs until `cancel` fires or `max_checks` is reached, then shuts down
    /// cleanly. An error escaping a tick is reported to the chat and returned.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<RunSummary> {
        info!(
            "Monitoring room {} every {:?}, screenshots every {:?}",
            self.settings.target_room, self.settings.check_interval, self.settings.screenshot_interval
        );

        match self.poll_loop(&cancel).await {
            Ok(()) => {
                self.shutdown().await;
                Ok(self.summary())
            }
            Err(e) => {
                error!("Unexpected error: {:#}", e);
                if let Err(notify_err) = self.notifier.send_text(&messages::failure(&e)).await {
                    warn!("Failed to report error to Telegram: {}", notify_err);
                }
                Err(e)
            }
        }
    }

    async fn poll_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Interrupted during check");
                    break;
                }
                result = self.tick() => result?,
            }

            if self.settings.max_checks != 0 && self.state.check_count >= self.settings.max_checks {
                info!("Reached {} checks, stopping", self.settings.max_checks);
                break;
            }

            let interval = self.settings.check_interval;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Interrupted during interval");
                    break;
                }
                _ = sleep(interval) => {}
            }
        }
        Ok(())
    }

    /// One poll of the listing and whatever it triggers.
    ///
    /// Listing, capture and delivery failures are logged and end the tick
    /// early. Only a screenshot that cannot be removed is returned as an error.
    pub async fn tick(&mut self) -> Result<()> {
        let started = Instant::now();
        self.state = self.state.begin_check();
        info!("Check #{}", self.state.check_count);

        let listing = match self.source.fetch_rooms().await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Failed to fetch room listing: {}", e);
                return Ok(());
            }
        };
        debug!("Listing has {} active rooms", listing.len());

        let target = match listing.find(&self.settings.target_room) {
            Ok(target) => target,
            Err(e) => {
                warn!("Unreadable listing entry for room {}: {}", self.settings.target_room, e);
                return Ok(());
            }
        };
        let (state, transition) = self.state.observe(target.is_some());
        self.state = state;

        match transition {
            Transition::Appeared => {
                info!("Room {} is active, starting screenshots", self.settings.target_room);
                self.announce(&messages::room_found(&self.settings.target_room))
                    .await;
            }
            Transition::Disappeared => {
                info!("Room {} became inactive, pausing screenshots", self.settings.target_room);
                self.announce(&messages::room_inactive(&self.settings.target_room))
                    .await;
            }
            Transition::StillActive | Transition::StillAbsent => {}
        }

        match target {
            Some(room) => {
                info!("Room {} players: {}", room.code, room.occupancy());
                if self
                    .state
                    .screenshot_due(started, self.settings.screenshot_interval)
                {
                    self.screenshot_cycle(&room, started).await?;
                }
            }
            None => debug!("Room {} not listed", self.settings.target_room),
        }

        Ok(())
    }

    async fn screenshot_cycle(&mut self, room: &RoomRecord, started: Instant) -> Result<()> {
        let shot = match self.camera.capture(&room.code).await {
            Ok(shot) => shot,
            Err(e) => {
                warn!("Screenshot of room {} failed: {}", room.code, e);
                return Ok(());
            }
        };

        debug!(
            "Captured room {} at {}",
            shot.room_code,
            shot.timestamp.format(messages::TIME_FORMAT)
        );

        let caption = messages::photo_caption(room, &Local::now(), self.state.next_sequence());
        let sent = self.notifier.send_photo(shot.path(), &caption).await;

        match sent {
            Ok(()) => {
                self.state = self.state.screenshot_delivered(started);
                info!("Sent screenshot #{}", self.state.screenshot_count);
            }
            Err(e) => warn!("Failed to send screenshot: {}", e),
        }

        let path = shot.path().to_path_buf();
        shot.discard()
            .with_context(|| format!("Failed to remove screenshot {}", path.display()))
    }

    async fn announce(&self, text: &str) {
        if let Err(e) = self.notifier.send_text(text).await {
            warn!("Failed to send notification: {}", e);
        }
    }

    async fn shutdown(&self) {
        info!("Stopping monitor...");
        info!(
            "Statistics: {} checks, {} screenshots sent",
            self.state.check_count, self.state.screenshot_count
        );

        if self.state.room_is_active {
            self.announce(&messages::farewell()).await;
        }
    }

    #[cfg(test)]
    fn with_state(mut self, state: MonitorState) -> Self {
        self.state = state;
        self
    }
}
