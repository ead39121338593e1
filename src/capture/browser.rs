use async_trait::async_trait;
use chrono::Utc;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, EventLifecycleEvent};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use futures::{Stream, StreamExt};
use std::path::Path;
use std::pin::pin;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep, timeout};
use tracing::{debug, info};

use super::utils::{screenshot_file_name, spectator_url};
use super::{CaptureError, Screenshotter};
use crate::config::CaptureConfig;
use crate::event::CaptureResult;

const VIEWPORT_WIDTH: u32 = 1920;
const VIEWPORT_HEIGHT: u32 = 1080;
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const SETTLE_DELAY: Duration = Duration::from_secs(3);

const CHROME_ARGS: [&str; 4] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
];

/// Renders the spectator page in a fresh headless Chromium per capture.
pub struct BrowserCapture {
    config: CaptureConfig,
}

impl BrowserCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, CaptureError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(NAVIGATION_TIMEOUT)
            .args(CHROME_ARGS);

        if let Some(path) = &self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(CaptureError::Config)
    }

    /// Opens `url`, waits for network idle and the settle delay, then writes a
    /// viewport PNG to `path`.
    async fn render(browser: &Browser, url: &str, path: &Path) -> Result<(), CaptureError> {
        let page = browser.new_page("about:blank").await?;
        let frame = page.mainframe().await?.map(|id| id.inner().clone());
        let lifecycle = page.event_listener::<EventLifecycleEvent>().await?;
        let steps = lifecycle.map(|event| (event.frame_id.inner().clone(), event.name.clone()));

        info!("Opening spectator page {}", url);
        let idle = timeout(NAVIGATION_TIMEOUT, async {
            page.goto(url).await?;
            Ok::<_, CdpError>(wait_for_network_idle(steps, frame.as_deref()).await)
        })
        .await
        .map_err(|_| CaptureError::Timeout(NAVIGATION_TIMEOUT))??;
        if !idle {
            return Err(CaptureError::NotIdle);
        }

        sleep(SETTLE_DELAY).await;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        page.save_screenshot(params, path).await?;
        Ok(())
    }
}

/// Consumes `(frame_id, lifecycle_name)` pairs until `frame` reports
/// `networkIdle` for a document committed after subscribing. Returns false if
/// the stream ends first.
async fn wait_for_network_idle<S>(steps: S, frame: Option<&str>) -> bool
where
    S: Stream<Item = (String, String)>,
{
    let mut steps = pin!(steps);
    let mut committed = false;

    while let Some((frame_id, name)) = steps.next().await {
        if frame.is_some_and(|main| main != frame_id) {
            continue;
        }
        match name.as_str() {
            "init" => committed = true,
            "networkIdle" if committed => return true,
            _ => {}
        }
    }
    false
}

async fn close_browser(mut browser: Browser, handler_task: JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        debug!("Browser close failed: {}", e);
    }
    if let Err(e) = browser.wait().await {
        debug!("Browser wait failed: {}", e);
    }
    handler_task.abort();
}

/// Awaits `close` and hands the screenshot over only if rendering succeeded.
/// Dropping `shot` on any other path removes the file.
async fn finish<C>(
    shot: CaptureResult,
    rendered: Result<(), CaptureError>,
    close: C,
) -> Result<CaptureResult, CaptureError>
where
    C: Future<Output = ()>,
{
    close.await;
    rendered?;
    info!("Captured screenshot {}", shot.path().display());
    Ok(shot)
}

#[async_trait]
impl Screenshotter for BrowserCapture {
    async fn capture(&self, room_code: &str) -> Result<CaptureResult, CaptureError> {
        let timestamp = Utc::now();
        let path = self
            .config
            .output_dir
            .join(screenshot_file_name(timestamp));
        let shot = CaptureResult::new(room_code.to_string(), path, timestamp);

        let (browser, mut handler) = Browser::launch(self.browser_config()?).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let rendered = Self::render(&browser, &spectator_url(room_code), shot.path()).await;
        finish(shot, rendered, close_browser(browser, handler_task)).await
    }
}
