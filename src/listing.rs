use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ListingConfig;
use crate::event::RoomRecord;

const POLL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay returned status {status}")]
    Status { status: u16 },

    #[error("relay error: {0}")]
    Relay(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of the current list of active rooms.
#[async_trait]
pub trait RoomSource: Send + Sync {
    async fn fetch_rooms(&self) -> Result<RoomListing, ListingError>;
}

/// Raw listing entries from one poll. Entries are decoded on demand, so a
/// malformed entry for one room never hides another.
#[derive(Debug, Clone, Default)]
pub struct RoomListing {
    entries: Vec<serde_json::Value>,
}

impl RoomListing {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes the entry whose `code` equals `code`, if listed.
    pub fn find(&self, code: &str) -> Result<Option<RoomRecord>, ListingError> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.get("code").and_then(|c| c.as_str()) == Some(code));
        match entry {
            Some(entry) => Ok(Some(RoomRecord::deserialize(entry)?)),
            None => Ok(None),
        }
    }

    /// Every entry that decodes as a room. Malformed entries are skipped.
    pub fn rooms(&self) -> Vec<RoomRecord> {
        self.entries
            .iter()
            .filter_map(|entry| RoomRecord::deserialize(entry).ok())
            .collect()
    }
}

#[cfg(test)]
impl From<Vec<RoomRecord>> for RoomListing {
    fn from(rooms: Vec<RoomRecord>) -> Self {
        Self {
            entries: rooms
                .iter()
                .map(|room| serde_json::to_value(room).unwrap())
                .collect(),
        }
    }
}

/// Relay response. `contents` carries the listing body as a string.
#[derive(Debug, Deserialize)]
struct RelayEnvelope {
    contents: Option<String>,
}

/// Fetches the public listing through the CORS relay.
pub struct RelayListing {
    client: Client,
    url: String,
}

impl RelayListing {
    pub fn new(config: &ListingConfig) -> Self {
        Self {
            client: Client::new(),
            url: relay_url(&config.relay_url, &config.listing_url),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RoomSource for RelayListing {
    async fn fetch_rooms(&self) -> Result<RoomListing, ListingError> {
        debug!("Fetching room listing from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .timeout(POLL_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_listing(&body)
    }
}

/// Appends the percent-encoded listing URL to the relay prefix.
pub fn relay_url(relay: &str, listing: &str) -> String {
    format!("{}{}", relay, urlencoding::encode(listing))
}

/// Decodes the relay envelope and the array nested inside it.
pub fn parse_listing(body: &str) -> Result<RoomListing, ListingError> {
    let envelope: RelayEnvelope = serde_json::from_str(body)?;
    let contents = envelope
        .contents
        .ok_or_else(|| ListingError::Relay("response has no contents".to_string()))?;
    Ok(RoomListing {
        entries: serde_json::from_str(&contents)?,
    })
}
