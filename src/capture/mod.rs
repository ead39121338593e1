pub mod browser;
pub mod utils;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::event::CaptureResult;

pub use browser::BrowserCapture;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid browser configuration: {0}")]
    Config(String),

    #[error("browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),

    #[error("page closed before the network went idle")]
    NotIdle,
}

/// Produces a screenshot of a room's spectator view.
#[async_trait]
pub trait Screenshotter: Send + Sync {
    async fn capture(&self, room_code: &str) -> Result<CaptureResult, CaptureError>;
}
