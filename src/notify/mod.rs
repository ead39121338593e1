pub mod messages;
pub mod telegram;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub use telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to read photo: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for status messages and screenshots.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether the credentials needed to deliver anything are present.
    fn is_configured(&self) -> bool {
        true
    }

    async fn send_text(&self, text: &str) -> Result<(), NotifyError>;

    /// Uploads the image at `photo`. The caller owns the file and removes it.
    async fn send_photo(&self, photo: &Path, caption: &str) -> Result<(), NotifyError>;
}
