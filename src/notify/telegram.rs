use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{Notifier, NotifyError};
use crate::config::TelegramConfig;

const MESSAGE_TIMEOUT: Duration = Duration::from_secs(10);
const PHOTO_TIMEOUT: Duration = Duration::from_secs(30);
const PARSE_MODE: &str = "Markdown";

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Bot API client bound to one chat.
pub struct TelegramNotifier {
    config: TelegramConfig,
    http_client: Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn is_configured(&self) -> bool {
        self.config.has_credentials()
    }

    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let body = SendMessageBody {
            chat_id: &self.config.chat_id,
            text,
            parse_mode: PARSE_MODE,
        };

        let response = self
            .http_client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .timeout(MESSAGE_TIMEOUT)
            .send()
            .await?;

        check(response).await
    }

    async fn send_photo(&self, photo: &Path, caption: &str) -> Result<(), NotifyError> {
        let bytes = tokio::fs::read(photo).await?;
        debug!("Uploading {} ({} bytes)", photo.display(), bytes.len());

        let file_name = photo
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "screenshot.png".to_string());
        let part = Part::bytes(bytes).file_name(file_name).mime_str("image/png")?;
        let form = Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", caption.to_string())
            .text("parse_mode", PARSE_MODE)
            .part("photo", part);

        let response = self
            .http_client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .timeout(PHOTO_TIMEOUT)
            .send()
            .await?;

        check(response).await
    }
}

async fn check(response: Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    Err(NotifyError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{closed_port, serve_once};

    fn notifier(api_url: &str) -> TelegramNotifier {
        TelegramNotifier::new(TelegramConfig {
            bot_token: "123:ABC".to_string(),
            chat_id: "-1001".to_string(),
            api_url: api_url.to_string(),
        })
    }

    #[test]
    fn test_method_url() {
        let notifier = notifier("https://api.telegram.org/");
        assert_eq!(
            notifier.method_url("sendMessage"),
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn test_is_configured() {
        assert!(notifier("http://localhost").is_configured());
        let empty = TelegramNotifier::new(TelegramConfig {
            bot_token: String::new(),
            chat_id: "-1001".to_string(),
            api_url: "http://localhost".to_string(),
        });
        assert!(!empty.is_configured());
    }

    #[tokio::test]
    async fn test_send_text() {
        let (base, server) = serve_once("200 OK", r#"{"ok":true}"#).await;
        notifier(&base).send_text("*hello*").await.unwrap();

        let request = server.await.unwrap();
        assert!(request.request_line().starts_with("POST /bot123:ABC/sendMessage"));
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["chat_id"], "-1001");
        assert_eq!(body["text"], "*hello*");
        assert_eq!(body["parse_mode"], "Markdown");
    }

    #[tokio::test]
    async fn test_send_text_rejected() {
        let (base, server) = serve_once(
            "400 Bad Request",
            r#"{"ok":false,"description":"chat not found"}"#,
        )
        .await;
        let err = notifier(&base).send_text("hi").await.unwrap_err();
        match err {
            NotifyError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("chat not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_photo() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("screenshot_1.png");
        std::fs::write(&photo, b"\x89PNG fake").unwrap();

        let (base, server) = serve_once("200 OK", r#"{"ok":true}"#).await;
        notifier(&base)
            .send_photo(&photo, "players 3/8")
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.request_line().starts_with("POST /bot123:ABC/sendPhoto"));
        assert!(request.head.to_ascii_lowercase().contains("multipart/form-data"));
        let body = request.body_text();
        assert!(body.contains("name=\"chat_id\""));
        assert!(body.contains("name=\"photo\"; filename=\"screenshot_1.png\""));
        assert!(body.contains("players 3/8"));
    }

    #[tokio::test]
    async fn test_send_photo_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = closed_port().await;
        let err = notifier(&base)
            .send_photo(&dir.path().join("gone.png"), "caption")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Io(_)));
    }

    #[tokio::test]
    async fn test_send_text_unreachable() {
        let base = closed_port().await;
        let err = notifier(&base).send_text("hi").await.unwrap_err();
        assert!(matches!(err, NotifyError::Http(_)));
    }
}
