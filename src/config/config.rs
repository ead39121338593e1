use anyhow::{Context, Result};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TARGET_ROOM: &str = "49r1Q8";
pub const DEFAULT_LISTING_URL: &str = "https://gartic.io/req/list?language[]=19";
pub const DEFAULT_RELAY_URL: &str = "https://api.allorigins.win/get?url=";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub target_room: String,
    /// Seconds between two checks of the listing.
    pub check_interval: u64,
    /// Minimum seconds between two delivered screenshots.
    pub screenshot_interval: u64,
    pub telegram: TelegramConfig,
    pub listing: ListingConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

impl TelegramConfig {
    pub fn has_credentials(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.bot_token.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("TelegramConfig")
            .field("bot_token", &token)
            .field("chat_id", &self.chat_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub relay_url: String,
    pub listing_url: String,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub output_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "room={}, check={}s, screenshot={}s, output={}",
            self.target_room,
            self.check_interval,
            self.screenshot_interval,
            self.capture.output_dir.display()
        )
    }
}

impl Config {
    /// Builds the configuration from the process environment, overlaid with
    /// the `KEY=VALUE` file at `env_file` when it exists.
    pub fn load_from<P: AsRef<Path>>(env_file: P) -> Result<Self> {
        let env = unicode_vars(std::env::vars_os());
        let path = env_file.as_ref();
        let file = if path.exists() { Some(path) } else { None };
        Self::load_with(env, file)
    }

    /// File values take precedence over `env`.
    pub fn load_with(mut vars: HashMap<String, String>, env_file: Option<&Path>) -> Result<Self> {
        if let Some(path) = env_file {
            let entries = dotenvy::from_path_iter(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            for entry in entries {
                let (key, value) = entry
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?;
                vars.insert(key, value);
            }
        }

        let config = Self::from_vars(&vars)?;
        config.validate()?;
        Ok(config)
    }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            target_room: text("TARGET_ROOM", DEFAULT_TARGET_ROOM),
            check_interval: seconds(vars, "CHECK_INTERVAL", 30)?,
            screenshot_interval: seconds(vars, "SCREENSHOT_INTERVAL", 30)?,
            telegram: TelegramConfig {
                bot_token: text("TELEGRAM_BOT_TOKEN", ""),
                chat_id: text("TELEGRAM_CHAT_ID", ""),
                api_url: text("TELEGRAM_API_URL", DEFAULT_TELEGRAM_API_URL),
            },
            listing: ListingConfig {
                relay_url: text("RELAY_URL", DEFAULT_RELAY_URL),
                listing_url: text("LISTING_URL", DEFAULT_LISTING_URL),
            },
            capture: CaptureConfig {
                output_dir: PathBuf::from(text("SCREENSHOT_DIR", ".")),
                chrome_path: get("CHROME_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
            },
            logging: LoggingConfig {
                level: text("LOG_LEVEL", "info"),
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_room.is_empty() {
            anyhow::bail!("TARGET_ROOM must not be empty");
        }
        if self.check_interval == 0 {
            anyhow::bail!("CHECK_INTERVAL must be greater than 0");
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn screenshot_interval(&self) -> Duration {
        Duration::from_secs(self.screenshot_interval)
    }
}

/// Keeps the variables whose name and value are both valid UTF-8.
fn unicode_vars<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn seconds(vars: &HashMap<String, String>, key: &str, default: u64) -> Result<u64> {
    match vars.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}")),
    }
}
