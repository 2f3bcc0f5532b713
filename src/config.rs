//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the timing constants used by the dialogue, the janitor and the scheduler.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Comma-separated list of manager Telegram IDs
    #[serde(rename = "manager_id", default)]
    pub manager_ids_str: Option<String>,

    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Seconds of inactivity after which a dialogue session is dropped
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Seconds between scheduler ticks
    #[serde(default = "default_scheduler_interval_secs")]
    pub scheduler_interval_secs: u64,

    /// Contact shown to ad owners in notifications
    #[serde(default = "default_manager_help_link")]
    pub manager_help_link: String,
}

fn default_database_url() -> String {
    "sqlite://market.db?mode=rwc".to_string()
}

const fn default_session_timeout_secs() -> u64 {
    30 * 60
}

const fn default_scheduler_interval_secs() -> u64 {
    30 * 60
}

fn default_manager_help_link() -> String {
    "@birzha_manager".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use market_desk::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Eg.. `APP__SESSION_TIMEOUT_SECS=60 ./target/app`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Bare variables: TELEGRAM_TOKEN, MANAGER_ID, DATABASE_URL, ...
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // MANAGER_ID is the historical name; MANAGER_IDS is accepted too
        if settings.manager_ids_str.is_none() {
            if let Ok(val) = std::env::var("MANAGER_IDS") {
                if !val.is_empty() {
                    settings.manager_ids_str = Some(val);
                }
            }
        }

        Ok(settings)
    }

    /// Returns the set of Telegram IDs allowed to operate the console
    #[must_use]
    pub fn manager_ids(&self) -> HashSet<i64> {
        self.manager_ids_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .filter(|id| *id != 0)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Idle timeout for dialogue sessions
    #[must_use]
    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.session_timeout_secs).unwrap_or(i64::MAX / 1000))
    }

    /// Interval between scheduler ticks, never shorter than one second
    #[must_use]
    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler_interval_secs.max(1))
    }
}

// Telegram API retry policy
/// Maximum retry attempts for a Telegram API call
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

// Message cleanup timing
/// Time a freshly sent prompt stays next to the old ones before cleanup starts
pub const CLEANUP_DISPLAY_DELAY_MS: u64 = 800;
/// Pause between two fade frames of a doomed message
pub const CLEANUP_FADE_STEP_MS: u64 = 200;
/// Pause between the last fade frame and the deletion
pub const CLEANUP_FINAL_PAUSE_MS: u64 = 100;
/// Offset between the start of two consecutive fade sequences
pub const CLEANUP_STAGGER_MS: u64 = 200;
/// Delay before a manager-authored message is deleted
pub const MANAGER_MESSAGE_DELETE_DELAY_MS: u64 = 9000;

// Ignored chat log throttling
/// Seconds between two log lines about the same ignored chat
pub const IGNORED_CHAT_LOG_COOLDOWN_SECS: u64 = 1200;
/// Maximum number of ignored chats remembered
pub const IGNORED_CHAT_CACHE_MAX_SIZE: u64 = 10_000;
