//! HeritageBot configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main HeritageBot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeritageBotConfig {
    /// Channel configurations
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Session lifecycle configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Channel start-up retry configuration
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

impl HeritageBotConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Default config file location (`<config dir>/heritagebot/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("heritagebot").join("config.toml"))
    }
}

/// Channel configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Telegram channel config
    pub telegram: Option<TelegramConfig>,
}

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Name of the environment variable holding the bot token
    #[serde(default = "default_token_ref")]
    pub bot_token_ref: String,

    /// Allowed user IDs (empty = all allowed)
    #[serde(default)]
    pub allowed_users: Vec<i64>,

    /// Bot API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Long-poll timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_token_ref() -> String {
    "HERITAGEBOT_TELEGRAM_TOKEN".to_string()
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_ref: default_token_ref(),
            allowed_users: Vec::new(),
            api_base_url: default_api_base_url(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Evict sessions idle longer than this many seconds (0 = never)
    pub max_idle_secs: u64,

    /// How often the idle sweeper runs, in seconds
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_idle_secs: 0,
            sweep_interval_secs: 300,
        }
    }
}

/// Channel start-up retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Delay before the first retry, in milliseconds
    pub initial_backoff_ms: u64,

    /// Upper bound for the retry delay, in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
        }
    }
}
