//! Configuration management
//!
//! Loaded once at startup and handed to the components that need it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;

/// Default location of the config file, overridable with `CONFIG_PATH`
pub const DEFAULT_CONFIG_PATH: &str = "./config/config.yaml";

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub token: Option<String>,
    #[serde(default)]
    pub debug: bool,
    /// Telegram id registered as admin on `/user_add`
    pub owner_id: Option<i64>,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageDriver {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub driver: StorageDriver,
    pub path: String,
    pub max_conn: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MediaConfig {
    pub enabled: bool,
    pub binary: PathBuf,
    #[serde(default)]
    pub audio_only: bool,
    pub max_size_mb: u64,
}

/// Identity used by the console adapter
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConsoleConfig {
    pub user_id: i64,
    pub user_name: String,
}

fn default_poll_timeout() -> i64 {
    30
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            user_id: 1,
            user_name: "console".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "misaki".to_string(),
            },
            telegram: TelegramConfig {
                token: None,
                debug: false,
                owner_id: None,
                poll_timeout: default_poll_timeout(),
            },
            database: DatabaseConfig {
                driver: StorageDriver::Sqlite,
                path: "misaki.db".to_string(),
                max_conn: 4,
            },
            media: MediaConfig {
                enabled: true,
                binary: PathBuf::from("yt-dlp"),
                audio_only: false,
                max_size_mb: 50,
            },
            console: ConsoleConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config {}: {}", path.display(), e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Config path from `CONFIG_PATH`, else the default location
    pub fn default_path() -> PathBuf {
        std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Apply `BOT_TOKEN`, `OWNER_ID` and `DATABASE_PATH` overrides
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            self.telegram.token = Some(token);
        }

        if let Ok(owner) = std::env::var("OWNER_ID") {
            let owner = owner
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidValue(format!("OWNER_ID: {}", owner)))?;
            self.telegram.owner_id = Some(owner);
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.database.path = path;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_conn == 0 {
            return Err(ConfigError::InvalidValue("database.max-conn must be at least 1".to_string()));
        }
        if self.database.driver == StorageDriver::Sqlite && self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField("database.path".to_string()));
        }
        if self.telegram.poll_timeout < 0 {
            return Err(ConfigError::InvalidValue("telegram.poll-timeout must not be negative".to_string()));
        }
        Ok(())
    }
}
