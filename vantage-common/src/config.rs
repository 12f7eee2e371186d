//! Configuration loading
//!
//! Configuration comes from a TOML file resolved in priority order:
//! 1. Explicit path (command-line argument)
//! 2. `VANTAGE_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/vantage/config.toml` on Linux)
//!
//! A missing file is not an error; every field has a default so the services
//! can start against a local database with no config at all.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path; defaults to the platform data directory
    pub path: Option<PathBuf>,
}

/// The single channel this deployment tracks
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelConfig {
    /// Channel login name (lowercase), e.g. "vaarattu"
    #[serde(default)]
    pub login: String,
    /// Numeric broadcaster user id, required for Helix queries
    #[serde(default)]
    pub broadcaster_id: String,
}

/// Helix API credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwitchConfig {
    #[serde(default)]
    pub client_id: String,
    /// User access token with `moderator:read:chatters` scope
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Drift-correction poll interval (live-status ground truth)
    #[serde(default = "default_poll_secs")]
    pub drift_interval_secs: u64,
    /// Chatter snapshot poll interval while a stream is live
    #[serde(default = "default_poll_secs")]
    pub chatter_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Bind address for the dashboard API
    #[serde(default = "default_web_bind")]
    pub bind: String,
}

fn default_poll_secs() -> u64 {
    300
}

fn default_web_bind() -> String {
    "127.0.0.1:8150".to_string()
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            drift_interval_secs: default_poll_secs(),
            chatter_interval_secs: default_poll_secs(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_web_bind(),
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(p) => Some(p.to_path_buf()),
            None => resolve_config_path(),
        };

        match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)?;
                let config: Config = toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Some(path) => {
                info!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                Ok(Config::default())
            }
            None => {
                info!("No config directory available, using defaults");
                Ok(Config::default())
            }
        }
    }

    /// Resolve the database file path.
    ///
    /// Priority: `VANTAGE_DB` environment variable, then the config file,
    /// then `<platform data dir>/vantage/vantage.db`.
    pub fn database_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("VANTAGE_DB") {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join("vantage").join("vantage.db"))
            .unwrap_or_else(|| PathBuf::from("./vantage.db"))
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("VANTAGE_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("vantage").join("config.toml"))
}
