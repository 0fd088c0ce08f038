//! Core configuration types and loading.

use super::defaults::*;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub raffle: RaffleConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name used in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prometheus metrics HTTP port. `0` disables the endpoint.
    #[serde(default)]
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            metrics_port: 0,
        }
    }
}

/// Gateway listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen_address")]
    pub address: String,
    /// Queued notices per session before the slowest sessions drop some.
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
            notice_capacity: default_notice_capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database file for the `redb` backend.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    /// Roster file with users, scopes, roles and members.
    pub roster: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RaffleConfig {
    /// Draw suspense for raffles without a `suspense_timer`.
    #[serde(default = "default_suspense_secs")]
    pub default_suspense_secs: u64,
    /// Bound for `account_age`: no account predates this.
    #[serde(default = "default_platform_epoch")]
    pub platform_epoch: DateTime<Utc>,
    /// Fixed seed for reproducible draws. Unset uses OS randomness.
    pub rng_seed: Option<u64>,
    #[serde(default = "default_mention_format")]
    pub mention_format: String,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            default_suspense_secs: default_suspense_secs(),
            platform_epoch: default_platform_epoch(),
            rng_seed: None,
            mention_format: default_mention_format(),
        }
    }
}
