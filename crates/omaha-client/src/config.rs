//! Client configuration.
//!
//! Every field has a default, so an empty TOML file yields the stock
//! client: 90 second requests, seven attempts with exponential backoff from
//! one second, first check after about seven minutes and every 45 after.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures loading or saving a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for the schema
    #[error("invalid config: {0}")]
    Parse(String),

    /// The config could not be rendered as TOML
    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

/// Main client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Updater identity sent in every request, e.g. `update_engine-0.4.0`
    #[serde(default = "default_client_version")]
    pub client_version: String,

    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Ping scheduling
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_version: default_client_version(),
            network: NetworkConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// HTTP timeouts and retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Overall timeout of a single attempt in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Delay before the first retry in milliseconds; doubles on each retry
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_ms: u64,

    /// Total attempts per request, including the first
    #[serde(default = "default_backoff_tries")]
    pub backoff_tries: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            backoff_initial_ms: default_backoff_initial(),
            backoff_tries: default_backoff_tries(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms)
    }
}

/// When the next ping or update check is due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Delay before the first ping of a session in seconds
    #[serde(default = "default_first_ping")]
    pub first_ping_secs: u64,

    /// Delay between later pings in seconds
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Width of the random window around each delay in seconds
    #[serde(default = "default_ping_fuzz")]
    pub ping_fuzz_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            first_ping_secs: default_first_ping(),
            ping_interval_secs: default_ping_interval(),
            ping_fuzz_secs: default_ping_fuzz(),
        }
    }
}

impl ScheduleConfig {
    pub fn first_ping(&self) -> Duration {
        Duration::from_secs(self.first_ping_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_fuzz(&self) -> Duration {
        Duration::from_secs(self.ping_fuzz_secs)
    }
}

// Default value functions

fn default_client_version() -> String {
    "omaha-client".to_string()
}

fn default_timeout() -> u64 {
    90
}

fn default_backoff_initial() -> u64 {
    1000
}

fn default_backoff_tries() -> u32 {
    7
}

fn default_first_ping() -> u64 {
    7 * 60
}

fn default_ping_interval() -> u64 {
    45 * 60
}

fn default_ping_fuzz() -> u64 {
    10 * 60
}
