// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is stored in `config.toml` under the user's config
//! directory (see [`default_path`]) with three sections:
//! - `[connection]`: push endpoint, reconnect backoff and keep-alive
//! - `[queue]`: offline queue capacity, retries and storage location
//! - `[http]`: request timeouts
//!
//! Every field has a default, so an empty or missing file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::live::ConnectionConfig;
use crate::offline::{HttpConfig, QueueConfig};

const APP_DIR_NAME: &str = "tether";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "TETHER_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

/// Push connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Base URL of the push server (`ws://` or `wss://`).
    #[serde(default = "default_url")]
    pub url: String,
    /// Data domain in the endpoint path (default: "weather").
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Reconnect attempts after an unexpected close before giving up (default: 5).
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_initial_reconnect_delay_ms")]
    pub initial_reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,
    /// Keep-alive ping interval in milliseconds (default: 30000). 0 = disabled.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// How long an unused topic stays connected after its last listener
    /// leaves (default: 1000).
    #[serde(default = "default_unsubscribe_grace_ms")]
    pub unsubscribe_grace_ms: u64,
}

/// Offline queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Failed replays allowed before an entry is dropped (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Where the queue is stored. Defaults to the user's data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_url() -> String {
    "ws://localhost:8000".to_string()
}

fn default_domain() -> String {
    "weather".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_initial_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

fn default_ping_interval_ms() -> u64 {
    30_000
}

fn default_unsubscribe_grace_ms() -> u64 {
    1_000
}

fn default_max_queue_size() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettings {
            url: default_url(),
            domain: default_domain(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            initial_reconnect_delay_ms: default_initial_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            ping_interval_ms: default_ping_interval_ms(),
            unsubscribe_grace_ms: default_unsubscribe_grace_ms(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings {
            max_queue_size: default_max_queue_size(),
            max_retries: default_max_retries(),
            data_dir: None,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    /// Loads configuration from `path`, or the defaults if it doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Parses and validates TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to `path`, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))
    }

    /// Checks values that would otherwise fail later at connect or enqueue time.
    pub fn validate(&self) -> Result<()> {
        let connection = &self.connection;
        let url = reqwest::Url::parse(&connection.url).map_err(|e| {
            Error::Config(format!("invalid connection.url '{}': {}", connection.url, e))
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::Config(format!(
                "invalid connection.url '{}': must be ws:// or wss://",
                connection.url
            )));
        }
        if connection.domain.is_empty() {
            return Err(Error::Config("connection.domain must not be empty".to_string()));
        }
        if connection.initial_reconnect_delay_ms > connection.max_reconnect_delay_ms {
            return Err(Error::Config(format!(
                "connection.initial_reconnect_delay_ms ({}) exceeds max_reconnect_delay_ms ({})",
                connection.initial_reconnect_delay_ms, connection.max_reconnect_delay_ms
            )));
        }
        if self.queue.max_queue_size == 0 {
            return Err(Error::Config("queue.max_queue_size must be at least 1".to_string()));
        }
        if self.queue.max_retries == 0 {
            return Err(Error::Config("queue.max_retries must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        let c = &self.connection;
        ConnectionConfig {
            url: c.url.clone(),
            domain: c.domain.clone(),
            max_reconnect_attempts: c.max_reconnect_attempts,
            initial_reconnect_delay: Duration::from_millis(c.initial_reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(c.max_reconnect_delay_ms),
            ping_interval: Duration::from_millis(c.ping_interval_ms),
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_queue_size: self.queue.max_queue_size,
            max_retries: self.queue.max_retries,
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
        }
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.connection.unsubscribe_grace_ms)
    }

    /// Directory holding the request queue.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.queue.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or(Error::NoDataDir),
        }
    }
}

/// Default config file location: `<config dir>/tether/config.toml`.
pub fn default_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| Error::Config("no config directory available".to_string()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
