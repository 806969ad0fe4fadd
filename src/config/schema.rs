//! Configuration schema definitions.
//!
//! This module defines the structure of the preferences file using serde.
//! All sections have defaults, so an empty file is a valid configuration.

use super::error::{ConfigError, ConfigResult};
use crate::bridge::{BridgeSettings, DEFAULT_CHUNK_SIZE, DEFAULT_READ_BACKOFF};
use crate::device::{self, Mcu, DEFAULT_DEVICE_INDEX};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::time::Duration;

/// WebSocket ports the browser app is allowed to use.
pub const PORT_RANGE: RangeInclusive<u16> = 6300..=6400;

/// Default WebSocket port.
pub const DEFAULT_PORT: u16 = 6302;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which board to look for
    pub device: DeviceConfig,
    /// WebSocket server configuration
    pub server: ServerConfig,
    /// Relay configuration
    pub bridge: BridgeConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check every value that has a constrained range.
    pub fn validate(&self) -> ConfigResult<()> {
        if device::by_index(self.device.index).is_none() {
            return Err(ConfigError::validation(
                "device.index",
                format!(
                    "{} is not a supported device. Valid choices:\n{}",
                    self.device.index,
                    device::device_list()
                ),
            ));
        }
        if !PORT_RANGE.contains(&self.server.port) {
            return Err(ConfigError::validation(
                "server.port",
                format!(
                    "{} is outside {}..={}",
                    self.server.port,
                    PORT_RANGE.start(),
                    PORT_RANGE.end()
                ),
            ));
        }
        if self.bridge.chunk_size == 0 {
            return Err(ConfigError::validation("bridge.chunk_size", "must be at least 1"));
        }
        Ok(())
    }

    /// The configured board.
    pub fn mcu(&self) -> ConfigResult<&'static Mcu> {
        device::by_index(self.device.index).ok_or_else(|| {
            ConfigError::validation("device.index", format!("{} is out of range", self.device.index))
        })
    }
}

/// Device selection section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Index into the board registry
    pub index: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_DEVICE_INDEX,
        }
    }
}

/// WebSocket server section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port on the loopback interface
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl ServerConfig {
    /// The server only ever listens on loopback.
    pub fn addr(&self) -> SocketAddr {
        crate::server::bind_addr(self.port)
    }
}

/// Relay section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Mirror traffic to stdout
    pub verbose: bool,
    /// Bytes per serial read
    pub chunk_size: usize,
    /// Pause after a failed serial read, in milliseconds
    pub read_backoff_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_backoff_ms: DEFAULT_READ_BACKOFF.as_millis() as u64,
        }
    }
}

impl BridgeConfig {
    pub fn settings(&self) -> BridgeSettings {
        BridgeSettings {
            chunk_size: self.chunk_size,
            read_backoff: Duration::from_millis(self.read_backoff_ms),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
