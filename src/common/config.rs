//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::{self, config_path};
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Response listener settings
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Control socket settings
    #[serde(default)]
    pub socket: SocketConfig,
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// How long a command waits for the player to answer
    #[serde(default = "default_response")]
    pub response_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            response_secs: default_response(),
        }
    }
}

fn default_response() -> u64 {
    30
}

/// Response listener configuration
#[derive(Debug, Deserialize)]
pub struct ListenerConfig {
    /// Consecutive undecodable frames after which the stream is treated as corrupt
    #[serde(default = "default_max_decode_errors")]
    pub max_consecutive_decode_errors: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_decode_errors: default_max_decode_errors(),
        }
    }
}

fn default_max_decode_errors() -> u32 {
    2
}

/// Control socket configuration
#[derive(Debug, Deserialize, Default)]
pub struct SocketConfig {
    /// Override for the default socket location
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;

        if config.timeouts.response_secs == 0 {
            return Err(super::Error::Config(
                "timeouts.response_secs must be greater than zero".to_string(),
            ));
        }
        if config.listener.max_consecutive_decode_errors == 0 {
            return Err(super::Error::Config(
                "listener.max_consecutive_decode_errors must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// The deadline a command waits for its terminal response
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.response_secs)
    }

    /// The control endpoint address, honouring the configured override
    pub fn socket_name(&self) -> String {
        match &self.socket.path {
            Some(path) => path.to_string_lossy().into_owned(),
            None => paths::socket_name(),
        }
    }
}
