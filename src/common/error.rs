//! Error types for the player control channel
//!
//! Messages are phrased for the person at the terminal: they say what failed
//! and, where there is one, what to do about it.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the player client and daemon
#[derive(Error, Debug)]
pub enum Error {
    // === Daemon/Connection Errors ===
    #[error("Player is not running (no socket at {0}). Start it with 'player daemon'")]
    DaemonNotRunning(String),

    #[error("Failed to connect to player: {0}")]
    DaemonConnectionFailed(#[source] io::Error),

    // === Transport Errors ===
    #[error("Failed to send message: {0}")]
    WriteFailed(#[source] io::Error),

    #[error("Failed to read message: {0}")]
    ReadFailed(#[source] io::Error),

    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),

    // === Codec Errors ===
    #[error("Cannot decode an empty message")]
    EmptyMessage,

    #[error("Malformed message: {0}")]
    MalformedMessage(#[source] serde_json::Error),

    #[error("Event '{actual}' does not carry a '{expected}' payload")]
    UnexpectedPayload { expected: String, actual: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an unexpected payload error
    pub fn unexpected_payload(expected: &str, actual: &str) -> Self {
        Self::UnexpectedPayload {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Map a connect failure, folding "nobody is listening" into `DaemonNotRunning`
    pub fn from_connect(address: &str, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => {
                Self::DaemonNotRunning(address.to_string())
            }
            _ => Self::DaemonConnectionFailed(e),
        }
    }

}
