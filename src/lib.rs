//! Player control channel
//!
//! A short-lived CLI process sends one playback command to the long-running
//! player daemon over a local socket and waits, bounded by a deadline and a
//! quit signal, for the daemon's answer.

pub mod cli;
pub mod commands;
pub mod common;
pub mod daemon;
pub mod ipc;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use ipc::protocol::{ControlCommand, Event, EventType};
pub use ipc::{Orchestrator, Outcome, QuitSignal};
