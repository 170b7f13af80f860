//! IPC communication between the CLI and the player daemon
//!
//! Uses Unix domain sockets on Unix/macOS and named pipes on Windows
//! via the interprocess crate.

pub mod client;
pub mod listener;
pub mod orchestrator;
pub mod protocol;
pub mod quit;
pub mod transport;

pub use client::Connection;
pub use orchestrator::{Orchestrator, Outcome};
pub use quit::QuitSignal;
