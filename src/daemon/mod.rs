//! Daemon mode - the player's end of the control channel
//!
//! Listens on the control endpoint and answers each command event with an
//! acknowledgement or an error event.

pub mod handler;
pub mod player;
pub mod server;

use crate::common::Result;
use crate::ipc::QuitSignal;

pub use player::{PlaybackState, Player};
pub use server::Daemon;

/// Run in daemon mode
///
/// This is the entry point when the binary is invoked with the `daemon` command.
pub async fn run(address: &str, quit: QuitSignal) -> Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "Starting player daemon"
    );

    let daemon = Daemon::bind(address, PlaybackState::default()).await?;
    daemon.run(quit).await
}
