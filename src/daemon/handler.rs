//! Request handling for the daemon side of the control channel
//!
//! Every request gets exactly one reply: the command's acknowledgement, or
//! an `error` event describing why it was refused.

use crate::ipc::protocol::{self, ControlCommand, Event};

use super::player::{PlaybackError, Player};

/// Decode one raw message and produce the reply event
pub async fn handle_message<P: Player + ?Sized>(player: &mut P, bytes: &[u8]) -> Event {
    match protocol::decode(bytes) {
        Ok(event) => handle_event(player, &event).await,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid event from client");
            Event::error(format!("invalid event: {}", e))
        }
    }
}

/// Apply a request event to the player and produce the reply event
pub async fn handle_event<P: Player + ?Sized>(player: &mut P, event: &Event) -> Event {
    let Some(command) = ControlCommand::from_request(&event.kind) else {
        tracing::debug!(event_type = %event.kind, "Unsupported event");
        return Event::error(format!("unsupported event type '{}'", event.kind));
    };

    tracing::debug!(%command, created = %event.created, "Received command");

    match apply(player, command).await {
        Ok(()) => command.ack(),
        Err(e) => {
            tracing::info!(%command, error = %e, "Command refused");
            Event::error(e.to_string())
        }
    }
}

async fn apply<P: Player + ?Sized>(player: &mut P, command: ControlCommand) -> Result<(), PlaybackError> {
    match command {
        ControlCommand::Pause => player.pause().await,
        ControlCommand::Resume => player.resume().await,
        ControlCommand::Stop => player.stop().await,
    }
}
