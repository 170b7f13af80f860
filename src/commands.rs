//! CLI command definitions
//!
//! Defines the clap commands for the player CLI.

use clap::Subcommand;

use crate::ipc::protocol::ControlCommand;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Pause the player
    Pause,

    /// Resume playback
    #[command(alias = "play")]
    Resume,

    /// Stop playback
    Stop,

    /// Run the player daemon in the foreground
    Daemon,
}

impl Commands {
    /// The control command this CLI command sends, if any
    pub fn control_command(self) -> Option<ControlCommand> {
        match self {
            Self::Pause => Some(ControlCommand::Pause),
            Self::Resume => Some(ControlCommand::Resume),
            Self::Stop => Some(ControlCommand::Stop),
            Self::Daemon => None,
        }
    }
}
