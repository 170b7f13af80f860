//! CLI command handling
//!
//! Sends control commands to the daemon and reports the outcome.

use crate::common::config::Config;
use crate::ipc::protocol::ControlCommand;
use crate::ipc::{Orchestrator, Outcome, QuitSignal};

/// Exit code for a command the player acknowledged
pub const EXIT_OK: i32 = 0;
/// Exit code for a refused command or an unreachable player
pub const EXIT_FAILED: i32 = 1;
/// Exit code when the player never answered
pub const EXIT_TIMEOUT: i32 = 2;
/// Exit code when interrupted, following the shell's 128 + SIGINT convention
pub const EXIT_CANCELLED: i32 = 130;

/// Send a control command and print its outcome
///
/// Returns the process exit code.
pub async fn dispatch(command: ControlCommand, config: &Config, quit: QuitSignal) -> i32 {
    let orchestrator = Orchestrator::from_config(config, quit);
    let address = config.socket_name();

    println!("{}", progress_message(command));
    let outcome = orchestrator.execute(&address, command).await;
    println!("{}", render(command, &outcome));

    exit_code(&outcome)
}

/// What the CLI prints while the command is in flight
pub fn progress_message(command: ControlCommand) -> &'static str {
    match command {
        ControlCommand::Pause => "Pausing player...",
        ControlCommand::Resume => "Resuming player...",
        ControlCommand::Stop => "Stopping player...",
    }
}

/// Human-readable rendering of an outcome
pub fn render(command: ControlCommand, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Acknowledged => match command {
            ControlCommand::Pause => "Playback paused".to_string(),
            ControlCommand::Resume => "Playback resumed".to_string(),
            ControlCommand::Stop => "Playback stopped".to_string(),
        },
        Outcome::RemoteError(description) => format!("Error: {}", description),
        Outcome::Timeout(after) => {
            format!("No response from player after {}s", after.as_secs())
        }
        Outcome::CancelledByQuit => "Cancelled".to_string(),
        Outcome::TransportFailure(description) => {
            format!("Unable to reach player: {}", description)
        }
    }
}

/// Process exit code for an outcome
pub fn exit_code(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Acknowledged => EXIT_OK,
        Outcome::RemoteError(_) | Outcome::TransportFailure(_) => EXIT_FAILED,
        Outcome::Timeout(_) => EXIT_TIMEOUT,
        Outcome::CancelledByQuit => EXIT_CANCELLED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_render() {
        assert_eq!(
            render(ControlCommand::Pause, &Outcome::Acknowledged),
            "Playback paused"
        );
        assert_eq!(
            render(
                ControlCommand::Pause,
                &Outcome::RemoteError("no track loaded".into())
            ),
            "Error: no track loaded"
        );
        assert_eq!(
            render(
                ControlCommand::Stop,
                &Outcome::Timeout(Duration::from_secs(30))
            ),
            "No response from player after 30s"
        );
        assert_eq!(
            render(ControlCommand::Resume, &Outcome::CancelledByQuit),
            "Cancelled"
        );
    }

    #[test]
    fn test_only_acknowledged_exits_zero() {
        assert_eq!(exit_code(&Outcome::Acknowledged), EXIT_OK);
        assert_ne!(exit_code(&Outcome::RemoteError("x".into())), EXIT_OK);
        assert_ne!(exit_code(&Outcome::TransportFailure("x".into())), EXIT_OK);
        assert_ne!(exit_code(&Outcome::Timeout(Duration::from_secs(1))), EXIT_OK);
        assert_ne!(exit_code(&Outcome::CancelledByQuit), EXIT_OK);
    }

    #[tokio::test]
    async fn test_dispatch_without_daemon_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::parse(&format!(
            "[socket]\npath = {:?}\n",
            dir.path().join("nobody.sock")
        ))
        .unwrap();

        let code = dispatch(ControlCommand::Pause, &config, QuitSignal::new()).await;
        assert_eq!(code, EXIT_FAILED);
    }
}
