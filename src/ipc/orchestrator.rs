//! Command orchestration
//!
//! Turns one fire-and-forget write into a bounded result: send the request,
//! then race the daemon's answer against a deadline and the quit signal.
//!
//! ```text
//! Idle -> Sending -> AwaitingResponse -> Done(Outcome)
//!    \________\______________________/
//!       connect/write failure or quit
//! ```
//!
//! Every path ends in exactly one [`Outcome`], and the connection is closed
//! before it is returned. Nothing is retried.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::common::config::Config;

use super::client::Connection;
use super::listener::ResponseListener;
use super::protocol::{self, ControlCommand, Event, EventType};
use super::quit::QuitSignal;

/// Default time to wait for the daemon's answer
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Terminal result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The daemon acknowledged the command
    Acknowledged,
    /// The daemon answered with an error event
    RemoteError(String),
    /// No answer arrived within the deadline
    Timeout(Duration),
    /// The quit signal fired before an answer arrived
    CancelledByQuit,
    /// Connecting or sending failed
    TransportFailure(String),
}

impl Outcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Self::Acknowledged)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acknowledged => write!(f, "command acknowledged"),
            Self::RemoteError(description) => write!(f, "remote error: {}", description),
            Self::Timeout(after) => write!(f, "timed out after {}s", after.as_secs_f64()),
            Self::CancelledByQuit => write!(f, "cancelled"),
            Self::TransportFailure(description) => write!(f, "transport failure: {}", description),
        }
    }
}

/// Where a command is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandState {
    Idle,
    Sending,
    AwaitingResponse,
    Done(Outcome),
}

/// One command's trip through the state machine
struct CommandRun {
    command: ControlCommand,
    state: CommandState,
}

impl CommandRun {
    fn new(command: ControlCommand) -> Self {
        Self {
            command,
            state: CommandState::Idle,
        }
    }

    fn advance(&mut self, next: CommandState) {
        tracing::debug!(command = %self.command, from = ?self.state, to = ?next, "Command state");
        self.state = next;
    }

    fn finish(mut self, outcome: Outcome) -> Outcome {
        self.advance(CommandState::Done(outcome.clone()));
        outcome
    }
}

/// Sends commands to the daemon and waits for their outcome
#[derive(Debug, Clone)]
pub struct Orchestrator {
    timeout: Duration,
    max_consecutive_decode_errors: u32,
    quit: QuitSignal,
}

impl Orchestrator {
    /// Create an orchestrator with the default deadline
    pub fn new(quit: QuitSignal) -> Self {
        Self {
            timeout: DEFAULT_RESPONSE_TIMEOUT,
            max_consecutive_decode_errors: 2,
            quit,
        }
    }

    /// Create an orchestrator using the configured deadline and listener limits
    pub fn from_config(config: &Config, quit: QuitSignal) -> Self {
        Self {
            timeout: config.response_timeout(),
            max_consecutive_decode_errors: config.listener.max_consecutive_decode_errors,
            quit,
        }
    }

    /// Override the response deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connect to `address`, send `command`, and wait for its outcome
    pub async fn execute(&self, address: &str, command: ControlCommand) -> Outcome {
        let mut run = CommandRun::new(command);
        run.advance(CommandState::Sending);

        let connected = tokio::select! {
            biased;
            _ = self.quit.triggered() => return run.finish(Outcome::CancelledByQuit),
            connected = Connection::connect(address) => connected,
        };

        match connected {
            Ok(conn) => self.drive(run, conn).await,
            Err(e) => run.finish(Outcome::TransportFailure(e.to_string())),
        }
    }

    /// Send `command` over an existing connection and wait for its outcome
    ///
    /// Takes ownership of the connection; it is closed before returning.
    pub async fn execute_on<S>(&self, conn: Connection<S>, command: ControlCommand) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mut run = CommandRun::new(command);
        run.advance(CommandState::Sending);
        self.drive(run, conn).await
    }

    async fn drive<S>(&self, mut run: CommandRun, mut conn: Connection<S>) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let outcome = self.exchange(&mut run, &mut conn).await;
        conn.close().await;

        if outcome.is_acknowledged() {
            tracing::info!(command = %run.command, "Command acknowledged");
        } else {
            tracing::info!(command = %run.command, %outcome, "Command did not succeed");
        }
        run.finish(outcome)
    }

    async fn exchange<S>(&self, run: &mut CommandRun, conn: &mut Connection<S>) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let command = run.command;
        let bytes = match protocol::encode(&command.request()) {
            Ok(bytes) => bytes,
            Err(e) => return Outcome::TransportFailure(e.to_string()),
        };

        let written = tokio::select! {
            biased;
            _ = self.quit.triggered() => return Outcome::CancelledByQuit,
            written = conn.write_message(&bytes) => written,
        };
        if let Err(e) = written {
            return Outcome::TransportFailure(e.to_string());
        }
        run.advance(CommandState::AwaitingResponse);

        let Some(reader) = conn.take_reader() else {
            return Outcome::TransportFailure("connection has no read half".to_string());
        };
        let (listener, mut answer) = ResponseListener::new(command.ack_type())
            .max_consecutive_decode_errors(self.max_consecutive_decode_errors)
            .spawn(reader);

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        // If the listener stops without an answer its branch is disabled and
        // the race continues on the other two.
        let outcome = tokio::select! {
            biased;
            _ = self.quit.triggered() => Outcome::CancelledByQuit,
            Ok(event) = &mut answer => resolve(event),
            _ = &mut deadline => Outcome::Timeout(self.timeout),
        };

        listener.cancel();
        outcome
    }
}

/// Map a terminal event to its outcome
fn resolve(event: Event) -> Outcome {
    match event.kind {
        EventType::Error => match event.error_payload() {
            Ok(payload) => Outcome::RemoteError(payload.error),
            Err(e) => Outcome::RemoteError(format!("unreadable error payload ({})", e)),
        },
        _ => Outcome::Acknowledged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::protocol::{decode, encode};
    use crate::ipc::transport::{recv_message, send_message};
    use tokio::io::DuplexStream;
    use tokio::time::Instant;

    fn pair() -> (Connection<DuplexStream>, DuplexStream) {
        let (client, daemon) = tokio::io::duplex(4096);
        (Connection::from_stream(client, "test"), daemon)
    }

    async fn expect_request(daemon: &mut DuplexStream, kind: EventType) {
        let bytes = recv_message(daemon).await.unwrap().unwrap();
        assert_eq!(decode(&bytes).unwrap().kind, kind);
    }

    async fn reply(daemon: &mut DuplexStream, event: &Event) {
        send_message(daemon, &encode(event).unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_acknowledged() {
        let (conn, mut daemon) = pair();
        let orchestrator = Orchestrator::new(QuitSignal::new());

        let daemon_task = tokio::spawn(async move {
            expect_request(&mut daemon, EventType::Pause).await;
            reply(&mut daemon, &Event::new(EventType::Paused)).await;
            // Connection is closed once the outcome is produced
            assert!(recv_message(&mut daemon).await.unwrap().is_none());
        });

        let outcome = orchestrator.execute_on(conn, ControlCommand::Pause).await;
        assert_eq!(outcome, Outcome::Acknowledged);
        daemon_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_remote_error() {
        let (conn, mut daemon) = pair();
        let orchestrator = Orchestrator::new(QuitSignal::new());

        tokio::spawn(async move {
            expect_request(&mut daemon, EventType::Pause).await;
            reply(&mut daemon, &Event::error("disk full")).await;
            let _ = recv_message(&mut daemon).await;
        });

        let outcome = orchestrator.execute_on(conn, ControlCommand::Pause).await;
        assert_eq!(outcome, Outcome::RemoteError("disk full".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_without_timestamp() {
        let (conn, mut daemon) = pair();
        let orchestrator = Orchestrator::new(QuitSignal::new());

        tokio::spawn(async move {
            expect_request(&mut daemon, EventType::Pause).await;
            send_message(&mut daemon, br#"{"type":"error","payload":{"error":"disk full"}}"#)
                .await
                .unwrap();
            let _ = recv_message(&mut daemon).await;
        });

        let outcome = orchestrator.execute_on(conn, ControlCommand::Pause).await;
        assert_eq!(outcome, Outcome::RemoteError("disk full".to_string()));

        let (conn, mut daemon) = pair();
        tokio::spawn(async move {
            expect_request(&mut daemon, EventType::Stop).await;
            send_message(&mut daemon, br#"{"type":"stopped"}"#).await.unwrap();
            let _ = recv_message(&mut daemon).await;
        });

        let outcome = orchestrator.execute_on(conn, ControlCommand::Stop).await;
        assert_eq!(outcome, Outcome::Acknowledged);
    }

    #[tokio::test]
    async fn test_error_without_description_is_still_remote_error() {
        let (conn, mut daemon) = pair();
        let orchestrator = Orchestrator::new(QuitSignal::new());

        tokio::spawn(async move {
            expect_request(&mut daemon, EventType::Stop).await;
            reply(&mut daemon, &Event::new(EventType::Error)).await;
            let _ = recv_message(&mut daemon).await;
        });

        let outcome = orchestrator.execute_on(conn, ControlCommand::Stop).await;
        assert!(matches!(outcome, Outcome::RemoteError(_)), "got {outcome:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_when_daemon_silent() {
        let (conn, mut daemon) = pair();
        let orchestrator = Orchestrator::new(QuitSignal::new());

        let daemon_task = tokio::spawn(async move {
            expect_request(&mut daemon, EventType::Pause).await;
            // Never answer, just wait for the client to hang up
            assert!(recv_message(&mut daemon).await.unwrap().is_none());
        });

        let start = Instant::now();
        let outcome = orchestrator.execute_on(conn, ControlCommand::Pause).await;
        let waited = start.elapsed();

        assert_eq!(outcome, Outcome::Timeout(Duration::from_secs(30)));
        assert!(waited >= Duration::from_secs(30));
        assert!(waited < Duration::from_secs(31));
        daemon_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_without_answer_waits_for_deadline() {
        let (conn, mut daemon) = pair();
        let orchestrator =
            Orchestrator::new(QuitSignal::new()).with_timeout(Duration::from_secs(5));

        tokio::spawn(async move {
            expect_request(&mut daemon, EventType::Pause).await;
            drop(daemon);
        });

        let start = Instant::now();
        let outcome = orchestrator.execute_on(conn, ControlCommand::Pause).await;

        assert_eq!(outcome, Outcome::Timeout(Duration::from_secs(5)));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_before_answer_wins() {
        let (conn, mut daemon) = pair();
        let quit = QuitSignal::new();
        let orchestrator = Orchestrator::new(quit.clone());

        tokio::spawn(async move {
            expect_request(&mut daemon, EventType::Pause).await;
            tokio::time::sleep(Duration::from_secs(1)).await;
            quit.trigger();
            // Answer arrives just after the quit signal
            tokio::time::sleep(Duration::from_millis(1)).await;
            let _ = send_message(&mut daemon, &encode(&Event::new(EventType::Paused)).unwrap())
                .await;
            let _ = recv_message(&mut daemon).await;
        });

        let outcome = orchestrator.execute_on(conn, ControlCommand::Pause).await;
        assert_eq!(outcome, Outcome::CancelledByQuit);
    }

    #[tokio::test]
    async fn test_quit_already_fired_sends_nothing() {
        let (conn, mut daemon) = pair();
        let quit = QuitSignal::new();
        quit.trigger();
        let orchestrator = Orchestrator::new(quit);

        let outcome = orchestrator.execute_on(conn, ControlCommand::Resume).await;
        assert_eq!(outcome, Outcome::CancelledByQuit);

        // Only the close is visible to the daemon
        assert!(recv_message(&mut daemon).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_frame_then_ack() {
        let (conn, mut daemon) = pair();
        let orchestrator = Orchestrator::new(QuitSignal::new());

        tokio::spawn(async move {
            expect_request(&mut daemon, EventType::Pause).await;
            send_message(&mut daemon, b"not an event").await.unwrap();
            reply(&mut daemon, &Event::new(EventType::Paused)).await;
            let _ = recv_message(&mut daemon).await;
        });

        let outcome = orchestrator.execute_on(conn, ControlCommand::Pause).await;
        assert_eq!(outcome, Outcome::Acknowledged);
    }

    #[tokio::test]
    async fn test_write_failure_is_transport_failure() {
        let (conn, daemon) = pair();
        drop(daemon);
        let orchestrator = Orchestrator::new(QuitSignal::new());

        let outcome = orchestrator.execute_on(conn, ControlCommand::Pause).await;
        assert!(matches!(outcome, Outcome::TransportFailure(_)), "got {outcome:?}");
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = Config::parse("[timeouts]\nresponse_secs = 7\n").unwrap();
        let orchestrator = Orchestrator::from_config(&config, QuitSignal::new());
        assert_eq!(orchestrator.timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_outcome_rendering() {
        assert_eq!(Outcome::Acknowledged.to_string(), "command acknowledged");
        assert_eq!(
            Outcome::RemoteError("no track loaded".into()).to_string(),
            "remote error: no track loaded"
        );
        assert_eq!(
            Outcome::Timeout(Duration::from_secs(30)).to_string(),
            "timed out after 30s"
        );
        assert_eq!(Outcome::CancelledByQuit.to_string(), "cancelled");
    }
}
