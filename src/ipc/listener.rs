//! Response listener
//!
//! Runs as its own task, reading events off the connection until the daemon
//! answers the outstanding command. The answer is delivered once through a
//! oneshot channel. If the connection ends first, the channel is dropped
//! without a value: a disconnect is "no answer", never success.

use tokio::io::AsyncRead;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::client;
use super::protocol::{self, Event, EventType};

/// Why the listener task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// A terminal event was delivered
    Terminal,
    /// The daemon closed the connection before answering
    Disconnected,
    /// The transport failed while reading
    ReadFailed,
    /// Too many consecutive frames failed to decode
    Corrupted,
}

/// Handle to a running listener task
///
/// Dropping the handle cancels the task.
pub struct ListenerHandle {
    task: Option<JoinHandle<ListenerExit>>,
}

impl ListenerHandle {
    /// Request cancellation of the listener task
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// Wait for the task and return its exit reason
    ///
    /// Returns `None` if the task was cancelled.
    pub async fn join(mut self) -> Option<ListenerExit> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Reads daemon events until the answer to one command shows up
#[derive(Debug, Clone)]
pub struct ResponseListener {
    expected: EventType,
    max_consecutive_decode_errors: u32,
}

impl ResponseListener {
    /// Listen for `expected` (the command's acknowledgement) or an error event
    pub fn new(expected: EventType) -> Self {
        Self {
            expected,
            max_consecutive_decode_errors: 2,
        }
    }

    /// Set how many undecodable frames in a row end the listener
    pub fn max_consecutive_decode_errors(mut self, limit: u32) -> Self {
        self.max_consecutive_decode_errors = limit.max(1);
        self
    }

    /// Whether `event` answers the outstanding command
    pub fn is_terminal(&self, event: &Event) -> bool {
        event.kind == self.expected || event.kind == EventType::Error
    }

    /// Spawn the listener on `reader`
    pub fn spawn<R>(self, reader: R) -> (ListenerHandle, oneshot::Receiver<Event>)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(reader, done_tx));
        (ListenerHandle { task: Some(task) }, done_rx)
    }

    async fn run<R>(self, mut reader: R, done: oneshot::Sender<Event>) -> ListenerExit
    where
        R: AsyncRead + Unpin,
    {
        let mut consecutive_errors = 0u32;

        loop {
            let bytes = match client::read_message(&mut reader).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    tracing::debug!("Player closed the connection without answering");
                    return ListenerExit::Disconnected;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Read from player failed");
                    return ListenerExit::ReadFailed;
                }
            };

            let event = match protocol::decode(&bytes) {
                Ok(event) => {
                    consecutive_errors = 0;
                    event
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(error = %e, consecutive_errors, "Error reading event");
                    if consecutive_errors >= self.max_consecutive_decode_errors {
                        tracing::warn!("Stream from player looks corrupt, no longer listening");
                        return ListenerExit::Corrupted;
                    }
                    continue;
                }
            };

            if self.is_terminal(&event) {
                tracing::debug!(event_type = %event.kind, "Received answer");
                // The receiver may already be gone if the command gave up
                let _ = done.send(event);
                return ListenerExit::Terminal;
            }

            tracing::debug!(event_type = %event.kind, "Ignoring event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::protocol::encode;
    use crate::ipc::transport::send_message;

    async fn send_event(w: &mut tokio::io::DuplexStream, event: &Event) {
        send_message(w, &encode(event).unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_delivers_acknowledgement() {
        let (client, mut daemon) = tokio::io::duplex(4096);
        let (handle, rx) = ResponseListener::new(EventType::Paused).spawn(client);

        send_event(&mut daemon, &Event::new(EventType::Paused)).await;

        assert_eq!(rx.await.unwrap().kind, EventType::Paused);
        assert_eq!(handle.join().await, Some(ListenerExit::Terminal));
    }

    #[tokio::test]
    async fn test_delivers_error_event() {
        let (client, mut daemon) = tokio::io::duplex(4096);
        let (_handle, rx) = ResponseListener::new(EventType::Paused).spawn(client);

        send_event(&mut daemon, &Event::error("disk full")).await;

        let event = rx.await.unwrap();
        assert_eq!(event.error_payload().unwrap().error, "disk full");
    }

    #[tokio::test]
    async fn test_tolerates_one_malformed_frame() {
        let (client, mut daemon) = tokio::io::duplex(4096);
        let (handle, rx) = ResponseListener::new(EventType::Paused).spawn(client);

        send_message(&mut daemon, b"{garbage").await.unwrap();
        send_event(&mut daemon, &Event::new(EventType::Paused)).await;

        assert_eq!(rx.await.unwrap().kind, EventType::Paused);
        assert_eq!(handle.join().await, Some(ListenerExit::Terminal));
    }

    #[tokio::test]
    async fn test_consecutive_malformed_frames_stop_listener() {
        let (client, mut daemon) = tokio::io::duplex(4096);
        let (handle, rx) = ResponseListener::new(EventType::Paused).spawn(client);

        send_message(&mut daemon, b"{garbage").await.unwrap();
        send_message(&mut daemon, b"").await.unwrap();

        assert!(rx.await.is_err());
        assert_eq!(handle.join().await, Some(ListenerExit::Corrupted));
    }

    #[tokio::test]
    async fn test_decode_error_budget_resets_after_good_frame() {
        let (client, mut daemon) = tokio::io::duplex(4096);
        let (handle, rx) = ResponseListener::new(EventType::Paused).spawn(client);

        send_message(&mut daemon, b"bad").await.unwrap();
        send_event(&mut daemon, &Event::new(EventType::Other("heartbeat".into()))).await;
        send_message(&mut daemon, b"bad").await.unwrap();
        send_event(&mut daemon, &Event::new(EventType::Paused)).await;

        assert_eq!(rx.await.unwrap().kind, EventType::Paused);
        assert_eq!(handle.join().await, Some(ListenerExit::Terminal));
    }

    #[tokio::test]
    async fn test_ignores_unrelated_events() {
        let (client, mut daemon) = tokio::io::duplex(4096);
        let (_handle, rx) = ResponseListener::new(EventType::Paused).spawn(client);

        send_event(&mut daemon, &Event::new(EventType::Resumed)).await;
        send_event(&mut daemon, &Event::new(EventType::Pause)).await;
        send_event(&mut daemon, &Event::new(EventType::Paused)).await;

        assert_eq!(rx.await.unwrap().kind, EventType::Paused);
    }

    #[tokio::test]
    async fn test_disconnect_produces_no_answer() {
        let (client, daemon) = tokio::io::duplex(4096);
        let (handle, rx) = ResponseListener::new(EventType::Paused).spawn(client);

        drop(daemon);

        assert!(rx.await.is_err());
        assert_eq!(handle.join().await, Some(ListenerExit::Disconnected));
    }

    #[tokio::test]
    async fn test_truncated_frame_ends_listener() {
        use tokio::io::AsyncWriteExt;

        let (client, mut daemon) = tokio::io::duplex(4096);
        let (handle, rx) = ResponseListener::new(EventType::Paused).spawn(client);

        daemon.write_all(&[64, 0, 0, 0, b'{']).await.unwrap();
        drop(daemon);

        assert!(rx.await.is_err());
        assert_eq!(handle.join().await, Some(ListenerExit::ReadFailed));
    }

    #[tokio::test]
    async fn test_cancel() {
        let (client, _daemon) = tokio::io::duplex(4096);
        let (handle, rx) = ResponseListener::new(EventType::Paused).spawn(client);

        handle.cancel();

        assert!(rx.await.is_err());
        assert_eq!(handle.join().await, None);
    }
}
