//! Process-wide quit signal
//!
//! A cloneable, set-once cancellation source. Every clone observes the same
//! state, and waiting on it never consumes it, so any number of in-flight
//! commands can watch one signal.

use std::future::Future;
use std::io;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Broadcast "the process is shutting down" flag
#[derive(Debug, Clone)]
pub struct QuitSignal {
    token: CancellationToken,
}

impl Default for QuitSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl QuitSignal {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Fire the signal. Later calls are no-ops; it is never reset.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has fired (immediately if it already has)
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }

    /// Fire the signal on Ctrl-C, or SIGTERM on Unix
    ///
    /// The returned task ends after firing, or when the signal is triggered
    /// by someone else.
    pub fn trigger_on_os_signals(&self) -> JoinHandle<()> {
        let quit = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                name = wait_for_os_signal() => {
                    tracing::info!(signal = name, "Quit requested");
                    quit.trigger();
                }
                _ = quit.triggered() => {}
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_os_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = interrupted(tokio::signal::ctrl_c()) => "SIGINT",
                Some(()) = sigterm.recv() => "SIGTERM",
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            interrupted(tokio::signal::ctrl_c()).await;
            "SIGINT"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() -> &'static str {
    interrupted(tokio::signal::ctrl_c()).await;
    "Ctrl-C"
}

/// Resolve when `ctrl_c` reports an interrupt
///
/// A handler that failed to install never resolves.
async fn interrupted<F>(ctrl_c: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = ctrl_c.await {
        tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_clones_observe_trigger() {
        let quit = QuitSignal::new();
        let a = quit.clone();
        let b = quit.clone();
        assert!(!a.is_triggered());

        let waiter = tokio::spawn(async move { a.triggered().await });
        quit.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(b.is_triggered());
    }

    #[tokio::test]
    async fn test_observing_does_not_consume() {
        let quit = QuitSignal::new();
        quit.trigger();
        quit.trigger();

        quit.triggered().await;
        quit.triggered().await;
        assert!(quit.is_triggered());
    }

    #[tokio::test]
    async fn test_os_signal_task_exits_when_triggered_elsewhere() {
        let quit = QuitSignal::new();
        let task = quit.trigger_on_os_signals();
        quit.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_interrupt_resolves() {
        interrupted(async { Ok(()) }).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_handler_install_never_fires() {
        let failed = async { Err(io::Error::new(io::ErrorKind::Unsupported, "no signals")) };

        let waited = tokio::time::timeout(Duration::from_secs(3600), interrupted(failed)).await;
        assert!(waited.is_err());
    }
}
