//! Logging and tracing configuration
//!
//! The CLI writes compact diagnostics to stderr so stdout stays reserved for
//! the command result. The daemon runs in the background and logs to a file.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Keeps the daemon's file writer alive; dropping it flushes pending lines
pub struct DaemonLogging {
    /// Where the log file lives, if file logging could be set up
    pub path: Option<PathBuf>,
    _guard: Option<WorkerGuard>,
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default is WARN so a successful command prints only its result.
pub fn init_cli() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("player=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

type BoxedSubscriber = Box<dyn tracing::Subscriber + Send + Sync>;

/// Initialize tracing for the daemon (file + stderr logging)
///
/// The daemon logs to both:
/// 1. A log file at `<data dir>/player/logs/daemon.log`
/// 2. stderr (inherited from the launching shell for early errors)
pub fn init_daemon() -> DaemonLogging {
    let (subscriber, logging) = daemon_subscriber(paths::log_dir());
    subscriber.init();
    logging
}

fn daemon_subscriber(log_dir: Option<PathBuf>) -> (BoxedSubscriber, DaemonLogging) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("player=debug,info"));

    if let Some(log_dir) = log_dir {
        let appender = std::fs::create_dir_all(&log_dir).map_err(|e| e.to_string()).and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix("daemon.log")
                .build(&log_dir)
                .map_err(|e| e.to_string())
        });

        match appender {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let file_layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true);

                let subscriber = tracing_subscriber::registry()
                    .with(filter)
                    .with(file_layer)
                    .with(
                        fmt::layer()
                            .with_writer(std::io::stderr)
                            .with_target(true)
                            .with_thread_ids(false)
                            .compact(),
                    );

                return (
                    Box::new(subscriber),
                    DaemonLogging {
                        path: Some(log_dir.join("daemon.log")),
                        _guard: Some(guard),
                    },
                );
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file: {}", e);
            }
        }
    }

    // Fallback: stderr only
    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .compact(),
    );

    (
        Box::new(subscriber),
        DaemonLogging {
            path: None,
            _guard: None,
        },
    )
}
