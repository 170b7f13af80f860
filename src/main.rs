//! Player CLI - controls the background media player
//!
//! Short-lived commands (`pause`, `resume`, `stop`) talk to the long-running
//! daemon (`player daemon`) over a local socket.

use std::path::PathBuf;

use clap::Parser;
use player::common::{config::Config, logging, Result};
use player::ipc::QuitSignal;
use player::{cli, commands::Commands, daemon};

#[derive(Parser)]
#[command(name = "player", about = "Control the background media player")]
#[command(version, long_about = None)]
struct Cli {
    /// Control socket to use instead of the configured one
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Seconds to wait for the player to answer
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Configuration file to load instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(socket) = cli.socket {
        config.socket.path = Some(socket);
    }
    if let Some(timeout) = cli.timeout {
        config.timeouts.response_secs = timeout;
    }

    let quit = QuitSignal::new();
    let _signals = quit.trigger_on_os_signals();

    match cli.command.control_command() {
        Some(command) => {
            logging::init_cli();
            Ok(cli::dispatch(command, &config, quit).await)
        }
        None => {
            let logging = logging::init_daemon();
            if let Some(path) = &logging.path {
                tracing::info!(path = %path.display(), "Logging to file");
            }
            daemon::run(&config.socket_name(), quit).await?;
            Ok(cli::EXIT_OK)
        }
    }
}
