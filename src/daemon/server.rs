//! Daemon server - IPC listener and connection loop

use std::path::Path;
use std::sync::Arc;

use interprocess::local_socket::traits::tokio::Listener as ListenerTrait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use crate::common::{paths, Result};
use crate::ipc::{protocol, transport, QuitSignal};

use super::handler;
use super::player::Player;

/// Control endpoint server
pub struct Daemon<P> {
    address: String,
    listener: transport::Listener,
    player: Arc<Mutex<P>>,
}

impl<P: Player + 'static> Daemon<P> {
    /// Start listening on `address`
    pub async fn bind(address: &str, player: P) -> Result<Self> {
        let listener = transport::create_listener(address).await?;
        tracing::info!(address, "Daemon listening");

        Ok(Self {
            address: address.to_string(),
            listener,
            player: Arc::new(Mutex::new(player)),
        })
    }

    /// Shared handle to the player, for inspecting state
    pub fn player(&self) -> Arc<Mutex<P>> {
        self.player.clone()
    }

    /// Accept clients until the quit signal fires
    pub async fn run(self, quit: QuitSignal) -> Result<()> {
        loop {
            tokio::select! {
                _ = quit.triggered() => {
                    tracing::info!("Quit requested, shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok(stream) => {
                            let player = self.player.clone();
                            let quit = quit.clone();
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, player, quit).await {
                                    tracing::error!("Error handling client: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
            }
        }

        drop(self.listener);
        paths::remove_socket(Path::new(&self.address))?;
        tracing::info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Answer requests on one client connection until it closes
pub async fn serve_connection<S, P>(stream: S, player: Arc<Mutex<P>>, quit: QuitSignal) -> Result<()>
where
    S: AsyncRead + AsyncWrite,
    P: Player + ?Sized,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    loop {
        let request = tokio::select! {
            _ = quit.triggered() => break,
            received = transport::recv_message(&mut reader) => received,
        };

        let bytes = match request {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!("Client disconnected");
                break;
            }
            Err(e) => {
                tracing::error!("Error reading request: {}", e);
                break;
            }
        };

        let reply = {
            let mut player = player.lock().await;
            handler::handle_message(&mut *player, &bytes).await
        };

        let json = protocol::encode(&reply)?;
        transport::send_message(&mut writer, &json).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::player::{PlaybackState, PlaybackStatus};
    use crate::ipc::protocol::{decode, encode, ControlCommand, EventType};
    use crate::ipc::transport::{recv_message, send_message};

    #[tokio::test]
    async fn test_serves_requests_in_order() {
        let (client, server) = tokio::io::duplex(4096);
        let mut state = PlaybackState::default();
        state.load("Flamenco Sketches");
        let player = Arc::new(Mutex::new(state));

        let task = tokio::spawn(serve_connection(server, player.clone(), QuitSignal::new()));

        let (mut reader, mut writer) = tokio::io::split(client);
        for (command, ack) in [
            (ControlCommand::Pause, EventType::Paused),
            (ControlCommand::Resume, EventType::Resumed),
            (ControlCommand::Stop, EventType::Stopped),
        ] {
            send_message(&mut writer, &encode(&command.request()).unwrap())
                .await
                .unwrap();
            let reply = recv_message(&mut reader).await.unwrap().unwrap();
            assert_eq!(decode(&reply).unwrap().kind, ack);
        }

        drop(writer);
        drop(reader);
        task.await.unwrap().unwrap();
        assert_eq!(player.lock().await.status(), PlaybackStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stops_on_quit() {
        let (_client, server) = tokio::io::duplex(4096);
        let player = Arc::new(Mutex::new(PlaybackState::default()));
        let quit = QuitSignal::new();

        let task = tokio::spawn(serve_connection(server, player, quit.clone()));
        quit.trigger();

        task.await.unwrap().unwrap();
    }
}
