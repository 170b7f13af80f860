//! CLI-side connection to the player daemon

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::common::{Error, Result};

use super::transport::{self, Stream};

/// A duplex connection to the daemon, owned by one command
///
/// The read half can be handed to a response listener; the write half stays
/// here until [`Connection::close`]. Dropping the connection releases both
/// halves as well, so every exit path frees the socket.
pub struct Connection<S = Stream> {
    address: String,
    reader: Option<ReadHalf<S>>,
    writer: Option<WriteHalf<S>>,
    closed: bool,
}

impl Connection<Stream> {
    /// Connect to the daemon listening at `address`
    pub async fn connect(address: &str) -> Result<Self> {
        let stream = transport::connect(address)
            .await
            .map_err(|e| Error::from_connect(address, e))?;

        tracing::debug!(address, "Connected to player");
        Ok(Self::from_stream(stream, address))
    }
}

impl<S: AsyncRead + AsyncWrite> Connection<S> {
    /// Wrap an already-established stream
    pub fn from_stream(stream: S, address: impl Into<String>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            address: address.into(),
            reader: Some(reader),
            writer: Some(writer),
            closed: false,
        }
    }

    /// Send one complete message
    pub async fn write_message(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            Error::WriteFailed(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "connection is closed",
            ))
        })?;

        transport::send_message(writer, bytes).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidInput {
                Error::MessageTooLarge(bytes.len())
            } else {
                Error::WriteFailed(e)
            }
        })
    }

    /// Hand the read half to someone else, e.g. a response listener
    pub fn take_reader(&mut self) -> Option<ReadHalf<S>> {
        self.reader.take()
    }

    /// Close the connection
    ///
    /// Idempotent; returns `true` only for the call that actually closed it.
    pub async fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::trace!(error = %e, "Shutdown on close failed");
            }
        }
        self.reader = None;

        tracing::debug!(address = %self.address, "Connection closed");
        true
    }
}

/// Block until one complete message arrives on a connection's read half
///
/// `Ok(None)` means the daemon closed the connection.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    transport::recv_message(reader).await.map_err(Error::ReadFailed)
}
