//! Cross-platform IPC transport layer
//!
//! Abstracts Unix domain sockets (Unix/macOS) and named pipes (Windows)
//! using the interprocess crate. Messages are framed with a 4-byte
//! little-endian length prefix.

use std::io;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::paths;

/// Maximum message size (10 MB)
pub const MAX_MESSAGE_SIZE: u32 = 10 * 1024 * 1024;

// Platform-specific imports and type aliases
#[cfg(unix)]
pub mod platform {
    pub use interprocess::local_socket::tokio::{prelude::*, Listener, Stream};
    pub use interprocess::local_socket::{GenericFilePath, ListenerOptions};
}

#[cfg(windows)]
pub mod platform {
    pub use interprocess::local_socket::tokio::{prelude::*, Listener, Stream};
    pub use interprocess::local_socket::{GenericNamespaced, ListenerOptions};
}

use platform::*;

/// Re-export the platform types for use in other modules
pub use platform::{Listener, Stream};

/// Create a listener on the control endpoint `name`
///
/// Any stale socket left behind by a crashed daemon is removed first.
pub async fn create_listener(name: &str) -> io::Result<Listener> {
    let socket = Path::new(name);
    paths::ensure_socket_dir(socket)?;
    paths::remove_socket(socket)?;

    #[cfg(unix)]
    let listener = {
        let fs_name = name.to_fs_name::<GenericFilePath>()?;
        ListenerOptions::new().name(fs_name).create_tokio()?
    };

    #[cfg(windows)]
    let listener = {
        let ns_name = name.to_ns_name::<GenericNamespaced>()?;
        ListenerOptions::new().name(ns_name).create_tokio()?
    };

    // Only the owning user may talk to the player
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(listener)
}

/// Connect to the control endpoint `name`
///
/// There is no retry: if nobody is listening the error comes straight back.
pub async fn connect(name: &str) -> io::Result<Stream> {
    #[cfg(unix)]
    let stream = {
        let fs_name = name.to_fs_name::<GenericFilePath>()?;
        Stream::connect(fs_name).await?
    };

    #[cfg(windows)]
    let stream = {
        let ns_name = name.to_ns_name::<GenericNamespaced>()?;
        Stream::connect(ns_name).await?
    };

    Ok(stream)
}

/// Send one length-prefixed message
///
/// Header and body go out in a single write so a reader never sees a
/// header without its body from this side.
pub async fn send_message<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    if data.len() > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Message too large: {} bytes", data.len()),
        ));
    }

    let mut frame = Vec::with_capacity(4 + data.len());
    frame.extend_from_slice(&(data.len() as u32).to_le_bytes());
    frame.extend_from_slice(data);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Receive one length-prefixed message
///
/// Returns `Ok(None)` when the peer closed the stream on a frame boundary.
/// A close part-way through a frame is an `UnexpectedEof` error.
pub async fn recv_message<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside a frame header",
            ));
        }
        filled += n;
    }

    let len = u32::from_le_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data).await?;
    Ok(Some(data))
}
