//! Cross-platform socket and configuration paths
//!
//! Unix/macOS: Uses Unix domain sockets at $XDG_RUNTIME_DIR or /tmp
//! Windows: Uses named pipes at \\.\pipe\player-<username>

use std::io;
use std::path::{Path, PathBuf};

/// Name used for the IPC socket/pipe and the project directories
const APP_NAME: &str = "player";

/// Get the default socket/pipe path for the player control endpoint
///
/// Platform-specific:
/// - Unix: `$XDG_RUNTIME_DIR/player/player.sock` or `/tmp/player-<uid>/player.sock`
/// - Windows: Named pipe path (handled by interprocess crate)
#[cfg(unix)]
pub fn socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir)
            .join(APP_NAME)
            .join("player.sock");
    }

    // Fallback to /tmp with uid so users don't share a socket
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/{}-{}", APP_NAME, uid)).join("player.sock")
}

#[cfg(windows)]
pub fn socket_path() -> PathBuf {
    PathBuf::from(socket_name())
}

/// Get the default socket name for interprocess local sockets
#[cfg(unix)]
pub fn socket_name() -> String {
    socket_path().to_string_lossy().into_owned()
}

#[cfg(windows)]
pub fn socket_name() -> String {
    let username = std::env::var("USERNAME").unwrap_or_else(|_| "default".to_string());
    format!("{}-{}", APP_NAME, username)
}

/// Ensure the directory holding `socket` exists
///
/// On Unix, a freshly created directory gets mode 0700
#[cfg(unix)]
pub fn ensure_socket_dir(socket: &Path) -> io::Result<()> {
    let dir = socket.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "Invalid socket path")
    })?;

    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

#[cfg(windows)]
pub fn ensure_socket_dir(_socket: &Path) -> io::Result<()> {
    // Named pipes don't need a directory on Windows
    Ok(())
}

/// Remove a stale socket file if it exists
#[cfg(unix)]
pub fn remove_socket(socket: &Path) -> io::Result<()> {
    if socket.exists() {
        std::fs::remove_file(socket)?;
    }
    Ok(())
}

#[cfg(windows)]
pub fn remove_socket(_socket: &Path) -> io::Result<()> {
    // Named pipes are automatically cleaned up on Windows
    Ok(())
}

/// Get the configuration directory path
///
/// - Linux: `~/.config/player/`
/// - macOS: `~/Library/Application Support/player/`
/// - Windows: `%APPDATA%\player\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}
