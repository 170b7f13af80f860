//! Playback control seam
//!
//! The daemon drives the playback engine only through [`Player`]. Decoding,
//! output devices and the track catalog all live behind it.

use async_trait::async_trait;
use thiserror::Error;

/// Why the player refused a command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("no track loaded")]
    NoTrackLoaded,

    #[error("nothing is playing")]
    NotPlaying,

    #[error("{0}")]
    Engine(String),
}

/// Playback operations the control channel can request
#[async_trait]
pub trait Player: Send {
    /// Pause playback
    async fn pause(&mut self) -> Result<(), PlaybackError>;

    /// Resume paused or stopped playback
    async fn resume(&mut self) -> Result<(), PlaybackError>;

    /// Stop playback
    async fn stop(&mut self) -> Result<(), PlaybackError>;
}

/// Coarse playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// In-memory playback state machine
///
/// Tracks what an engine would be doing without producing any audio.
#[derive(Debug, Default)]
pub struct PlaybackState {
    track: Option<String>,
    status: PlaybackStatus,
}

impl PlaybackState {
    /// Load a track and start playing it
    pub fn load(&mut self, track: impl Into<String>) {
        self.track = Some(track.into());
        self.status = PlaybackStatus::Playing;
    }

    pub fn track(&self) -> Option<&str> {
        self.track.as_deref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    fn require_track(&self) -> Result<(), PlaybackError> {
        if self.track.is_none() {
            return Err(PlaybackError::NoTrackLoaded);
        }
        Ok(())
    }
}

#[async_trait]
impl Player for PlaybackState {
    async fn pause(&mut self) -> Result<(), PlaybackError> {
        self.require_track()?;
        match self.status {
            PlaybackStatus::Stopped => Err(PlaybackError::NotPlaying),
            PlaybackStatus::Playing | PlaybackStatus::Paused => {
                self.status = PlaybackStatus::Paused;
                Ok(())
            }
        }
    }

    async fn resume(&mut self) -> Result<(), PlaybackError> {
        self.require_track()?;
        self.status = PlaybackStatus::Playing;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PlaybackError> {
        self.require_track()?;
        self.status = PlaybackStatus::Stopped;
        Ok(())
    }
}
