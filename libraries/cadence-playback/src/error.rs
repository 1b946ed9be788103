//! Error types for playback orchestration

use cadence_core::{CoreError, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Catalogue access denied
    #[error("Media library access is not authorized")]
    Authorization,

    /// Playlist is empty
    #[error("No music in the playlist")]
    NoMusic,

    /// Device output is muted
    #[error("Output volume is zero")]
    NoVolume,

    /// The current track could not be opened
    #[error("Player init failed: {0}")]
    PlayerInit(String),

    /// The current track failed to decode mid-playback
    #[error("Decode failed: {0}")]
    Decode(String),

    /// The engine refused to activate/prepare/start a valid track
    #[error("Audio engine error: {0}")]
    AvError(String),

    /// Track is not in the current playlist
    #[error("Track not found in playlist: {0}")]
    TrackNotFound(TrackId),

    /// Control thread is gone
    #[error("Playback service is not running")]
    Disconnected,

    /// Collaborator error
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Error classification surfaced to the delegate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Authorization,
    NoMusic,
    NoVolume,
    PlayerInit,
    Decode,
    AvError,
    NotFound,
    Disconnected,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authorization => "authorization",
            Self::NoMusic => "noMusic",
            Self::NoVolume => "noVolume",
            Self::PlayerInit => "playerInit",
            Self::Decode => "decode",
            Self::AvError => "avError",
            Self::NotFound => "notFound",
            Self::Disconnected => "disconnected",
            Self::Storage => "storage",
        };
        f.write_str(name)
    }
}

impl PlaybackError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authorization => ErrorKind::Authorization,
            Self::NoMusic => ErrorKind::NoMusic,
            Self::NoVolume => ErrorKind::NoVolume,
            Self::PlayerInit(_) => ErrorKind::PlayerInit,
            Self::Decode(_) => ErrorKind::Decode,
            Self::AvError(_) => ErrorKind::AvError,
            Self::TrackNotFound(_) => ErrorKind::NotFound,
            Self::Disconnected => ErrorKind::Disconnected,
            Self::Core(_) => ErrorKind::Storage,
        }
    }

    /// A single track is unplayable; recovered by skipping it
    pub fn is_track_level(&self) -> bool {
        matches!(self, Self::PlayerInit(_) | Self::Decode(_))
    }

    /// Worth a user-facing alert
    ///
    /// Track-level failures heal themselves and are never surfaced per
    /// occurrence.
    pub fn is_alert_worthy(&self) -> bool {
        !self.is_track_level()
    }
}
