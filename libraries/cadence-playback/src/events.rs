//! Events published to the engine's single listener

use crate::error::ErrorKind;
use cadence_core::{PlaybackState, RepeatMode, Track, TrackId};
use std::time::Duration;

/// Playback events
///
/// Emitted by the engine for UI/remote updates. There is exactly one
/// listener; fan-out, if needed, is the listener's business.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Playback state changed
    StateChanged(PlaybackState),

    /// Play-head position report
    TimeChanged {
        /// Current play-head position
        elapsed: Duration,
        /// Duration of the current track (refined if available)
        duration: Duration,
    },

    /// The current track changed (`None` when the playlist emptied)
    TrackChanged(Option<Track>),

    /// Repeat mode changed
    RepeatModeChanged(RepeatMode),

    /// A track's duration was shortened after trimming trailing silence
    DurationRefined {
        /// Track whose duration changed
        track_id: TrackId,
        /// Corrected duration
        duration: Duration,
    },

    /// An alert-worthy failure
    Error {
        /// Classification
        kind: ErrorKind,
        /// Human-readable detail
        message: String,
    },
}

/// The engine's single event consumer
pub type EventListener = Box<dyn FnMut(PlaybackEvent) + Send>;
