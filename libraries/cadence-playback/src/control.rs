//! Messages serialized onto the control thread

use crate::engine::Snapshot;
use crate::interruption::SystemEvent;
use crate::refiner::Refinement;
use crate::remote::{RemoteAction, RemoteActionKind};
use crate::types::SeekDirection;
use cadence_core::{EngineEvent, RepeatMode, Track};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::time::Duration;

/// User-facing commands (UI, remote surface, OS adapter)
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start or resume
    Play,
    /// Pause, keeping the play-head
    Pause,
    /// Play if not playing, otherwise pause
    TogglePlayPause,
    /// Stop and rewind
    Stop,
    /// Previous track
    Previous,
    /// Next track
    Next,
    /// Drop the current track and play on
    Skip,
    /// Reload the whole catalogue in random order
    Shuffle,
    /// Restore the previous session's playlist
    LoadSavedPlaylist,
    /// Reload the whole catalogue
    LoadPlaylist {
        /// Randomize the order
        shuffled: bool,
    },
    /// Jump to a specific track and play it
    PlayTrack(Track),
    /// Start a held seek
    BeginSeek(SeekDirection),
    /// Release a held seek
    EndSeek,
    /// Move the play-head
    ChangePosition(Duration),
    /// Set the repeat mode
    SetRepeatMode(RepeatMode),
    /// Advance the repeat mode (none, all, one)
    CycleRepeatMode,
    /// Enable or disable one remote action
    SetRemoteEnabled(RemoteActionKind, bool),
    /// Invocation from the remote command surface
    Remote(RemoteAction),
    /// OS audio notification
    System(SystemEvent),
}

/// Work the deferred authorization request should resume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Resume `play()`
    Play,
    /// Resume `shuffle()`
    Shuffle,
}

/// Everything the control thread processes, in arrival order
#[derive(Debug)]
pub enum ControlMessage {
    /// A user command
    Command(Command),
    /// Clock fired
    ClockTick,
    /// Seeker fired
    SeekTick(SeekDirection),
    /// Callback from the engine handle opened under `generation`
    Player {
        /// Handle generation the event belongs to
        generation: u64,
        /// What happened
        event: EngineEvent,
    },
    /// Authorization request completed
    Authorization {
        /// Whether access was granted
        granted: bool,
        /// What to resume on success
        action: PendingAction,
    },
    /// Duration refinement finished
    Refined(Refinement),
    /// Report current state on the given channel
    Query(Sender<Snapshot>),
    /// Stop playback and end the control loop
    Shutdown,
}

/// Create the control-thread mailbox
pub fn mailbox() -> (Sender<ControlMessage>, Receiver<ControlMessage>) {
    unbounded()
}
