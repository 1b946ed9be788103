//! Interruption reconciliation
//!
//! Turns OS audio notifications (route changes, session interruptions,
//! backgrounding) into pause/resume decisions. The handler never touches the
//! audio engine; the engine executes whatever decision comes back.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why the audio route changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteChange {
    /// A new output device became available (headphones plugged in)
    DeviceAppeared,

    /// The active output device went away (headphones pulled)
    DeviceDisappeared,

    /// Any other reason (category change, override, ...)
    Other,
}

/// Phase of a system audio-session interruption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionPhase {
    /// Another session took the audio (incoming call, alarm)
    Began,

    /// The other session released the audio
    Ended,
}

/// Typed OS event delivered by the platform adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemEvent {
    /// Audio route changed
    RouteChanged(RouteChange),

    /// Audio session interrupted or released
    Interruption(InterruptionPhase),

    /// App moved to the background
    Backgrounded,

    /// App returned to the foreground
    Foregrounded,
}

/// What the engine should do in response to a system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionDecision {
    /// Pause playback
    Pause,

    /// Resume playback
    Resume,
}

/// Interruption state machine
#[derive(Debug, Default)]
pub struct InterruptionHandler {
    is_playing: bool,
    headphones_removed: bool,
    playing_in_background: bool,
    session_interrupted: bool,
}

impl InterruptionHandler {
    /// Create a handler in the not-playing state with all flags clear
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror the engine's playing flag
    ///
    /// `true` means the user (re)started playback, which wins over any stale
    /// interruption state: every flag goes back to false.
    pub fn set_is_playing(&mut self, is_playing: bool) {
        self.is_playing = is_playing;
        if is_playing {
            self.headphones_removed = false;
            self.session_interrupted = false;
            self.playing_in_background = false;
        }
    }

    /// Feed one system event, returning a decision if one is due
    pub fn handle(&mut self, event: SystemEvent) -> Option<InterruptionDecision> {
        let decision = match event {
            SystemEvent::RouteChanged(RouteChange::DeviceDisappeared) => {
                if self.is_playing {
                    self.headphones_removed = true;
                    Some(InterruptionDecision::Pause)
                } else {
                    None
                }
            }
            SystemEvent::RouteChanged(RouteChange::DeviceAppeared) => {
                if !self.is_playing && self.headphones_removed {
                    self.headphones_removed = false;
                    Some(InterruptionDecision::Resume)
                } else {
                    None
                }
            }
            SystemEvent::RouteChanged(RouteChange::Other) => None,
            SystemEvent::Interruption(InterruptionPhase::Began) => {
                if self.is_playing {
                    self.session_interrupted = true;
                    Some(InterruptionDecision::Pause)
                } else {
                    None
                }
            }
            SystemEvent::Interruption(InterruptionPhase::Ended) => {
                if !self.is_playing && self.session_interrupted {
                    self.session_interrupted = false;
                    Some(InterruptionDecision::Resume)
                } else {
                    None
                }
            }
            SystemEvent::Backgrounded => {
                self.playing_in_background = self.is_playing;
                None
            }
            SystemEvent::Foregrounded => {
                self.playing_in_background = false;
                None
            }
        };

        debug!(
            ?event,
            ?decision,
            playing = self.is_playing,
            background = self.playing_in_background,
            "Interruption event"
        );
        decision
    }

    /// Whether the engine is playing, as last reported
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Output device vanished while playing and hasn't come back
    pub fn headphones_removed(&self) -> bool {
        self.headphones_removed
    }

    /// App went to the background while playing
    pub fn playing_in_background(&self) -> bool {
        self.playing_in_background
    }

    /// Session interrupted while playing and not yet released
    pub fn session_interrupted(&self) -> bool {
        self.session_interrupted
    }
}
