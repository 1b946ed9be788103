//! Remote command surface (lock screen, headset buttons, media keys)
//!
//! Each action has a user toggle and an availability derived from engine
//! state. An action fires only when both allow it.

use crate::control::Command;
use crate::types::SeekDirection;
use cadence_core::{PlaybackState, RepeatMode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// An invocation from the remote surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    /// Play
    Play,
    /// Pause
    Pause,
    /// Toggle between play and pause
    TogglePlayPause,
    /// Stop
    Stop,
    /// Previous track
    PreviousTrack,
    /// Next track
    NextTrack,
    /// Seek button pressed
    BeginSeeking(SeekDirection),
    /// Seek button released
    EndSeeking,
    /// Scrubber moved
    ChangePlaybackPosition(Duration),
    /// Repeat button; `None` cycles to the next mode
    ChangeRepeatMode(Option<RepeatMode>),
}

/// Action category used for enable toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteActionKind {
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    PreviousTrack,
    NextTrack,
    Seek,
    ChangePlaybackPosition,
    ChangeRepeatMode,
}

impl RemoteActionKind {
    /// Every kind, in display order
    pub const ALL: [Self; 9] = [
        Self::Play,
        Self::Pause,
        Self::TogglePlayPause,
        Self::Stop,
        Self::PreviousTrack,
        Self::NextTrack,
        Self::Seek,
        Self::ChangePlaybackPosition,
        Self::ChangeRepeatMode,
    ];
}

impl RemoteAction {
    /// Toggle category of this action
    pub fn kind(&self) -> RemoteActionKind {
        match self {
            Self::Play => RemoteActionKind::Play,
            Self::Pause => RemoteActionKind::Pause,
            Self::TogglePlayPause => RemoteActionKind::TogglePlayPause,
            Self::Stop => RemoteActionKind::Stop,
            Self::PreviousTrack => RemoteActionKind::PreviousTrack,
            Self::NextTrack => RemoteActionKind::NextTrack,
            Self::BeginSeeking(_) | Self::EndSeeking => RemoteActionKind::Seek,
            Self::ChangePlaybackPosition(_) => RemoteActionKind::ChangePlaybackPosition,
            Self::ChangeRepeatMode(_) => RemoteActionKind::ChangeRepeatMode,
        }
    }
}

/// Engine facts that decide which actions make sense right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteContext {
    /// Current playback state
    pub state: PlaybackState,
    /// Playlist is non-empty
    pub has_tracks: bool,
    /// A track is loaded in the engine
    pub has_player: bool,
}

/// Per-action enable state for the remote surface
#[derive(Debug, Clone)]
pub struct RemoteCommandCenter {
    disabled: HashSet<RemoteActionKind>,
    context: RemoteContext,
}

impl Default for RemoteCommandCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteCommandCenter {
    /// All actions enabled by the user, nothing available yet
    pub fn new() -> Self {
        Self {
            disabled: HashSet::new(),
            context: RemoteContext::default(),
        }
    }

    /// Recompute availability from engine state
    ///
    /// Returns `true` if anything changed.
    pub fn refresh(&mut self, context: RemoteContext) -> bool {
        let changed = self.context != context;
        self.context = context;
        changed
    }

    /// User toggle for one action
    pub fn set_enabled(&mut self, kind: RemoteActionKind, enabled: bool) {
        if enabled {
            self.disabled.remove(&kind);
        } else {
            self.disabled.insert(kind);
        }
    }

    /// Whether `kind` would fire right now
    pub fn is_enabled(&self, kind: RemoteActionKind) -> bool {
        !self.disabled.contains(&kind) && self.is_available(kind)
    }

    /// Kinds that would fire right now
    pub fn enabled_kinds(&self) -> Vec<RemoteActionKind> {
        RemoteActionKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    fn is_available(&self, kind: RemoteActionKind) -> bool {
        let RemoteContext {
            state,
            has_tracks,
            has_player,
        } = self.context;
        let active = matches!(state, PlaybackState::Playing | PlaybackState::Paused);

        match kind {
            RemoteActionKind::Play => has_tracks && state != PlaybackState::Playing,
            RemoteActionKind::Pause => state == PlaybackState::Playing,
            RemoteActionKind::TogglePlayPause
            | RemoteActionKind::PreviousTrack
            | RemoteActionKind::NextTrack => has_tracks,
            RemoteActionKind::Stop => active,
            RemoteActionKind::Seek | RemoteActionKind::ChangePlaybackPosition => active && has_player,
            RemoteActionKind::ChangeRepeatMode => true,
        }
    }

    /// Translate an invocation into an engine command
    ///
    /// Disabled actions resolve to `None`.
    pub fn resolve(&self, action: RemoteAction) -> Option<Command> {
        let kind = action.kind();
        // Releasing a seek must always get through
        if action != RemoteAction::EndSeeking && !self.is_enabled(kind) {
            debug!(?action, "Ignoring disabled remote action");
            return None;
        }

        let command = match action {
            RemoteAction::Play => Command::Play,
            RemoteAction::Pause => Command::Pause,
            RemoteAction::TogglePlayPause => {
                if self.context.state == PlaybackState::Playing {
                    Command::Pause
                } else {
                    Command::Play
                }
            }
            RemoteAction::Stop => Command::Stop,
            RemoteAction::PreviousTrack => Command::Previous,
            RemoteAction::NextTrack => Command::Next,
            RemoteAction::BeginSeeking(direction) => Command::BeginSeek(direction),
            RemoteAction::EndSeeking => Command::EndSeek,
            RemoteAction::ChangePlaybackPosition(position) => Command::ChangePosition(position),
            RemoteAction::ChangeRepeatMode(Some(mode)) => Command::SetRepeatMode(mode),
            RemoteAction::ChangeRepeatMode(None) => Command::CycleRepeatMode,
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center(state: PlaybackState, has_tracks: bool, has_player: bool) -> RemoteCommandCenter {
        let mut center = RemoteCommandCenter::new();
        center.refresh(RemoteContext {
            state,
            has_tracks,
            has_player,
        });
        center
    }

    #[test]
    fn empty_playlist_allows_only_repeat() {
        let center = center(PlaybackState::Stopped, false, false);
        assert_eq!(center.enabled_kinds(), vec![RemoteActionKind::ChangeRepeatMode]);
        assert_eq!(center.resolve(RemoteAction::Play), None);
    }

    #[test]
    fn toggle_follows_state() {
        let playing = center(PlaybackState::Playing, true, true);
        assert_eq!(playing.resolve(RemoteAction::TogglePlayPause), Some(Command::Pause));

        let paused = center(PlaybackState::Paused, true, true);
        assert_eq!(paused.resolve(RemoteAction::TogglePlayPause), Some(Command::Play));
    }

    #[test]
    fn seeking_needs_a_loaded_track() {
        let stopped = center(PlaybackState::Stopped, true, false);
        assert!(!stopped.is_enabled(RemoteActionKind::Seek));

        let playing = center(PlaybackState::Playing, true, true);
        assert_eq!(
            playing.resolve(RemoteAction::BeginSeeking(SeekDirection::Forward)),
            Some(Command::BeginSeek(SeekDirection::Forward))
        );
    }

    #[test]
    fn user_toggle_wins_over_availability() {
        let mut center = center(PlaybackState::Playing, true, true);
        center.set_enabled(RemoteActionKind::NextTrack, false);
        assert_eq!(center.resolve(RemoteAction::NextTrack), None);

        center.set_enabled(RemoteActionKind::NextTrack, true);
        assert_eq!(center.resolve(RemoteAction::NextTrack), Some(Command::Next));
    }

    #[test]
    fn end_seeking_always_resolves() {
        let mut center = center(PlaybackState::Stopped, false, false);
        center.set_enabled(RemoteActionKind::Seek, false);
        assert_eq!(center.resolve(RemoteAction::EndSeeking), Some(Command::EndSeek));
    }

    #[test]
    fn repeat_button_cycles_or_sets() {
        let center = center(PlaybackState::Stopped, false, false);
        assert_eq!(
            center.resolve(RemoteAction::ChangeRepeatMode(None)),
            Some(Command::CycleRepeatMode)
        );
        assert_eq!(
            center.resolve(RemoteAction::ChangeRepeatMode(Some(RepeatMode::One))),
            Some(Command::SetRepeatMode(RepeatMode::One))
        );
    }

    #[test]
    fn refresh_reports_changes() {
        let mut center = RemoteCommandCenter::new();
        let context = RemoteContext {
            state: PlaybackState::Playing,
            has_tracks: true,
            has_player: true,
        };
        assert!(center.refresh(context));
        assert!(!center.refresh(context));
    }
}
