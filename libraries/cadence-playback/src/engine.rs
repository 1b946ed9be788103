//! Playback engine - the single-threaded state machine
//!
//! Owns the audio engine handle, the audio session, the playlist and the
//! timers. Everything runs on one control thread: timers, engine callbacks,
//! authorization completions and refinement results all come back as
//! [`ControlMessage`]s through the mailbox and are applied by
//! [`PlaybackEngine::handle_message`].

use crate::clock::Clock;
use crate::control::{Command, ControlMessage, PendingAction};
use crate::error::{PlaybackError, Result};
use crate::events::{EventListener, PlaybackEvent};
use crate::interruption::{InterruptionDecision, InterruptionHandler, SystemEvent};
use crate::refiner::{DurationRefiner, Refinement};
use crate::remote::{RemoteCommandCenter, RemoteContext};
use crate::seeker::Seeker;
use crate::settings::PlaybackSettings;
use crate::track_manager::TrackManager;
use crate::types::{EngineConfig, SeekDirection};
use cadence_core::{
    AudioEngine, AudioSession, Authorization, Catalogue, EngineEvent, EngineEventSink, EngineHandle,
    KeyValueStore, Locator, PlaybackState, RepeatMode, SilenceScanner, Track,
};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Seeking never lands closer than this to the end of the track
const END_GUARD: Duration = Duration::from_millis(100);

/// External collaborators handed to the engine
pub struct Collaborators {
    /// Media-library permission
    pub authorization: Arc<dyn Authorization>,
    /// Device media catalogue
    pub catalogue: Arc<dyn Catalogue>,
    /// Audio engine factory
    pub audio: Box<dyn AudioEngine>,
    /// Platform audio session
    pub session: Box<dyn AudioSession>,
    /// Persisted playback state
    pub store: Box<dyn KeyValueStore>,
    /// Trailing-silence scanner for duration refinement
    pub scanner: Arc<dyn SilenceScanner>,
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Playback state
    pub state: PlaybackState,
    /// Repeat mode
    pub repeat_mode: RepeatMode,
    /// Track under the cursor
    pub track: Option<Track>,
    /// Cursor index
    pub cursor: usize,
    /// Playlist length
    pub track_count: usize,
    /// Play-head position
    pub elapsed: Duration,
    /// Duration of the current track (refined if available)
    pub duration: Duration,
}

/// The playback state machine
pub struct PlaybackEngine {
    config: EngineConfig,
    mailbox: Sender<ControlMessage>,
    listener: EventListener,

    authorization: Arc<dyn Authorization>,
    audio: Box<dyn AudioEngine>,
    session: Box<dyn AudioSession>,

    tracks: TrackManager,
    clock: Clock,
    seeker: Seeker,
    interruptions: InterruptionHandler,
    remote: RemoteCommandCenter,

    /// Open engine handle, reused while the locator stays the same
    player: Option<Box<dyn EngineHandle>>,
    /// Bumped whenever the handle slot changes; stale callbacks are dropped
    player_generation: u64,

    state: PlaybackState,
    repeat_mode: RepeatMode,
    authorization_pending: bool,
    announced_revision: u64,
}

impl PlaybackEngine {
    /// Build an engine whose timers and callbacks post into `mailbox`
    ///
    /// The repeat mode is restored from the store; the playlist starts empty
    /// until [`PlaybackEngine::load_saved_playlist`] runs.
    pub fn new(
        parts: Collaborators,
        config: EngineConfig,
        mailbox: Sender<ControlMessage>,
        listener: EventListener,
    ) -> Self {
        let Collaborators {
            authorization,
            catalogue,
            audio,
            session,
            store,
            scanner,
        } = parts;

        let clock = {
            let tx = mailbox.clone();
            Clock::new(
                config.clock_interval(),
                Arc::new(move || tx.send(ControlMessage::ClockTick).is_ok()),
            )
        };

        let seeker = {
            let tx = mailbox.clone();
            Seeker::new(
                config.seek_interval(),
                Arc::new(move |direction| tx.send(ControlMessage::SeekTick(direction)).is_ok()),
            )
        };

        let refiner = {
            let tx = mailbox.clone();
            DurationRefiner::new(
                scanner,
                config.silence_trim,
                Arc::new(move |refinement| {
                    let _ = tx.send(ControlMessage::Refined(refinement));
                }),
            )
        };

        let settings = PlaybackSettings::new(store);
        let repeat_mode = settings.repeat_mode();
        let tracks = TrackManager::new(catalogue, Arc::clone(&authorization), settings, refiner);

        info!(%repeat_mode, "Playback engine created");

        Self {
            config,
            mailbox,
            listener,
            authorization,
            audio,
            session,
            tracks,
            clock,
            seeker,
            interruptions: InterruptionHandler::new(),
            remote: RemoteCommandCenter::new(),
            player: None,
            player_generation: 0,
            state: PlaybackState::Stopped,
            repeat_mode,
            authorization_pending: false,
            announced_revision: 0,
        }
    }

    // ===== Control loop entry =====

    /// Apply one control message
    ///
    /// Returns `false` once the engine has shut down. Alert-worthy errors are
    /// reported to the listener; track-level ones were already recovered.
    pub fn handle_message(&mut self, message: ControlMessage) -> bool {
        let result = match message {
            ControlMessage::Command(command) => self.execute(command),
            ControlMessage::ClockTick => self.on_clock_tick(),
            ControlMessage::SeekTick(direction) => {
                self.on_seek_tick(direction);
                Ok(())
            }
            ControlMessage::Player { generation, event } => self.on_player_event(generation, event),
            ControlMessage::Authorization { granted, action } => {
                self.on_authorization(granted, action)
            }
            ControlMessage::Refined(refinement) => {
                self.on_refined(&refinement);
                Ok(())
            }
            ControlMessage::Query(reply) => {
                let _ = reply.send(self.snapshot());
                Ok(())
            }
            ControlMessage::Shutdown => {
                self.shutdown();
                return false;
            }
        };

        if let Err(e) = result {
            self.report(&e);
        }
        self.sync_track();
        true
    }

    /// Execute a user command
    pub fn execute(&mut self, command: Command) -> Result<()> {
        debug!(?command, state = %self.state, "Command");
        match command {
            Command::Play => self.play(),
            Command::Pause => {
                self.pause();
                Ok(())
            }
            Command::TogglePlayPause => self.toggle_play_pause(),
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::Previous => self.previous(),
            Command::Next => self.next(),
            Command::Skip => self.skip(),
            Command::Shuffle => self.shuffle(),
            Command::LoadSavedPlaylist => self.load_saved_playlist(),
            Command::LoadPlaylist { shuffled } => self.load_playlist(shuffled),
            Command::PlayTrack(track) => self.play_track(&track),
            Command::BeginSeek(direction) => {
                self.begin_seek(direction);
                Ok(())
            }
            Command::EndSeek => {
                self.end_seek();
                Ok(())
            }
            Command::ChangePosition(position) => {
                self.change_position(position);
                Ok(())
            }
            Command::SetRepeatMode(mode) => {
                self.set_repeat_mode(mode);
                Ok(())
            }
            Command::CycleRepeatMode => {
                self.cycle_repeat_mode();
                Ok(())
            }
            Command::SetRemoteEnabled(kind, enabled) => {
                self.remote.set_enabled(kind, enabled);
                Ok(())
            }
            Command::Remote(action) => match self.remote.resolve(action) {
                Some(command) => self.execute(command),
                None => Ok(()),
            },
            Command::System(event) => self.handle_system_event(event),
        }
    }

    // ===== Playback operations =====

    /// Start or resume playback of the current track
    ///
    /// Requests authorization first if needed (playback resumes once it is
    /// granted). Unplayable tracks are dropped and the next one is tried.
    pub fn play(&mut self) -> Result<()> {
        if !self.authorization.is_authorized() {
            self.request_authorization(PendingAction::Play);
            return Ok(());
        }

        loop {
            match self.start_current_track() {
                Ok(()) => return Ok(()),
                Err(e) if e.is_track_level() => {
                    warn!(error = %e, "Skipping unplayable track");
                    if !self.discard_current_track()? {
                        return Ok(());
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Pause, keeping the play-head
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }

        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
        self.clock.stop();
        self.seeker.stop_seeking();
        self.interruptions.set_is_playing(false);
        self.set_state(PlaybackState::Paused);
        self.emit_time();
    }

    /// Play if not playing, otherwise pause
    pub fn toggle_play_pause(&mut self) -> Result<()> {
        if self.state == PlaybackState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Stop and rewind to zero
    pub fn stop(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.stop();
            player.set_current_time(Duration::ZERO);
        }
        if let Err(e) = self.session.set_active(false) {
            warn!(error = %e, "Failed to deactivate audio session");
        }
        self.clock.stop();
        self.seeker.stop_seeking();
        self.interruptions.set_is_playing(false);
        self.set_state(PlaybackState::Stopped);
        self.emit(PlaybackEvent::TimeChanged {
            elapsed: Duration::ZERO,
            duration: self.duration(),
        });
    }

    /// Advance to the next track and play it
    ///
    /// At the end of the playlist, repeat `all`/`one` wrap to the start and
    /// repeat `none` finishes.
    pub fn next(&mut self) -> Result<()> {
        self.stop();
        if self.tracks.is_empty() {
            return Err(PlaybackError::NoMusic);
        }

        if self.advance_cursor() {
            self.play()
        } else {
            self.finish();
            Ok(())
        }
    }

    /// Step back to the previous track and play it
    ///
    /// At the start of the playlist only repeat `all` wraps to the end.
    pub fn previous(&mut self) -> Result<()> {
        self.stop();
        if self.tracks.is_empty() {
            return Err(PlaybackError::NoMusic);
        }

        if !self.tracks.cue_previous() && self.repeat_mode == RepeatMode::All {
            self.tracks.cue_end();
        }
        self.play()
    }

    /// Drop the current track from the playlist and play on
    pub fn skip(&mut self) -> Result<()> {
        if self.discard_current_track()? {
            self.play()
        } else {
            Ok(())
        }
    }

    /// Replace the playlist with a freshly shuffled catalogue
    pub fn shuffle(&mut self) -> Result<()> {
        if !self.authorization.is_authorized() {
            self.request_authorization(PendingAction::Shuffle);
            return Ok(());
        }
        self.load_playlist(true)
    }

    /// Replace the playlist with the whole catalogue
    ///
    /// Playback restarts from the new first track if it was running.
    pub fn load_playlist(&mut self, shuffled: bool) -> Result<()> {
        let was_playing = self.state == PlaybackState::Playing;
        self.stop();
        self.release_player();
        self.tracks.load_new_playlist(shuffled)?;
        self.sync_track();

        if was_playing {
            self.play()
        } else {
            Ok(())
        }
    }

    /// Restore the previous session's playlist
    pub fn load_saved_playlist(&mut self) -> Result<()> {
        self.tracks.load_saved_playlist()?;
        self.sync_track();
        Ok(())
    }

    /// Jump to `track` and play it
    pub fn play_track(&mut self, track: &Track) -> Result<()> {
        self.tracks.prime(track)?;
        self.stop();
        self.play()
    }

    /// Start a held seek in `direction`
    pub fn begin_seek(&mut self, direction: SeekDirection) {
        let active = matches!(self.state, PlaybackState::Playing | PlaybackState::Paused);
        if active && self.player.is_some() {
            self.seeker.start_seeking(direction);
        }
    }

    /// Release a held seek
    pub fn end_seek(&mut self) {
        self.seeker.stop_seeking();
    }

    /// Move the play-head, clamped to the track
    pub fn change_position(&mut self, position: Duration) {
        if self.player.is_none() {
            debug!("No track loaded, ignoring position change");
            return;
        }
        self.seek_to(position);
    }

    /// Set and persist the repeat mode
    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        if self.repeat_mode == mode {
            return;
        }
        info!(from = %self.repeat_mode, to = %mode, "Repeat mode changed");
        self.repeat_mode = mode;
        self.tracks.settings_mut().set_repeat_mode(mode);
        self.emit(PlaybackEvent::RepeatModeChanged(mode));
    }

    /// Advance the repeat mode: none, all, one, none
    pub fn cycle_repeat_mode(&mut self) {
        self.set_repeat_mode(self.repeat_mode.cycled());
    }

    /// Route an OS event through the interruption handler
    pub fn handle_system_event(&mut self, event: SystemEvent) -> Result<()> {
        match self.interruptions.handle(event) {
            Some(InterruptionDecision::Pause) => {
                info!(?event, "Pausing for interruption");
                self.pause();
                Ok(())
            }
            Some(InterruptionDecision::Resume) => {
                info!(?event, "Resuming after interruption");
                self.play()
            }
            None => Ok(()),
        }
    }

    // ===== Queries =====

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current repeat mode
    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    /// Track under the cursor
    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.current_track()
    }

    /// Playlist and cursor
    pub fn tracks(&self) -> &TrackManager {
        &self.tracks
    }

    /// Interruption flags
    pub fn interruptions(&self) -> &InterruptionHandler {
        &self.interruptions
    }

    /// Remote command surface
    pub fn remote(&self) -> &RemoteCommandCenter {
        &self.remote
    }

    /// Whether the time-display clock is running
    pub fn is_clock_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Active seek direction
    pub fn seek_direction(&self) -> Option<SeekDirection> {
        self.seeker.direction()
    }

    /// Play-head position
    pub fn elapsed(&self) -> Duration {
        self.player
            .as_ref()
            .map_or(Duration::ZERO, |player| player.current_time())
    }

    /// Duration of the current track
    ///
    /// The refined duration wins once known, then the open handle's, then
    /// the catalogue's nominal duration.
    pub fn duration(&self) -> Duration {
        if let Some(refined) = self.tracks.refined_duration() {
            return refined;
        }
        if let Some(player) = self.player.as_ref() {
            let duration = player.duration();
            if !duration.is_zero() {
                return duration;
            }
        }
        self.tracks
            .current_track()
            .map_or(Duration::ZERO, |track| track.duration)
    }

    /// Point-in-time view for status displays
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            repeat_mode: self.repeat_mode,
            track: self.tracks.current_track().cloned(),
            cursor: self.tracks.cursor(),
            track_count: self.tracks.len(),
            elapsed: self.elapsed(),
            duration: self.duration(),
        }
    }

    // ===== Internals =====

    fn start_current_track(&mut self) -> Result<()> {
        if self.state == PlaybackState::Playing {
            return Ok(());
        }

        if self.tracks.is_empty() {
            self.stop();
            return Err(PlaybackError::NoMusic);
        }

        let volume = self.session.output_volume();
        if volume <= 0.0 {
            return Err(PlaybackError::NoVolume);
        }

        let track = self
            .tracks
            .current_track()
            .cloned()
            .ok_or(PlaybackError::NoMusic)?;
        self.sync_track();

        let locator = track
            .locator
            .clone()
            .ok_or_else(|| PlaybackError::PlayerInit(format!("{track} has no playable locator")))?;
        self.ensure_player(&locator)?;

        if let Err(e) = self.activate_and_start() {
            self.stop();
            return Err(e);
        }

        self.clock.start();
        self.interruptions.set_is_playing(true);
        self.set_state(PlaybackState::Playing);
        self.emit_time();
        info!(track = %track, index = self.tracks.cursor(), "Playing");
        Ok(())
    }

    fn ensure_player(&mut self, locator: &Locator) -> Result<()> {
        if self.player.as_ref().is_some_and(|player| player.locator() == locator) {
            return Ok(());
        }

        self.release_player();
        let generation = self.player_generation;
        let tx = self.mailbox.clone();
        let sink: EngineEventSink = Arc::new(move |event| {
            let _ = tx.send(ControlMessage::Player { generation, event });
        });

        let player = self
            .audio
            .open(locator, sink)
            .map_err(|e| PlaybackError::PlayerInit(e.to_string()))?;
        debug!(%locator, generation, "Opened engine handle");
        self.player = Some(player);
        Ok(())
    }

    fn activate_and_start(&mut self) -> Result<()> {
        self.session
            .set_category_playback()
            .map_err(|e| PlaybackError::AvError(e.to_string()))?;
        self.session
            .set_active(true)
            .map_err(|e| PlaybackError::AvError(e.to_string()))?;

        let player = self
            .player
            .as_mut()
            .ok_or_else(|| PlaybackError::AvError("no engine handle".to_string()))?;
        if !player.prepare() {
            return Err(PlaybackError::AvError("engine failed to prepare".to_string()));
        }
        if !player.play() {
            return Err(PlaybackError::AvError("engine failed to start".to_string()));
        }
        Ok(())
    }

    /// Close the handle slot; callbacks from the old handle become stale
    fn release_player(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.stop();
            debug!(locator = %player.locator(), "Released engine handle");
        }
        self.player_generation = self.player_generation.wrapping_add(1);
    }

    /// Remove the current track, leaving the cursor on what should play next
    ///
    /// Returns `false` if the playlist ran out (repeat `none`), in which case
    /// playback has finished.
    fn discard_current_track(&mut self) -> Result<bool> {
        self.stop();
        self.release_player();

        let index = self.tracks.cursor();
        if let Some(item) = self.tracks.remove_track(index) {
            info!(track_id = %item.id, index, "Dropped track from playlist");
        }
        if self.tracks.is_empty() {
            return Err(PlaybackError::NoMusic);
        }

        // The item after a removed first track already sits at the cursor
        if index == 0 {
            return Ok(true);
        }
        if self.advance_cursor() {
            Ok(true)
        } else {
            self.finish();
            Ok(false)
        }
    }

    fn advance_cursor(&mut self) -> bool {
        if self.tracks.cue_next() {
            return true;
        }
        match self.repeat_mode {
            RepeatMode::All | RepeatMode::One => {
                self.tracks.cue_start();
                true
            }
            RepeatMode::None => false,
        }
    }

    fn finish(&mut self) {
        self.stop();
        self.tracks.cue_start();
        self.sync_track();
        self.set_state(PlaybackState::Finished);
        info!("Reached end of playlist");
    }

    fn track_finished(&mut self) -> Result<()> {
        let at_end = self.tracks.cursor() + 1 >= self.tracks.len();
        match self.repeat_mode {
            RepeatMode::One => {
                self.stop();
                self.play()
            }
            RepeatMode::None if at_end => {
                self.finish();
                Ok(())
            }
            _ => self.next(),
        }
    }

    fn seek_to(&mut self, position: Duration) {
        let limit = self.duration().saturating_sub(END_GUARD);
        let position = position.min(limit);
        if let Some(player) = self.player.as_mut() {
            player.set_current_time(position);
        }
        self.emit_time();
    }

    fn request_authorization(&mut self, action: PendingAction) {
        if self.authorization_pending {
            debug!(?action, "Authorization already requested");
            return;
        }

        info!(?action, "Requesting media library access");
        self.authorization_pending = true;
        let tx = self.mailbox.clone();
        self.authorization.authorize(Box::new(move |granted| {
            let _ = tx.send(ControlMessage::Authorization { granted, action });
        }));
    }

    fn on_authorization(&mut self, granted: bool, action: PendingAction) -> Result<()> {
        self.authorization_pending = false;
        if !granted {
            warn!(?action, "Media library access denied");
            return Err(PlaybackError::Authorization);
        }

        info!(?action, "Media library access granted");
        if self.tracks.is_empty() && action == PendingAction::Play {
            self.tracks.load_saved_playlist()?;
            if self.tracks.is_empty() {
                self.tracks.load_new_playlist(false)?;
            }
            self.sync_track();
        }

        match action {
            PendingAction::Play => self.play(),
            PendingAction::Shuffle => self.shuffle(),
        }
    }

    fn on_clock_tick(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing || !self.clock.is_running() {
            return Ok(());
        }

        self.emit_time();

        if let Some(end) = self.tracks.refined_duration() {
            if self.elapsed() >= end {
                debug!(end_ms = end.as_millis() as u64, "Reached trimmed end of track");
                return self.track_finished();
            }
        }
        Ok(())
    }

    fn on_seek_tick(&mut self, direction: SeekDirection) {
        if self.seeker.direction() != Some(direction) {
            return;
        }

        let step = self.config.seek_step();
        let elapsed = self.elapsed();
        let position = match direction {
            SeekDirection::Forward => elapsed + step,
            SeekDirection::Backward => elapsed.saturating_sub(step),
        };
        self.seek_to(position);
    }

    fn on_player_event(&mut self, generation: u64, event: EngineEvent) -> Result<()> {
        if generation != self.player_generation || self.player.is_none() {
            debug!(?event, generation, "Ignoring event from released engine handle");
            return Ok(());
        }

        match event {
            EngineEvent::Finished => {
                if self.state != PlaybackState::Playing {
                    return Ok(());
                }
                debug!("Track finished");
                self.track_finished()
            }
            EngineEvent::DecodeFailed(reason) => {
                let err = PlaybackError::Decode(reason);
                warn!(error = %err, "Skipping undecodable track");
                self.skip()
            }
        }
    }

    fn on_refined(&mut self, refinement: &Refinement) {
        let Some(duration) = self.tracks.apply_refinement(refinement) else {
            return;
        };
        self.emit(PlaybackEvent::DurationRefined {
            track_id: refinement.track_id,
            duration,
        });
        self.emit_time();
    }

    fn shutdown(&mut self) {
        info!("Playback engine shutting down");
        self.stop();
        self.release_player();
    }

    fn report(&mut self, err: &PlaybackError) {
        if err.is_alert_worthy() {
            error!(kind = %err.kind(), error = %err, "Playback error");
            self.emit(PlaybackEvent::Error {
                kind: err.kind(),
                message: err.to_string(),
            });
        } else {
            debug!(error = %err, "Recovered playback error");
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "State changed");
        self.state = state;
        self.emit(PlaybackEvent::StateChanged(state));
        self.refresh_remote();
    }

    fn emit_time(&mut self) {
        self.sync_track();
        self.emit(PlaybackEvent::TimeChanged {
            elapsed: self.elapsed(),
            duration: self.duration(),
        });
    }

    /// Announce a cursor change the listener hasn't seen yet
    fn sync_track(&mut self) {
        let revision = self.tracks.revision();
        if revision != self.announced_revision {
            self.announced_revision = revision;
            self.emit(PlaybackEvent::TrackChanged(self.tracks.current_track().cloned()));
        }
        self.refresh_remote();
    }

    fn refresh_remote(&mut self) {
        let context = RemoteContext {
            state: self.state,
            has_tracks: !self.tracks.is_empty(),
            has_player: self.player.is_some(),
        };
        if self.remote.refresh(context) {
            debug!(enabled = ?self.remote.enabled_kinds(), "Remote commands updated");
        }
    }

    fn emit(&mut self, event: PlaybackEvent) {
        (self.listener)(event);
    }
}
