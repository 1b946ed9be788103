//! Control-thread service
//!
//! Spawns the one thread that owns the [`PlaybackEngine`] and feeds it
//! messages in arrival order. Callers talk to it through a cloneable
//! [`ServiceHandle`] and listen on an event [`Receiver`].

use crate::control::{mailbox, Command, ControlMessage};
use crate::engine::{Collaborators, PlaybackEngine, Snapshot};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::interruption::SystemEvent;
use crate::remote::{RemoteAction, RemoteActionKind};
use crate::types::{EngineConfig, SeekDirection};
use cadence_core::{CoreError, RepeatMode, Track};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Running playback service
///
/// Dropping it stops playback and joins the control thread.
pub struct PlaybackService {
    handle: ServiceHandle,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackService {
    /// Start the control thread
    ///
    /// The saved playlist is restored before any queued command runs.
    pub fn spawn(
        parts: Collaborators,
        config: EngineConfig,
    ) -> Result<(Self, Receiver<PlaybackEvent>)> {
        let (tx, rx) = mailbox();
        let (event_tx, event_rx) = unbounded();

        let mut engine = PlaybackEngine::new(
            parts,
            config,
            tx.clone(),
            Box::new(move |event| {
                let _ = event_tx.send(event);
            }),
        );

        let thread = thread::Builder::new()
            .name("cadence-control".to_string())
            .spawn(move || {
                info!("Control thread started");
                engine.handle_message(ControlMessage::Command(Command::LoadSavedPlaylist));
                for message in &rx {
                    if !engine.handle_message(message) {
                        break;
                    }
                }
                info!("Control thread stopped");
            })
            .map_err(|e| PlaybackError::Core(CoreError::Io(e)))?;

        Ok((
            Self {
                handle: ServiceHandle { tx },
                thread: Some(thread),
            },
            event_rx,
        ))
    }

    /// A handle for sending commands
    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    /// Stop playback and wait for the control thread to exit
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.handle.tx.send(ControlMessage::Shutdown).is_err() {
            debug!("Control thread already gone");
        }
        if thread.join().is_err() {
            warn!("Control thread panicked");
        }
    }
}

impl Drop for PlaybackService {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

/// Cloneable sender into the control thread
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    tx: Sender<ControlMessage>,
}

impl ServiceHandle {
    /// Queue a command
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(ControlMessage::Command(command))
            .map_err(|_| PlaybackError::Disconnected)
    }

    /// Current engine state, after every command queued before this call
    pub fn snapshot(&self) -> Result<Snapshot> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(ControlMessage::Query(reply_tx))
            .map_err(|_| PlaybackError::Disconnected)?;
        reply_rx.recv().map_err(|_| PlaybackError::Disconnected)
    }

    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send(Command::TogglePlayPause)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn next(&self) -> Result<()> {
        self.send(Command::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send(Command::Previous)
    }

    pub fn skip(&self) -> Result<()> {
        self.send(Command::Skip)
    }

    pub fn shuffle(&self) -> Result<()> {
        self.send(Command::Shuffle)
    }

    /// Reload the whole catalogue, optionally shuffled
    pub fn load_playlist(&self, shuffled: bool) -> Result<()> {
        self.send(Command::LoadPlaylist { shuffled })
    }

    pub fn play_track(&self, track: Track) -> Result<()> {
        self.send(Command::PlayTrack(track))
    }

    pub fn begin_seek(&self, direction: SeekDirection) -> Result<()> {
        self.send(Command::BeginSeek(direction))
    }

    pub fn end_seek(&self) -> Result<()> {
        self.send(Command::EndSeek)
    }

    pub fn change_position(&self, position: Duration) -> Result<()> {
        self.send(Command::ChangePosition(position))
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.send(Command::SetRepeatMode(mode))
    }

    pub fn cycle_repeat_mode(&self) -> Result<()> {
        self.send(Command::CycleRepeatMode)
    }

    /// Enable or disable a remote action
    pub fn set_remote_enabled(&self, kind: RemoteActionKind, enabled: bool) -> Result<()> {
        self.send(Command::SetRemoteEnabled(kind, enabled))
    }

    /// Deliver a remote-surface invocation
    pub fn remote(&self, action: RemoteAction) -> Result<()> {
        self.send(Command::Remote(action))
    }

    /// Deliver an OS audio notification
    pub fn system_event(&self, event: SystemEvent) -> Result<()> {
        self.send(Command::System(event))
    }
}
