//! Silent, clocked audio engine
//!
//! Nothing reaches a speaker: a handle tracks its play-head against the
//! monotonic clock and reports completion when the track's duration has
//! elapsed. Enough to drive the playback engine end to end from a terminal.

use crate::library::probe_duration;
use cadence_core::{
    AudioEngine, AudioSession, CoreError, EngineEvent, EngineEventSink, EngineHandle, Locator,
    Result,
};
use crossbeam_channel::{after, bounded, select, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Opens silent handles for local files
#[derive(Debug, Default)]
pub struct HeadlessEngine;

impl HeadlessEngine {
    pub fn new() -> Self {
        Self
    }
}

impl AudioEngine for HeadlessEngine {
    fn open(&mut self, locator: &Locator, events: EngineEventSink) -> Result<Box<dyn EngineHandle>> {
        let path = locator
            .to_path()
            .ok_or_else(|| CoreError::UnsupportedLocator(locator.to_string()))?;
        let duration = probe_duration(&path)?;
        debug!(%locator, ?duration, "Opened headless player");
        Ok(Box::new(HeadlessPlayer::new(locator.clone(), duration, events)))
    }
}

/// Posts [`EngineEvent::Finished`] after a delay unless disarmed first
struct CompletionTimer {
    // Dropping the sender wakes the waiting thread
    _stop: Sender<()>,
}

impl CompletionTimer {
    fn arm(remaining: Duration, events: EngineEventSink) -> Option<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        thread::Builder::new()
            .name("cadence-headless".to_string())
            .spawn(move || {
                select! {
                    recv(stop_rx) -> _ => trace!("Completion disarmed"),
                    recv(after(remaining)) -> _ => events(EngineEvent::Finished),
                }
            })
            .ok()?;
        Some(Self { _stop: stop_tx })
    }
}

/// One opened track
pub struct HeadlessPlayer {
    locator: Locator,
    duration: Duration,
    events: EngineEventSink,
    /// Play-head at the last start/pause/seek
    offset: Duration,
    /// When rendering last (re)started; `None` while not playing
    started: Option<Instant>,
    completion: Option<CompletionTimer>,
}

impl HeadlessPlayer {
    pub fn new(locator: Locator, duration: Duration, events: EngineEventSink) -> Self {
        Self {
            locator,
            duration,
            events,
            offset: Duration::ZERO,
            started: None,
            completion: None,
        }
    }

    fn rearm(&mut self) {
        self.completion = None;
        if self.started.is_some() {
            let remaining = self.duration.saturating_sub(self.offset);
            self.completion = CompletionTimer::arm(remaining, self.events.clone());
        }
    }

    fn halt(&mut self) {
        self.offset = self.current_time();
        self.started = None;
        self.completion = None;
    }
}

impl EngineHandle for HeadlessPlayer {
    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn is_playing(&self) -> bool {
        self.started.is_some()
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn current_time(&self) -> Duration {
        let position = match self.started {
            Some(at) => self.offset + at.elapsed(),
            None => self.offset,
        };
        position.min(self.duration)
    }

    fn set_current_time(&mut self, position: Duration) {
        self.offset = position.min(self.duration);
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
        self.rearm();
    }

    fn prepare(&mut self) -> bool {
        true
    }

    fn play(&mut self) -> bool {
        if self.started.is_none() {
            self.started = Some(Instant::now());
            self.rearm();
        }
        true
    }

    fn pause(&mut self) {
        self.halt();
    }

    fn stop(&mut self) {
        self.halt();
    }
}

/// Session with a fixed output volume
#[derive(Debug, Clone)]
pub struct HeadlessSession {
    volume: f32,
    active: bool,
}

impl HeadlessSession {
    pub fn new(volume: f32) -> Self {
        Self {
            volume,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl AudioSession for HeadlessSession {
    fn output_volume(&self) -> f32 {
        self.volume
    }

    fn set_category_playback(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_active(&mut self, active: bool) -> Result<()> {
        if self.active != active {
            debug!(active, "Audio session");
        }
        self.active = active;
        Ok(())
    }
}
