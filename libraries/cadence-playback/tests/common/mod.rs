//! Shared fakes for engine tests
//!
//! Every collaborator records what the engine did to it and exposes knobs to
//! make it fail. The harness drives the engine on the test thread and drains
//! the mailbox by hand, so ordering is deterministic.

#![allow(dead_code)]

use cadence_core::{
    AudioEngine, AudioSession, Authorization, AuthorizationCallback, Catalogue, CatalogueItem,
    CoreError, EngineEvent, EngineEventSink, EngineHandle, KeyValueStore, Locator, MemoryStore,
    SignalExtent, SilenceScanner, TrackId,
};
use cadence_playback::{
    mailbox, Collaborators, ControlMessage, EngineConfig, PlaybackEngine, PlaybackEvent,
};
use crossbeam_channel::Receiver;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ===== Catalogue =====

pub fn item(id: u64) -> CatalogueItem {
    CatalogueItem::new(TrackId::new(id))
        .with_artist(format!("Artist {id}"))
        .with_title(format!("Song {id}"))
        .with_duration(Duration::from_secs(180))
        .with_locator(locator(id))
}

pub fn locator(id: u64) -> Locator {
    Locator::new(format!("file:///music/{id}.flac"))
}

pub fn library(n: u64) -> Vec<CatalogueItem> {
    (1..=n).map(item).collect()
}

#[derive(Default)]
pub struct FakeCatalogue {
    pub items: Mutex<Vec<CatalogueItem>>,
}

impl FakeCatalogue {
    pub fn new(items: Vec<CatalogueItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }
}

impl Catalogue for FakeCatalogue {
    fn fetch_all(&self) -> cadence_core::Result<Vec<CatalogueItem>> {
        Ok(self.items.lock().unwrap().clone())
    }

    fn find(&self, ids: &[TrackId]) -> cadence_core::Result<Vec<CatalogueItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| ids.contains(&item.id))
            .cloned()
            .collect())
    }
}

// ===== Authorization =====

pub struct FakeAuthorization {
    pub authorized: AtomicBool,
    pub grant: AtomicBool,
    pub requests: AtomicUsize,
}

impl FakeAuthorization {
    pub fn granted() -> Self {
        Self::new(true, true)
    }

    pub fn new(authorized: bool, grant: bool) -> Self {
        Self {
            authorized: AtomicBool::new(authorized),
            grant: AtomicBool::new(grant),
            requests: AtomicUsize::new(0),
        }
    }
}

impl Authorization for FakeAuthorization {
    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    fn authorize(&self, completion: AuthorizationCallback) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let grant = self.grant.load(Ordering::SeqCst);
        self.authorized.store(grant, Ordering::SeqCst);
        completion(grant);
    }
}

// ===== Audio engine =====

/// What the fake audio engine has seen, plus failure knobs
#[derive(Default)]
pub struct AudioState {
    pub opened: Vec<Locator>,
    pub closed: usize,
    pub unopenable: HashSet<Locator>,
    pub fail_prepare: bool,
    pub fail_play: bool,
    pub durations: HashMap<Locator, Duration>,
    /// Sink and shared position of the most recently opened handle
    pub sink: Option<EngineEventSink>,
    pub position: Option<Arc<Mutex<Duration>>>,
    pub playing: Option<Arc<AtomicBool>>,
}

#[derive(Clone, Default)]
pub struct FakeAudio {
    pub state: Arc<Mutex<AudioState>>,
}

impl FakeAudio {
    /// Fire an event from the current handle (as the audio thread would)
    pub fn emit(&self, event: EngineEvent) {
        let sink = self.state.lock().unwrap().sink.clone();
        if let Some(sink) = sink {
            sink(event);
        }
    }

    pub fn set_position(&self, position: Duration) {
        if let Some(shared) = self.state.lock().unwrap().position.as_ref() {
            *shared.lock().unwrap() = position;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .playing
            .as_ref()
            .is_some_and(|p| p.load(Ordering::SeqCst))
    }

    pub fn opened(&self) -> Vec<Locator> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn make_unopenable(&self, id: u64) {
        self.state.lock().unwrap().unopenable.insert(locator(id));
    }
}

impl AudioEngine for FakeAudio {
    fn open(
        &mut self,
        locator: &Locator,
        events: EngineEventSink,
    ) -> cadence_core::Result<Box<dyn EngineHandle>> {
        let mut state = self.state.lock().unwrap();
        if state.unopenable.contains(locator) {
            return Err(CoreError::audio(format!("cannot open {locator}")));
        }

        let position = Arc::new(Mutex::new(Duration::ZERO));
        let playing = Arc::new(AtomicBool::new(false));
        state.opened.push(locator.clone());
        state.sink = Some(events);
        state.position = Some(Arc::clone(&position));
        state.playing = Some(Arc::clone(&playing));

        Ok(Box::new(FakeHandle {
            locator: locator.clone(),
            duration: state
                .durations
                .get(locator)
                .copied()
                .unwrap_or(Duration::from_secs(180)),
            position,
            playing,
            fail_prepare: state.fail_prepare,
            fail_play: state.fail_play,
            shared: Arc::clone(&self.state),
        }))
    }
}

pub struct FakeHandle {
    locator: Locator,
    duration: Duration,
    position: Arc<Mutex<Duration>>,
    playing: Arc<AtomicBool>,
    fail_prepare: bool,
    fail_play: bool,
    shared: Arc<Mutex<AudioState>>,
}

impl EngineHandle for FakeHandle {
    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn current_time(&self) -> Duration {
        *self.position.lock().unwrap()
    }

    fn set_current_time(&mut self, position: Duration) {
        *self.position.lock().unwrap() = position;
    }

    fn prepare(&mut self) -> bool {
        !self.fail_prepare
    }

    fn play(&mut self) -> bool {
        if self.fail_play {
            return false;
        }
        self.playing.store(true, Ordering::SeqCst);
        true
    }

    fn pause(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.lock() {
            state.closed += 1;
        }
    }
}

// ===== Audio session =====

#[derive(Default)]
pub struct SessionState {
    pub volume: f32,
    pub active: bool,
    pub fail_activate: bool,
    pub activations: usize,
}

#[derive(Clone)]
pub struct FakeSession {
    pub state: Arc<Mutex<SessionState>>,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                volume: 0.8,
                ..SessionState::default()
            })),
        }
    }
}

impl AudioSession for FakeSession {
    fn output_volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn set_category_playback(&mut self) -> cadence_core::Result<()> {
        Ok(())
    }

    fn set_active(&mut self, active: bool) -> cadence_core::Result<()> {
        let mut state = self.state.lock().unwrap();
        if active && state.fail_activate {
            return Err(CoreError::session("activation refused"));
        }
        if active {
            state.activations += 1;
        }
        state.active = active;
        Ok(())
    }
}

// ===== Scanner =====

#[derive(Default)]
pub struct FakeScanner {
    pub extents: Mutex<HashMap<Locator, SignalExtent>>,
}

impl FakeScanner {
    pub fn with_tail(self, id: u64, total_secs: u64, trailing_secs: u64) -> Self {
        self.extents.lock().unwrap().insert(
            locator(id),
            SignalExtent {
                total: Duration::from_secs(total_secs),
                last_audible: Some(Duration::from_secs(total_secs - trailing_secs)),
            },
        );
        self
    }
}

impl SilenceScanner for FakeScanner {
    fn scan(&self, locator: &Locator, cancelled: &AtomicBool) -> cadence_core::Result<Option<SignalExtent>> {
        if cancelled.load(Ordering::Acquire) {
            return Ok(None);
        }
        self.extents
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .map(Some)
            .ok_or_else(|| CoreError::audio("no audio data"))
    }
}

// ===== Store =====

/// Store that survives the engine so tests can restart with the same state
#[derive(Clone, Default)]
pub struct SharedStore(pub Arc<Mutex<MemoryStore>>);

impl KeyValueStore for SharedStore {
    fn load(&self, key: &str) -> cadence_core::Result<Option<Value>> {
        self.0.lock().unwrap().load(key)
    }

    fn save(&mut self, key: &str, value: Value) -> cadence_core::Result<()> {
        self.0.lock().unwrap().save(key, value)
    }

    fn remove(&mut self, key: &str) -> cadence_core::Result<()> {
        self.0.lock().unwrap().remove(key)
    }
}

// ===== Harness =====

/// Timers slow enough never to fire during a test unless asked
pub fn quiet_config() -> EngineConfig {
    EngineConfig {
        clock_interval_ms: 3_600_000,
        seek_interval_ms: 3_600_000,
        ..EngineConfig::default()
    }
}

pub struct Harness {
    pub engine: PlaybackEngine,
    pub mailbox: Receiver<ControlMessage>,
    pub events: Arc<Mutex<Vec<PlaybackEvent>>>,
    pub audio: FakeAudio,
    pub session: FakeSession,
    pub auth: Arc<FakeAuthorization>,
    pub catalogue: Arc<FakeCatalogue>,
    pub store: SharedStore,
}

pub struct HarnessBuilder {
    items: Vec<CatalogueItem>,
    auth: FakeAuthorization,
    scanner: FakeScanner,
    store: SharedStore,
    config: EngineConfig,
    audio: FakeAudio,
}

impl HarnessBuilder {
    pub fn unauthorized(mut self, grant: bool) -> Self {
        self.auth = FakeAuthorization::new(false, grant);
        self
    }

    pub fn scanner(mut self, scanner: FakeScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn store(mut self, store: SharedStore) -> Self {
        self.store = store;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn audio(mut self, audio: FakeAudio) -> Self {
        self.audio = audio;
        self
    }

    /// Build without loading any playlist
    pub fn build_empty(self) -> Harness {
        let (tx, rx) = mailbox();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let auth = Arc::new(self.auth);
        let catalogue = Arc::new(FakeCatalogue::new(self.items));
        let session = FakeSession::default();

        let engine = PlaybackEngine::new(
            Collaborators {
                authorization: Arc::clone(&auth) as Arc<dyn Authorization>,
                catalogue: Arc::clone(&catalogue) as Arc<dyn Catalogue>,
                audio: Box::new(self.audio.clone()),
                session: Box::new(session.clone()),
                store: Box::new(self.store.clone()),
                scanner: Arc::new(self.scanner),
            },
            self.config,
            tx,
            Box::new(move |event| sink.lock().unwrap().push(event)),
        );

        Harness {
            engine,
            mailbox: rx,
            events,
            audio: self.audio,
            session,
            auth,
            catalogue,
            store: self.store,
        }
    }

    /// Build and load the whole catalogue in order
    pub fn build(self) -> Harness {
        let mut harness = self.build_empty();
        harness.engine.load_playlist(false).unwrap();
        harness.pump();
        harness.take_events();
        harness
    }
}

impl Harness {
    pub fn builder(tracks: u64) -> HarnessBuilder {
        HarnessBuilder {
            items: library(tracks),
            auth: FakeAuthorization::granted(),
            scanner: FakeScanner::default(),
            store: SharedStore::default(),
            config: quiet_config(),
            audio: FakeAudio::default(),
        }
    }

    /// Authorized engine with `tracks` loaded in catalogue order
    pub fn with_tracks(tracks: u64) -> Self {
        Self::builder(tracks).build()
    }

    /// Apply everything already in the mailbox
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.mailbox.try_recv() {
            self.engine.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Apply messages as they arrive until `done` holds or `timeout` passes
    pub fn pump_until(&mut self, timeout: Duration, mut done: impl FnMut(&Self) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done(self) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if let Ok(message) = self.mailbox.recv_timeout(remaining.min(Duration::from_millis(20))) {
                self.engine.handle_message(message);
            }
        }
    }

    pub fn take_events(&self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn cursor(&self) -> usize {
        self.engine.tracks().cursor()
    }

    pub fn current_id(&self) -> Option<u64> {
        self.engine.current_track().map(|t| t.id.get())
    }

    pub fn playlist_ids(&self) -> Vec<u64> {
        self.engine.tracks().items().iter().map(|i| i.id.get()).collect()
    }

    /// Simulate the current track playing to its end
    pub fn finish_track(&mut self) {
        self.audio.emit(EngineEvent::Finished);
        self.pump();
    }

    pub fn set_volume(&self, volume: f32) {
        self.session.state.lock().unwrap().volume = volume;
    }
}

pub fn error_kinds(events: &[PlaybackEvent]) -> Vec<cadence_playback::ErrorKind> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::Error { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}
