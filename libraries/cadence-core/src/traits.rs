/// Collaborator contracts consumed by the playback engine
use crate::error::Result;
use crate::types::{CatalogueItem, Locator, TrackId};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Completion for an authorization request, called with the outcome
pub type AuthorizationCallback = Box<dyn FnOnce(bool) + Send>;

/// Media-library access permission
///
/// Implementers wrap the platform permission dialog. `authorize` may complete
/// on any thread; the engine re-posts the outcome onto its control thread.
pub trait Authorization: Send + Sync {
    /// Whether catalogue access is currently granted
    fn is_authorized(&self) -> bool;

    /// Ask for access, calling `completion` exactly once with the outcome
    fn authorize(&self, completion: AuthorizationCallback);
}

/// Read-only device media catalogue
pub trait Catalogue: Send + Sync {
    /// Every playable item, in catalogue order
    ///
    /// # Errors
    /// Returns an error if the catalogue cannot be queried
    fn fetch_all(&self) -> Result<Vec<CatalogueItem>>;

    /// Items for the given persistent IDs
    ///
    /// IDs that no longer exist are skipped. Order of the result is not
    /// significant; callers reorder by the IDs they asked for.
    ///
    /// # Errors
    /// Returns an error if the catalogue cannot be queried
    fn find(&self, ids: &[TrackId]) -> Result<Vec<CatalogueItem>>;
}

/// Asynchronous notifications from an open engine handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The track played through to its natural end
    Finished,

    /// The audio data could not be decoded mid-playback
    DecodeFailed(String),
}

/// Callback an engine handle uses to report [`EngineEvent`]s
pub type EngineEventSink = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// Factory for playable engine handles
pub trait AudioEngine: Send {
    /// Open the audio at `locator`
    ///
    /// The returned handle reports completion and decode failures through
    /// `events`. Dropping the handle must release its resources.
    ///
    /// # Errors
    /// Returns an error if the locator cannot be opened
    fn open(&mut self, locator: &Locator, events: EngineEventSink) -> Result<Box<dyn EngineHandle>>;
}

/// An open, playable resource bound to one track's locator
pub trait EngineHandle: Send {
    /// Locator this handle was opened with
    fn locator(&self) -> &Locator;

    /// Whether audio is currently being rendered
    fn is_playing(&self) -> bool;

    /// Total duration of the opened audio
    fn duration(&self) -> Duration;

    /// Current play-head position
    fn current_time(&self) -> Duration;

    /// Move the play-head
    fn set_current_time(&mut self, position: Duration);

    /// Prepare buffers for playback; `false` on failure
    fn prepare(&mut self) -> bool;

    /// Start or resume rendering; `false` on failure
    fn play(&mut self) -> bool;

    /// Pause rendering, keeping the play-head
    fn pause(&mut self);

    /// Stop rendering
    fn stop(&mut self);
}

/// Platform audio session
pub trait AudioSession: Send {
    /// Current hardware output volume (0.0 = muted)
    fn output_volume(&self) -> f32;

    /// Select the playback category
    ///
    /// # Errors
    /// Returns an error if the platform rejects the category
    fn set_category_playback(&mut self) -> Result<()>;

    /// Activate or deactivate the session
    ///
    /// # Errors
    /// Returns an error if the platform refuses the transition
    fn set_active(&mut self, active: bool) -> Result<()>;
}

/// Where audible signal ends within a decoded track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalExtent {
    /// Length of the decoded signal
    pub total: Duration,

    /// Time just after the last non-silent sample; `None` if entirely silent
    pub last_audible: Option<Duration>,
}

/// Inspects a track's audio for trailing silence
pub trait SilenceScanner: Send + Sync {
    /// Scan the audio at `locator`
    ///
    /// Implementations must poll `cancelled` regularly and return `Ok(None)`
    /// once it is set.
    ///
    /// # Errors
    /// Returns an error if the audio cannot be opened or decoded
    fn scan(&self, locator: &Locator, cancelled: &AtomicBool) -> Result<Option<SignalExtent>>;
}
