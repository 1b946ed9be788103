//! Cadence - Playback Orchestration
//!
//! The playback engine: one playlist, one active session, driven from a
//! single control thread.
//!
//! This crate provides:
//! - Playback state machine (stopped, playing, paused, finished)
//! - Playlist cursor with persisted order and current track
//! - Repeat modes (none, one, all) and Fisher-Yates shuffle
//! - Interruption reconciliation (headphones, calls, backgrounding)
//! - Held-button seeking and a periodic time-display clock
//! - Background trailing-silence trimming of track durations
//! - Remote command surface with per-action toggles
//!
//! # Architecture
//!
//! Everything the host provides (catalogue, decoder, audio session,
//! permission dialog, preferences) comes in through the traits in
//! `cadence-core`. The engine owns all state and is only touched from the
//! control thread; timers, engine callbacks and background scans post
//! [`ControlMessage`]s into its mailbox instead of touching it directly.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_playback::{Collaborators, EngineConfig, PlaybackEvent, PlaybackService};
//!
//! # fn collaborators() -> Collaborators { unimplemented!() }
//! let (service, events) = PlaybackService::spawn(collaborators(), EngineConfig::default())?;
//! let handle = service.handle();
//!
//! handle.play()?;
//! for event in events.iter() {
//!     if let PlaybackEvent::StateChanged(state) = event {
//!         println!("now {state}");
//!     }
//! }
//! # Ok::<(), cadence_playback::PlaybackError>(())
//! ```

mod clock;
mod control;
mod engine;
mod error;
mod events;
mod interruption;
mod refiner;
mod remote;
#[cfg(feature = "symphonia-scanner")]
mod scanner;
mod seeker;
mod service;
pub mod settings;
mod shuffle;
mod timer;
mod track_manager;
pub mod types;

// Public exports
pub use clock::Clock;
pub use control::{mailbox, Command, ControlMessage, PendingAction};
pub use engine::{Collaborators, PlaybackEngine, Snapshot};
pub use error::{ErrorKind, PlaybackError, Result};
pub use events::{EventListener, PlaybackEvent};
pub use interruption::{
    InterruptionDecision, InterruptionHandler, InterruptionPhase, RouteChange, SystemEvent,
};
pub use refiner::{corrected_duration, DurationRefiner, Refinement};
pub use remote::{RemoteAction, RemoteActionKind, RemoteCommandCenter, RemoteContext};
#[cfg(feature = "symphonia-scanner")]
pub use scanner::SymphoniaScanner;
pub use seeker::Seeker;
pub use service::{PlaybackService, ServiceHandle};
pub use settings::PlaybackSettings;
pub use shuffle::{fisher_yates, shuffle};
pub use track_manager::TrackManager;
pub use types::{EngineConfig, SeekDirection, SilenceTrimConfig};
