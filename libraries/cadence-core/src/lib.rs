//! Cadence Core
//!
//! Platform-agnostic types, collaborator contracts, and error handling for the
//! Cadence playback engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `CatalogueItem`, `TrackId`, `Locator`,
//!   `PlaybackState`, `RepeatMode`
//! - **Collaborator Contracts**: `Authorization`, `Catalogue`, `AudioEngine`,
//!   `EngineHandle`, `AudioSession`, `SilenceScanner`
//! - **Persistence**: the `KeyValueStore` contract with in-memory and JSON-file stores
//! - **Error Handling**: unified `CoreError` and `Result` types
//!
//! Everything a host platform provides (media library, decoder, audio output,
//! permission dialog, preferences) is consumed through these traits, so the
//! playback engine never depends on a concrete platform.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{CatalogueItem, Track, TrackId};
//! use std::time::Duration;
//!
//! let item = CatalogueItem::new(TrackId::new(7))
//!     .with_title("Nina Simone - Sinnerman")
//!     .with_duration(Duration::from_secs(620));
//!
//! let track = Track::resolve(&item);
//! assert_eq!(track.artist, "Nina Simone");
//! assert_eq!(track.title, "Sinnerman");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use traits::{
    AudioEngine, AudioSession, Authorization, AuthorizationCallback, Catalogue, EngineEvent,
    EngineEventSink, EngineHandle, SignalExtent, SilenceScanner,
};
pub use types::{
    CatalogueItem, Locator, PlaybackState, RepeatMode, Track, TrackId, UNKNOWN_ARTIST,
    UNKNOWN_TITLE,
};
