//! Cadence CLI - headless driver for the playback engine
//!
//! Wires the engine to a directory-backed catalogue, a JSON state file, a
//! symphonia silence scanner and a silent clocked audio engine, so the whole
//! state machine can be exercised from a terminal.

pub mod config;
pub mod headless;
pub mod library;
pub mod repl;

use cadence_core::JsonFileStore;
use cadence_playback::{Collaborators, PlaybackEvent, SymphoniaScanner};
use config::CliConfig;
use headless::{HeadlessEngine, HeadlessSession};
use library::{DirectoryCatalogue, LibraryAccess};
use repl::format_time;
use std::sync::Arc;

/// Build the engine's collaborators from configuration
pub fn collaborators(config: &CliConfig) -> Collaborators {
    let roots = config.library.roots.clone();
    Collaborators {
        authorization: Arc::new(LibraryAccess::new(roots.clone())),
        catalogue: Arc::new(
            DirectoryCatalogue::new(roots).follow_links(config.library.follow_links),
        ),
        audio: Box::new(HeadlessEngine::new()),
        session: Box::new(HeadlessSession::new(config.output.volume)),
        store: Box::new(JsonFileStore::open(&config.state.path)),
        scanner: Arc::new(SymphoniaScanner::new(config.engine.silence_trim.threshold)),
    }
}

/// One-line rendering of an engine event for the terminal
pub fn describe(event: &PlaybackEvent) -> String {
    match event {
        PlaybackEvent::StateChanged(state) => format!("[{state}]"),
        PlaybackEvent::TimeChanged { elapsed, duration } => {
            format!("  {} / {}", format_time(*elapsed), format_time(*duration))
        }
        PlaybackEvent::TrackChanged(Some(track)) => format!("> {track}"),
        PlaybackEvent::TrackChanged(None) => "> (no track)".to_string(),
        PlaybackEvent::RepeatModeChanged(mode) => format!("repeat: {mode}"),
        PlaybackEvent::DurationRefined { track_id, duration } => {
            format!("track {track_id} trimmed to {}", format_time(*duration))
        }
        PlaybackEvent::Error { kind, message } => format!("error ({kind}): {message}"),
    }
}
