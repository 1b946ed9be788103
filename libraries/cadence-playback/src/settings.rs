//! Persisted playback state
//!
//! Three values survive a relaunch: the repeat mode, the playlist order (as
//! catalogue IDs) and the current track's ID. Persistence is a convenience,
//! so failures are logged and never interrupt playback.

use cadence_core::{KeyValueStore, RepeatMode, TrackId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Repeat mode (`"none"`, `"one"`, `"all"`)
pub const SETTING_REPEAT_MODE: &str = "playback.repeat_mode";

/// Catalogue ID of the current track
pub const SETTING_CURRENT_TRACK_ID: &str = "playback.current_track_id";

/// Ordered catalogue IDs of the playlist
pub const SETTING_TRACK_IDS: &str = "playback.track_ids";

/// Typed view over a [`KeyValueStore`]
pub struct PlaybackSettings {
    store: Box<dyn KeyValueStore>,
}

impl PlaybackSettings {
    /// Wrap a store
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved repeat mode (default if absent or unreadable)
    pub fn repeat_mode(&self) -> RepeatMode {
        self.load::<RepeatMode>(SETTING_REPEAT_MODE).unwrap_or_default()
    }

    /// Persist the repeat mode
    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.save(SETTING_REPEAT_MODE, &mode);
    }

    /// Saved current-track ID
    pub fn current_track_id(&self) -> Option<TrackId> {
        self.load(SETTING_CURRENT_TRACK_ID)
    }

    /// Persist the current-track ID (`None` clears it)
    pub fn set_current_track_id(&mut self, id: Option<TrackId>) {
        match id {
            Some(id) => self.save(SETTING_CURRENT_TRACK_ID, &id),
            None => self.remove(SETTING_CURRENT_TRACK_ID),
        }
    }

    /// Saved playlist order
    pub fn track_ids(&self) -> Option<Vec<TrackId>> {
        self.load(SETTING_TRACK_IDS)
    }

    /// Persist the playlist order
    pub fn set_track_ids(&mut self, ids: &[TrackId]) {
        self.save(SETTING_TRACK_IDS, ids);
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.store.load(key) {
            Ok(value) => value?,
            Err(e) => {
                warn!(key, error = %e, "Failed to load setting");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(key, error = %e, "Ignoring malformed setting");
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        let result = serde_json::to_value(value)
            .map_err(cadence_core::CoreError::from)
            .and_then(|value| self.store.save(key, value));
        if let Err(e) = result {
            warn!(key, error = %e, "Failed to persist setting");
        }
    }

    fn remove(&mut self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "Failed to clear setting");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{CoreError, MemoryStore};
    use serde_json::{json, Value};

    #[test]
    fn defaults_when_nothing_saved() {
        let settings = PlaybackSettings::new(Box::new(MemoryStore::new()));
        assert_eq!(settings.repeat_mode(), RepeatMode::None);
        assert_eq!(settings.current_track_id(), None);
        assert_eq!(settings.track_ids(), None);
    }

    #[test]
    fn values_round_trip_through_store() {
        let mut settings = PlaybackSettings::new(Box::new(MemoryStore::new()));
        settings.set_repeat_mode(RepeatMode::All);
        settings.set_track_ids(&[TrackId::new(9), TrackId::new(3)]);
        settings.set_current_track_id(Some(TrackId::new(3)));

        assert_eq!(settings.repeat_mode(), RepeatMode::All);
        assert_eq!(settings.track_ids(), Some(vec![TrackId::new(9), TrackId::new(3)]));
        assert_eq!(settings.current_track_id(), Some(TrackId::new(3)));

        settings.set_current_track_id(None);
        assert_eq!(settings.current_track_id(), None);
    }

    #[test]
    fn malformed_values_are_ignored() {
        let mut store = MemoryStore::new();
        store.save(SETTING_REPEAT_MODE, json!("sideways")).unwrap();
        store.save(SETTING_TRACK_IDS, json!({"not": "a list"})).unwrap();

        let settings = PlaybackSettings::new(Box::new(store));
        assert_eq!(settings.repeat_mode(), RepeatMode::None);
        assert_eq!(settings.track_ids(), None);
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn load(&self, _: &str) -> cadence_core::Result<Option<Value>> {
            Err(CoreError::storage("disk on fire"))
        }
        fn save(&mut self, _: &str, _: Value) -> cadence_core::Result<()> {
            Err(CoreError::storage("disk on fire"))
        }
        fn remove(&mut self, _: &str) -> cadence_core::Result<()> {
            Err(CoreError::storage("disk on fire"))
        }
    }

    #[test]
    fn store_failures_never_escape() {
        let mut settings = PlaybackSettings::new(Box::new(BrokenStore));
        settings.set_repeat_mode(RepeatMode::One);
        settings.set_current_track_id(None);
        assert_eq!(settings.repeat_mode(), RepeatMode::None);
    }
}
