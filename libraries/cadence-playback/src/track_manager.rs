//! Playlist and cursor management
//!
//! The playlist holds raw catalogue items; only the item under the cursor is
//! resolved into a [`Track`]. Every cursor move persists the current ID and
//! restarts duration refinement for the new track.

use crate::error::{PlaybackError, Result};
use crate::refiner::{DurationRefiner, Refinement};
use crate::settings::PlaybackSettings;
use crate::shuffle;
use cadence_core::{Authorization, Catalogue, CatalogueItem, Track, TrackId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Playlist + cursor
pub struct TrackManager {
    catalogue: Arc<dyn Catalogue>,
    authorization: Arc<dyn Authorization>,
    settings: PlaybackSettings,
    refiner: DurationRefiner,
    items: Vec<CatalogueItem>,
    cursor: usize,
    current: Option<Track>,
    refined_duration: Option<Duration>,
    revision: u64,
}

impl TrackManager {
    /// Create a manager with an empty playlist
    pub fn new(
        catalogue: Arc<dyn Catalogue>,
        authorization: Arc<dyn Authorization>,
        settings: PlaybackSettings,
        refiner: DurationRefiner,
    ) -> Self {
        Self {
            catalogue,
            authorization,
            settings,
            refiner,
            items: Vec::new(),
            cursor: 0,
            current: None,
            refined_duration: None,
            revision: 0,
        }
    }

    /// Restore the playlist and cursor saved by a previous session
    ///
    /// Without authorization or saved state the playlist is simply empty and
    /// the saved state is left alone for a later, authorized load. Saved IDs that no longer resolve are dropped; if the saved current ID
    /// is gone the cursor starts at 0.
    pub fn load_saved_playlist(&mut self) -> Result<()> {
        if !self.authorization.is_authorized() {
            debug!("Not authorized, starting with an empty playlist");
            self.reset();
            return Ok(());
        }

        let ids = self.settings.track_ids().unwrap_or_default();
        if ids.is_empty() {
            debug!("No saved playlist");
            self.reset();
            return Ok(());
        }

        let mut found: HashMap<TrackId, CatalogueItem> = self
            .catalogue
            .find(&ids)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();
        let items: Vec<CatalogueItem> = ids.iter().filter_map(|id| found.remove(id)).collect();

        let saved_current = self.settings.current_track_id();
        let cursor = saved_current
            .and_then(|id| items.iter().position(|item| item.id == id))
            .unwrap_or(0);

        info!(
            saved = ids.len(),
            restored = items.len(),
            cursor,
            "Restored saved playlist"
        );
        self.replace_items(items, cursor);
        Ok(())
    }

    /// Replace the playlist with the full catalogue
    ///
    /// The cursor resets to 0 and the new order is persisted.
    pub fn load_new_playlist(&mut self, shuffled: bool) -> Result<()> {
        if !self.authorization.is_authorized() {
            return Err(PlaybackError::Authorization);
        }

        let mut items = self.catalogue.fetch_all()?;
        if shuffled {
            shuffle::shuffle(&mut items);
        }

        info!(tracks = items.len(), shuffled, "Loaded new playlist");
        self.replace_items(items, 0);
        Ok(())
    }

    /// Move the cursor to `track`
    ///
    /// Fails if the track is not (or no longer) in the playlist.
    pub fn prime(&mut self, track: &Track) -> Result<()> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == track.id)
            .ok_or(PlaybackError::TrackNotFound(track.id))?;
        self.set_cursor(index);
        Ok(())
    }

    /// Step back one track; `false` at the start
    pub fn cue_previous(&mut self) -> bool {
        if self.cursor == 0 || self.items.is_empty() {
            return false;
        }
        self.set_cursor(self.cursor - 1);
        true
    }

    /// Step forward one track; `false` at the end
    pub fn cue_next(&mut self) -> bool {
        if self.cursor + 1 >= self.items.len() {
            return false;
        }
        self.set_cursor(self.cursor + 1);
        true
    }

    /// Jump to the first track
    pub fn cue_start(&mut self) {
        if !self.items.is_empty() {
            self.set_cursor(0);
        }
    }

    /// Jump to the last track
    pub fn cue_end(&mut self) {
        if let Some(last) = self.items.len().checked_sub(1) {
            self.set_cursor(last);
        }
    }

    /// Remove the item at `index`
    ///
    /// A cursor at or after `index` steps back by one (never below 0), so a
    /// following `cue_next` lands on the item that came after the removed
    /// one.
    pub fn remove_track(&mut self, index: usize) -> Option<CatalogueItem> {
        if index >= self.items.len() {
            return None;
        }

        let removed = self.items.remove(index);
        info!(track_id = %removed.id, index, remaining = self.items.len(), "Removed track from playlist");

        let ids: Vec<TrackId> = self.items.iter().map(|item| item.id).collect();
        self.settings.set_track_ids(&ids);

        if self.items.is_empty() {
            self.clear();
            return Some(removed);
        }

        let cursor = if index <= self.cursor {
            self.cursor.saturating_sub(1)
        } else {
            self.cursor
        };
        self.set_cursor(cursor.min(self.items.len() - 1));
        Some(removed)
    }

    /// Apply a finished refinement if it is still relevant
    ///
    /// Returns the corrected duration when the current track was updated.
    pub fn apply_refinement(&mut self, refinement: &Refinement) -> Option<Duration> {
        if !self.refiner.is_current(refinement) {
            debug!(track_id = %refinement.track_id, "Dropping stale refinement");
            return None;
        }

        let track = self.current.as_mut().filter(|t| t.id == refinement.track_id)?;
        info!(
            track_id = %track.id,
            nominal_ms = track.duration.as_millis() as u64,
            refined_ms = refinement.duration.as_millis() as u64,
            "Trimmed trailing silence"
        );
        track.duration = refinement.duration;
        self.refined_duration = Some(refinement.duration);
        Some(refinement.duration)
    }

    /// Number of tracks in the playlist
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the playlist is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cursor index (0 when empty)
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Resolved track under the cursor
    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Corrected duration of the current track, once refinement landed
    pub fn refined_duration(&self) -> Option<Duration> {
        self.refined_duration
    }

    /// Resolve the track at `index` (for display)
    pub fn track_at(&self, index: usize) -> Option<Track> {
        self.items.get(index).map(Track::resolve)
    }

    /// Raw playlist items in order
    pub fn items(&self) -> &[CatalogueItem] {
        &self.items
    }

    /// Counter bumped whenever the current track changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Persisted settings
    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Persisted settings (mutable)
    pub fn settings_mut(&mut self) -> &mut PlaybackSettings {
        &mut self.settings
    }

    fn replace_items(&mut self, items: Vec<CatalogueItem>, cursor: usize) {
        self.items = items;
        let ids: Vec<TrackId> = self.items.iter().map(|item| item.id).collect();
        self.settings.set_track_ids(&ids);

        if self.items.is_empty() {
            self.clear();
        } else {
            self.current = None;
            self.set_cursor(cursor);
        }
    }

    fn set_cursor(&mut self, index: usize) {
        let Some(item) = self.items.get(index) else {
            return;
        };
        self.cursor = index;

        let track = Track::resolve(item);
        if self.current.as_ref().is_some_and(|current| current.id == track.id) {
            return;
        }

        debug!(index, track_id = %track.id, track = %track, "Cursor moved");
        self.settings.set_current_track_id(Some(track.id));
        self.refiner.refine(&track);
        self.current = Some(track);
        self.refined_duration = None;
        self.revision += 1;
    }

    /// Empty the in-memory playlist without touching persisted state
    fn reset(&mut self) {
        let had_track = self.current.is_some();
        self.items.clear();
        self.cursor = 0;
        self.current = None;
        self.refined_duration = None;
        self.refiner.cancel();
        if had_track {
            self.revision += 1;
        }
    }

    fn clear(&mut self) {
        self.reset();
        self.settings.set_current_track_id(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SilenceTrimConfig;
    use cadence_core::{
        AuthorizationCallback, Locator, MemoryStore, SignalExtent, SilenceScanner,
    };
    use std::sync::atomic::AtomicBool;

    struct Library(Vec<CatalogueItem>);

    impl Catalogue for Library {
        fn fetch_all(&self) -> cadence_core::Result<Vec<CatalogueItem>> {
            Ok(self.0.clone())
        }

        fn find(&self, ids: &[TrackId]) -> cadence_core::Result<Vec<CatalogueItem>> {
            // Deliberately reversed to prove callers reorder
            Ok(self.0.iter().rev().filter(|i| ids.contains(&i.id)).cloned().collect())
        }
    }

    struct Access(bool);

    impl Authorization for Access {
        fn is_authorized(&self) -> bool {
            self.0
        }

        fn authorize(&self, completion: AuthorizationCallback) {
            completion(self.0);
        }
    }

    struct NoScan;

    impl SilenceScanner for NoScan {
        fn scan(&self, _: &Locator, _: &AtomicBool) -> cadence_core::Result<Option<SignalExtent>> {
            Ok(None)
        }
    }

    fn library(n: u64) -> Vec<CatalogueItem> {
        (1..=n)
            .map(|id| {
                CatalogueItem::new(TrackId::new(id))
                    .with_artist("Artist")
                    .with_title(format!("Song {id}"))
                    .with_locator(Locator::new(format!("/music/{id}.mp3")))
            })
            .collect()
    }

    fn manager_with(items: Vec<CatalogueItem>, authorized: bool, store: MemoryStore) -> TrackManager {
        let refiner = DurationRefiner::new(Arc::new(NoScan), SilenceTrimConfig::default(), Arc::new(|_| {}));
        TrackManager::new(
            Arc::new(Library(items)),
            Arc::new(Access(authorized)),
            PlaybackSettings::new(Box::new(store)),
            refiner,
        )
    }

    fn ids(manager: &TrackManager) -> Vec<u64> {
        manager.items().iter().map(|i| i.id.get()).collect()
    }

    #[test]
    fn new_playlist_starts_at_zero_and_persists_order() {
        let mut manager = manager_with(library(4), true, MemoryStore::new());
        manager.load_new_playlist(false).unwrap();

        assert_eq!(ids(&manager), vec![1, 2, 3, 4]);
        assert_eq!(manager.cursor(), 0);
        assert_eq!(manager.current_track().unwrap().title, "Song 1");
        assert_eq!(
            manager.settings().track_ids(),
            Some((1..=4).map(TrackId::new).collect())
        );
        assert_eq!(manager.settings().current_track_id(), Some(TrackId::new(1)));
    }

    #[test]
    fn saved_playlist_is_restored_in_saved_order() {
        let mut store = MemoryStore::new();
        cadence_core::KeyValueStore::save(
            &mut store,
            crate::settings::SETTING_TRACK_IDS,
            serde_json::json!([3, 1, 9, 5]),
        )
        .unwrap();
        cadence_core::KeyValueStore::save(
            &mut store,
            crate::settings::SETTING_CURRENT_TRACK_ID,
            serde_json::json!(5),
        )
        .unwrap();

        let mut manager = manager_with(library(5), true, store);
        manager.load_saved_playlist().unwrap();

        // 9 no longer exists in the catalogue
        assert_eq!(ids(&manager), vec![3, 1, 5]);
        assert_eq!(manager.cursor(), 2);
        assert_eq!(manager.current_track().unwrap().id, TrackId::new(5));
    }

    #[test]
    fn saved_playlist_requires_authorization() {
        let mut store = MemoryStore::new();
        cadence_core::KeyValueStore::save(
            &mut store,
            crate::settings::SETTING_TRACK_IDS,
            serde_json::json!([1, 2]),
        )
        .unwrap();

        let mut manager = manager_with(library(2), false, store);
        manager.load_saved_playlist().unwrap();
        assert!(manager.is_empty());
        assert_eq!(manager.cursor(), 0);
        assert!(manager.current_track().is_none());
    }

    #[test]
    fn unauthorized_load_keeps_saved_state() {
        let mut store = MemoryStore::new();
        cadence_core::KeyValueStore::save(
            &mut store,
            crate::settings::SETTING_TRACK_IDS,
            serde_json::json!([1, 2, 3]),
        )
        .unwrap();
        cadence_core::KeyValueStore::save(
            &mut store,
            crate::settings::SETTING_CURRENT_TRACK_ID,
            serde_json::json!(3),
        )
        .unwrap();

        let mut manager = manager_with(library(3), false, store);
        manager.load_saved_playlist().unwrap();
        assert!(manager.is_empty());
        assert_eq!(manager.settings().current_track_id(), Some(TrackId::new(3)));
        assert_eq!(
            manager.settings().track_ids(),
            Some((1..=3).map(TrackId::new).collect())
        );
    }

    #[test]
    fn cold_start_is_empty_without_error() {
        let mut manager = manager_with(library(3), true, MemoryStore::new());
        manager.load_saved_playlist().unwrap();
        assert!(manager.is_empty());
    }

    #[test]
    fn new_playlist_requires_authorization() {
        let mut manager = manager_with(library(3), false, MemoryStore::new());
        assert!(matches!(
            manager.load_new_playlist(true),
            Err(PlaybackError::Authorization)
        ));
    }

    #[test]
    fn cue_boundaries_do_not_wrap() {
        let mut manager = manager_with(library(3), true, MemoryStore::new());
        manager.load_new_playlist(false).unwrap();

        assert!(!manager.cue_previous());
        assert_eq!(manager.cursor(), 0);

        assert!(manager.cue_next());
        assert!(manager.cue_next());
        assert!(!manager.cue_next());
        assert_eq!(manager.cursor(), 2);

        manager.cue_start();
        assert_eq!(manager.cursor(), 0);
        manager.cue_end();
        assert_eq!(manager.cursor(), 2);
        assert_eq!(manager.settings().current_track_id(), Some(TrackId::new(3)));
    }

    #[test]
    fn prime_finds_track_by_id() {
        let mut manager = manager_with(library(4), true, MemoryStore::new());
        manager.load_new_playlist(false).unwrap();

        let target = manager.track_at(2).unwrap();
        manager.prime(&target).unwrap();
        assert_eq!(manager.cursor(), 2);

        let mut missing = target.clone();
        missing.id = TrackId::new(404);
        assert!(matches!(
            manager.prime(&missing),
            Err(PlaybackError::TrackNotFound(id)) if id == TrackId::new(404)
        ));
        assert_eq!(manager.cursor(), 2);
    }

    #[test]
    fn removing_current_steps_back() {
        let mut manager = manager_with(library(4), true, MemoryStore::new());
        manager.load_new_playlist(false).unwrap();
        manager.cue_next();
        manager.cue_next();

        let removed = manager.remove_track(2).unwrap();
        assert_eq!(removed.id, TrackId::new(3));
        assert_eq!(manager.cursor(), 1);
        assert!(manager.cue_next());
        assert_eq!(manager.current_track().unwrap().id, TrackId::new(4));
    }

    #[test]
    fn removing_first_keeps_cursor_at_zero() {
        let mut manager = manager_with(library(3), true, MemoryStore::new());
        manager.load_new_playlist(false).unwrap();

        manager.remove_track(0);
        assert_eq!(manager.cursor(), 0);
        assert_eq!(manager.current_track().unwrap().id, TrackId::new(2));
    }

    #[test]
    fn removing_after_cursor_leaves_it_alone() {
        let mut manager = manager_with(library(3), true, MemoryStore::new());
        manager.load_new_playlist(false).unwrap();
        let revision = manager.revision();

        manager.remove_track(2);
        assert_eq!(manager.cursor(), 0);
        assert_eq!(manager.revision(), revision);
    }

    #[test]
    fn removing_last_item_empties_playlist() {
        let mut manager = manager_with(library(1), true, MemoryStore::new());
        manager.load_new_playlist(false).unwrap();

        manager.remove_track(0);
        assert!(manager.is_empty());
        assert_eq!(manager.cursor(), 0);
        assert!(manager.current_track().is_none());
        assert_eq!(manager.settings().current_track_id(), None);
        assert!(manager.remove_track(0).is_none());
    }

    #[test]
    fn stale_refinement_is_dropped() {
        let mut manager = manager_with(library(2), true, MemoryStore::new());
        manager.load_new_playlist(false).unwrap();

        let stale = Refinement {
            track_id: TrackId::new(1),
            generation: 0,
            duration: Duration::from_secs(10),
        };
        assert_eq!(manager.apply_refinement(&stale), None);
        assert_eq!(manager.refined_duration(), None);
    }
}
