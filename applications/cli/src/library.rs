//! Directory-backed media catalogue
//!
//! The "device library" for the headless driver is a set of directories.
//! Every audio file below them is one catalogue item, identified by a hash of
//! its path so IDs survive restarts as long as files don't move.

use cadence_core::{
    Authorization, AuthorizationCallback, Catalogue, CatalogueItem, CoreError, Locator, Result,
    TrackId,
};
use lofty::{Accessor, AudioFile, Probe, TaggedFileExt};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Supported audio file extensions
const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "aac", "m4a", "opus"];

/// Check if a file is a supported audio file
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Stable persistent ID for a file: the first eight bytes of SHA-256(path)
pub fn track_id_for(path: &Path) -> TrackId {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    TrackId::new(u64::from_be_bytes(bytes))
}

/// Read tags and duration for one file
///
/// Files lofty can't parse still become items, titled after the file name
/// and with zero nominal duration; whether they play is up to the engine.
pub fn read_item(path: &Path) -> CatalogueItem {
    let mut item = CatalogueItem::new(track_id_for(path)).with_locator(Locator::from_path(path));

    match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(tagged_file) => {
            item.duration = tagged_file.properties().duration();
            if let Some(tag) = tagged_file.primary_tag().or(tagged_file.first_tag()) {
                item.artist = tag.artist().map(|s| s.to_string());
                item.title = tag.title().map(|s| s.to_string());
            }
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No readable tags");
        }
    }

    // Fallback: Use filename as title if no title in tags
    if item.title.is_none() {
        item.title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());
    }

    item
}

/// Catalogue over every audio file below a set of root directories
#[derive(Debug, Clone)]
pub struct DirectoryCatalogue {
    roots: Vec<PathBuf>,
    follow_links: bool,
}

impl DirectoryCatalogue {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            follow_links: false,
        }
    }

    /// Set whether to follow symbolic links
    #[must_use]
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Audio files below the roots, sorted by path
    ///
    /// Unreadable roots are skipped with a warning.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for root in &self.roots {
            if !root.is_dir() {
                warn!(root = %root.display(), "Library root is not a directory");
                continue;
            }

            let walker = WalkDir::new(root).follow_links(self.follow_links);
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() && is_audio_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        }

        files.sort();
        files.dedup();
        files
    }
}

impl Catalogue for DirectoryCatalogue {
    fn fetch_all(&self) -> Result<Vec<CatalogueItem>> {
        let files = self.scan();
        info!(count = files.len(), "Scanned library");
        Ok(files.iter().map(|path| read_item(path)).collect())
    }

    fn find(&self, ids: &[TrackId]) -> Result<Vec<CatalogueItem>> {
        let wanted: HashSet<TrackId> = ids.iter().copied().collect();
        Ok(self
            .scan()
            .iter()
            .filter(|path| wanted.contains(&track_id_for(path)))
            .map(|path| read_item(path))
            .collect())
    }
}

/// Library permission: granted when every root can be listed
#[derive(Debug, Clone)]
pub struct LibraryAccess {
    roots: Vec<PathBuf>,
}

impl LibraryAccess {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    fn check(&self) -> std::result::Result<(), CoreError> {
        if self.roots.is_empty() {
            return Err(CoreError::catalogue("no library directories configured"));
        }
        for root in &self.roots {
            fs::read_dir(root).map_err(|e| {
                CoreError::catalogue(format!("cannot read {}: {}", root.display(), e))
            })?;
        }
        Ok(())
    }
}

impl Authorization for LibraryAccess {
    fn is_authorized(&self) -> bool {
        self.check().is_ok()
    }

    fn authorize(&self, completion: AuthorizationCallback) {
        match self.check() {
            Ok(()) => completion(true),
            Err(e) => {
                warn!(error = %e, "Library access denied");
                completion(false);
            }
        }
    }
}

/// Nominal duration as lofty reports it, for files that must be playable
pub fn probe_duration(path: &Path) -> Result<Duration> {
    let tagged_file = Probe::open(path)
        .map_err(|e| CoreError::audio(format!("Failed to open file: {}", e)))?
        .read()
        .map_err(|e| CoreError::audio(format!("Failed to read file: {}", e)))?;
    Ok(tagged_file.properties().duration())
}
