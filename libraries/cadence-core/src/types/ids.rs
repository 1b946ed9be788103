/// ID and locator types for catalogue entries
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Persistent catalogue identifier
///
/// Stable across launches; this is what gets persisted for the playlist
/// order and the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(u64);

impl TrackId {
    /// Create a new track ID
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw persistent ID
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier used to open a track's audio data
///
/// Usually a `file://` URL or a bare filesystem path. Other schemes are
/// carried through untouched for audio engines that understand them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Create a locator from any string form
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Create a `file://` locator for a filesystem path
    pub fn from_path(path: &Path) -> Self {
        Self(format!("{FILE_SCHEME}{}", path.display()))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to a filesystem path
    ///
    /// Returns `None` for non-file schemes (`http://`, `ipod-library://`, ...).
    pub fn to_path(&self) -> Option<PathBuf> {
        if let Some(rest) = self.0.strip_prefix(FILE_SCHEME) {
            return Some(PathBuf::from(rest));
        }
        if self.0.contains("://") {
            return None;
        }
        Some(PathBuf::from(&self.0))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
