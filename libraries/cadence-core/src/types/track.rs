/// Track and catalogue item domain types
use crate::types::{Locator, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Placeholder artist when neither the tags nor the title provide one
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Placeholder title when the tags provide none
pub const UNKNOWN_TITLE: &str = "Unknown Title";

const TITLE_SEPARATOR: &str = " - ";

/// Opaque handle to one entry of the device media catalogue
///
/// Carries the raw, unresolved metadata. Playlists hold these handles rather
/// than `Track`s; resolution happens lazily for the entries that get shown or
/// played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueItem {
    /// Persistent catalogue ID
    pub id: TrackId,

    /// Raw artist tag
    pub artist: Option<String>,

    /// Raw title tag
    pub title: Option<String>,

    /// Nominal duration reported by the catalogue
    pub duration: Duration,

    /// Where the audio lives, if the catalogue could resolve it
    pub locator: Option<Locator>,
}

impl CatalogueItem {
    /// Create an item with no metadata
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            artist: None,
            title: None,
            duration: Duration::ZERO,
            locator: None,
        }
    }

    /// Set the raw artist tag
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Set the raw title tag
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the nominal duration
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the playable locator
    #[must_use]
    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }
}

/// Resolved, displayable track
///
/// Equality is by (artist, title, locator): two catalogue entries pointing at
/// the same audio with the same names are the same track for playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Persistent catalogue ID
    pub id: TrackId,

    /// Artist name (never empty)
    pub artist: String,

    /// Track title (never empty)
    pub title: String,

    /// Track duration; shortened later if trailing silence is trimmed
    pub duration: Duration,

    /// Playable locator (absence is reportable, not an error here)
    pub locator: Option<Locator>,
}

impl Track {
    /// Resolve a catalogue item into a track, applying artist/title fallbacks
    ///
    /// A missing artist with a title of the form `"X - Y"` (exactly one
    /// separator) becomes artist `X`, title `Y`. Anything still missing falls
    /// back to [`UNKNOWN_ARTIST`] / [`UNKNOWN_TITLE`].
    pub fn resolve(item: &CatalogueItem) -> Self {
        let (artist, title) = resolve_names(item.artist.as_deref(), item.title.as_deref());
        Self {
            id: item.id,
            artist,
            title,
            duration: item.duration,
            locator: item.locator.clone(),
        }
    }

    /// Whether the track has something an audio engine could open
    pub fn is_playable(&self) -> bool {
        self.locator.is_some()
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.artist == other.artist && self.title == other.title && self.locator == other.locator
    }
}

impl Eq for Track {}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.artist, TITLE_SEPARATOR, self.title)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn resolve_names(artist: Option<&str>, title: Option<&str>) -> (String, String) {
    let artist = non_empty(artist);
    let title = non_empty(title);

    if artist.is_none() {
        if let Some((split_artist, split_title)) = title.and_then(split_dashed_title) {
            return (split_artist.to_string(), split_title.to_string());
        }
    }

    (
        artist.unwrap_or(UNKNOWN_ARTIST).to_string(),
        title.unwrap_or(UNKNOWN_TITLE).to_string(),
    )
}

fn split_dashed_title(raw: &str) -> Option<(&str, &str)> {
    let mut parts = raw.split(TITLE_SEPARATOR);
    let artist = parts.next()?.trim();
    let title = parts.next()?.trim();
    if parts.next().is_some() || artist.is_empty() || title.is_empty() {
        return None;
    }
    Some((artist, title))
}
