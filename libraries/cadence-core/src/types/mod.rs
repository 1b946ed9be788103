mod ids;
mod playback_state;
mod track;

pub use ids::{Locator, TrackId};
pub use playback_state::{PlaybackState, RepeatMode};
pub use track::{CatalogueItem, Track, UNKNOWN_ARTIST, UNKNOWN_TITLE};
