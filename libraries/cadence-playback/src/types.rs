//! Configuration and small shared types for the playback engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Direction of a held seek button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekDirection {
    /// Fast-forward
    Forward,

    /// Rewind
    Backward,
}

impl SeekDirection {
    /// Sign applied to each seek step
    pub fn sign(self) -> i8 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Trailing-silence trimming parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceTrimConfig {
    /// Trailing silence must be strictly longer than this to be trimmed
    pub min_trailing_secs: f64,

    /// Silence kept after the last audible sample once trimmed
    pub reflection_secs: f64,

    /// Absolute sample amplitude at or below which a sample counts as silent
    pub threshold: f32,
}

impl Default for SilenceTrimConfig {
    fn default() -> Self {
        Self {
            min_trailing_secs: 5.0,
            reflection_secs: 2.0,
            threshold: 0.0,
        }
    }
}

impl SilenceTrimConfig {
    /// Minimum trailing silence as a duration
    pub fn min_trailing(&self) -> Duration {
        Duration::from_secs_f64(self.min_trailing_secs.max(0.0))
    }

    /// Reflection buffer as a duration
    pub fn reflection(&self) -> Duration {
        Duration::from_secs_f64(self.reflection_secs.max(0.0))
    }
}

/// Playback engine configuration
///
/// Every field has a default, so a partial config file (or none) is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period of time-display ticks while playing (milliseconds)
    pub clock_interval_ms: u64,

    /// Period of seek steps while a seek button is held (milliseconds)
    pub seek_interval_ms: u64,

    /// Play-head movement per seek step (seconds)
    pub seek_step_secs: u64,

    /// Trailing-silence trimming
    pub silence_trim: SilenceTrimConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clock_interval_ms: 1000,
            seek_interval_ms: 200,
            seek_step_secs: 1,
            silence_trim: SilenceTrimConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Clock tick period (never zero)
    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms.max(1))
    }

    /// Seek tick period (never zero)
    pub fn seek_interval(&self) -> Duration {
        Duration::from_millis(self.seek_interval_ms.max(1))
    }

    /// Play-head movement per seek tick
    pub fn seek_step(&self) -> Duration {
        Duration::from_secs(self.seek_step_secs)
    }
}
