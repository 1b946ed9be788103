//! Background trailing-silence duration refinement
//!
//! Single-slot and latest-wins: every `refine` cancels the task before it.
//! Results carry the generation they were started under, so the control
//! thread can drop anything that raced past cancellation.

use crate::types::SilenceTrimConfig;
use cadence_core::{SignalExtent, SilenceScanner, Track, TrackId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// A corrected duration for one track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refinement {
    /// Track the scan ran for
    pub track_id: TrackId,

    /// Refiner generation at scan start
    pub generation: u64,

    /// Corrected duration
    pub duration: Duration,
}

/// Where finished refinements go (posted onto the control thread)
pub type RefinementSink = Arc<dyn Fn(Refinement) + Send + Sync>;

/// Compute the corrected duration for a scanned signal
///
/// Returns `None` unless the trailing silence is strictly longer than the
/// configured minimum. Entirely silent audio is never trimmed.
pub fn corrected_duration(extent: SignalExtent, trim: &SilenceTrimConfig) -> Option<Duration> {
    let last_audible = extent.last_audible?;
    let trailing = extent.total.saturating_sub(last_audible);
    if trailing <= trim.min_trailing() {
        return None;
    }
    Some(extent.total - trailing + trim.reflection())
}

/// Single-slot cancellable duration refinement
pub struct DurationRefiner {
    scanner: Arc<dyn SilenceScanner>,
    trim: SilenceTrimConfig,
    deliver: RefinementSink,
    generation: u64,
    in_flight: Option<Arc<AtomicBool>>,
}

impl DurationRefiner {
    /// Create an idle refiner
    pub fn new(scanner: Arc<dyn SilenceScanner>, trim: SilenceTrimConfig, deliver: RefinementSink) -> Self {
        Self {
            scanner,
            trim,
            deliver,
            generation: 0,
            in_flight: None,
        }
    }

    /// Start refining `track`, cancelling whatever was in flight
    pub fn refine(&mut self, track: &Track) {
        self.cancel();

        let Some(locator) = track.locator.clone() else {
            debug!(track_id = %track.id, "No locator, skipping duration refinement");
            return;
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let scanner = Arc::clone(&self.scanner);
        let deliver = Arc::clone(&self.deliver);
        let trim = self.trim;
        let generation = self.generation;
        let track_id = track.id;

        let spawned = thread::Builder::new()
            .name("cadence-refine".to_string())
            .spawn(move || {
                let extent = match scanner.scan(&locator, &flag) {
                    Ok(Some(extent)) => extent,
                    Ok(None) => {
                        debug!(%track_id, "Duration scan cancelled");
                        return;
                    }
                    Err(e) => {
                        debug!(%track_id, error = %e, "Duration scan failed, keeping nominal duration");
                        return;
                    }
                };

                let Some(duration) = corrected_duration(extent, &trim) else {
                    debug!(%track_id, total_ms = extent.total.as_millis() as u64, "No trailing silence to trim");
                    return;
                };

                if flag.load(Ordering::Acquire) {
                    return;
                }
                deliver(Refinement {
                    track_id,
                    generation,
                    duration,
                });
            });

        match spawned {
            Ok(_) => self.in_flight = Some(cancelled),
            Err(e) => warn!(error = %e, "Failed to spawn duration refinement"),
        }
    }

    /// Cancel the in-flight task, if any
    ///
    /// Also invalidates any result already delivered but not yet applied.
    pub fn cancel(&mut self) {
        if let Some(flag) = self.in_flight.take() {
            flag.store(true, Ordering::Release);
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Whether `refinement` belongs to the latest `refine` call
    pub fn is_current(&self, refinement: &Refinement) -> bool {
        refinement.generation == self.generation
    }
}

impl Drop for DurationRefiner {
    fn drop(&mut self) {
        self.cancel();
    }
}
