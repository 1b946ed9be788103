//! Seek-repeat timer for held fast-forward/rewind

use crate::timer::RepeatingTimer;
use crate::types::SeekDirection;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Step callback; returning `false` ends seeking (consumer gone)
pub type StepCallback = Arc<dyn Fn(SeekDirection) -> bool + Send + Sync>;

/// Emits one seek step per period while a seek button is held
///
/// Only one direction is active at a time. Clamping the resulting position
/// is the consumer's job.
pub struct Seeker {
    period: Duration,
    on_step: StepCallback,
    active: Option<(SeekDirection, RepeatingTimer)>,
}

impl Seeker {
    /// Create an idle seeker
    pub fn new(period: Duration, on_step: StepCallback) -> Self {
        Self {
            period,
            on_step,
            active: None,
        }
    }

    /// Start stepping in `direction`, replacing any active direction
    pub fn start_seeking(&mut self, direction: SeekDirection) {
        self.stop_seeking();

        let on_step = Arc::clone(&self.on_step);
        if let Some(timer) =
            RepeatingTimer::start("cadence-seek", self.period, move || on_step(direction))
        {
            debug!(?direction, "Seeking");
            self.active = Some((direction, timer));
        }
    }

    /// Stop stepping
    pub fn stop_seeking(&mut self) {
        if let Some((direction, mut timer)) = self.active.take() {
            timer.cancel();
            debug!(?direction, "Seeking stopped");
        }
    }

    /// Active direction, if seeking
    pub fn direction(&self) -> Option<SeekDirection> {
        self.active.as_ref().map(|(direction, _)| *direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    fn recording_seeker() -> (Seeker, Arc<Mutex<Vec<SeekDirection>>>) {
        let steps = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&steps);
        let seeker = Seeker::new(
            Duration::from_millis(5),
            Arc::new(move |direction| {
                sink.lock().unwrap().push(direction);
                true
            }),
        );
        (seeker, steps)
    }

    #[test]
    fn emits_steps_in_active_direction() {
        let (mut seeker, steps) = recording_seeker();
        seeker.start_seeking(SeekDirection::Backward);
        assert_eq!(seeker.direction(), Some(SeekDirection::Backward));

        thread::sleep(Duration::from_millis(40));
        seeker.stop_seeking();
        assert_eq!(seeker.direction(), None);

        let steps = steps.lock().unwrap();
        assert!(!steps.is_empty());
        assert!(steps.iter().all(|d| *d == SeekDirection::Backward));
    }

    #[test]
    fn new_direction_replaces_old() {
        let (mut seeker, steps) = recording_seeker();
        seeker.start_seeking(SeekDirection::Forward);
        thread::sleep(Duration::from_millis(20));
        seeker.start_seeking(SeekDirection::Backward);
        let switch_at = steps.lock().unwrap().len();
        thread::sleep(Duration::from_millis(30));
        seeker.stop_seeking();

        let steps = steps.lock().unwrap();
        assert!(steps.len() > switch_at);
        assert!(steps[switch_at..].iter().all(|d| *d == SeekDirection::Backward));
    }
}
