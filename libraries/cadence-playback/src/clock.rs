//! Periodic time-display clock

use crate::timer::RepeatingTimer;
use std::sync::Arc;
use std::time::Duration;

/// Tick callback; returning `false` ends the clock (consumer gone)
pub type TickCallback = Arc<dyn Fn() -> bool + Send + Sync>;

/// Repeating tick source driving "current time" reports
///
/// Holds no playback knowledge. Starting a running clock restarts it, so
/// there is never more than one tick stream.
pub struct Clock {
    period: Duration,
    on_tick: TickCallback,
    timer: Option<RepeatingTimer>,
}

impl Clock {
    /// Create a stopped clock
    pub fn new(period: Duration, on_tick: TickCallback) -> Self {
        Self {
            period,
            on_tick,
            timer: None,
        }
    }

    /// Start ticking (restarting if already running)
    pub fn start(&mut self) {
        self.stop();
        let on_tick = Arc::clone(&self.on_tick);
        self.timer = RepeatingTimer::start("cadence-clock", self.period, move || on_tick());
    }

    /// Stop ticking
    pub fn stop(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Whether the clock is running
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }
}
