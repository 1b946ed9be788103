//! Cancellable repeating timer on a dedicated thread

use crossbeam_channel::{bounded, select, tick, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{trace, warn};

/// A repeating timer
///
/// Fires `on_fire` once per period until cancelled or until the callback
/// returns `false`. Cancelling joins the thread, so no fire happens after
/// [`RepeatingTimer::cancel`] returns.
pub struct RepeatingTimer {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTimer {
    /// Start a timer
    ///
    /// Returns `None` if the OS refused to spawn the timer thread.
    pub fn start<F>(name: &str, period: Duration, mut on_fire: F) -> Option<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let ticker = tick(period);

        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || loop {
            select! {
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    if !on_fire() {
                        break;
                    }
                }
            }
        });

        match spawned {
            Ok(handle) => {
                trace!(timer = name, period_ms = period.as_millis() as u64, "Timer started");
                Some(Self {
                    name: name.to_string(),
                    stop_tx: Some(stop_tx),
                    handle: Some(handle),
                })
            }
            Err(e) => {
                warn!(timer = name, error = %e, "Failed to spawn timer thread");
                None
            }
        }
    }

    /// Stop the timer and wait for its thread to exit
    pub fn cancel(&mut self) {
        // Dropping the sender disconnects stop_rx, which wakes the select
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!(timer = %self.name, "Timer thread panicked");
            }
            trace!(timer = %self.name, "Timer stopped");
        }
    }

    /// Whether the timer thread is still alive
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
