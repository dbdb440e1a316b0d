//! Shared control state for the tick loop.
//!
//! [`LoopControl`] is wrapped in [`Arc`](std::sync::Arc) and shared between
//! the tick loop and whoever decides when it should stop (the server's
//! shutdown signal handler). The stop flag is atomic so the loop can check
//! it without locking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Smallest accepted tick interval in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Stop signal and tick interval for the simulation loop.
#[derive(Debug)]
pub struct LoopControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes tasks waiting in [`LoopControl::stopped`].
    stop_notify: Notify,

    /// Tick interval in milliseconds.
    tick_interval_ms: u64,
}

impl LoopControl {
    /// Create control state with the given tick interval.
    ///
    /// Intervals below [`MIN_TICK_INTERVAL_MS`] are raised to the minimum.
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            tick_interval_ms: tick_interval_ms.max(MIN_TICK_INTERVAL_MS),
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request the loop to stop at its next boundary.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait until a stop is requested. Returns immediately if it already was.
    pub async fn stopped(&self) {
        loop {
            // Register before checking the flag so a concurrent
            // `request_stop` cannot slip between the two.
            let notified = self.stop_notify.notified();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }

    // -----------------------------------------------------------------------
    // Tick interval
    // -----------------------------------------------------------------------

    /// Tick interval in milliseconds.
    pub const fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn initial_state_is_running() {
        let control = LoopControl::new(1000);
        assert!(!control.is_stop_requested());
        assert_eq!(control.tick_interval_ms(), 1000);
    }

    #[test]
    fn interval_is_clamped_to_minimum() {
        let control = LoopControl::new(10);
        assert_eq!(control.tick_interval_ms(), MIN_TICK_INTERVAL_MS);
        assert_eq!(control.tick_interval(), Duration::from_millis(MIN_TICK_INTERVAL_MS));
    }

    #[tokio::test]
    async fn stopped_returns_after_request() {
        let control = Arc::new(LoopControl::new(1000));
        let waiter = {
            let control = Arc::clone(&control);
            tokio::spawn(async move { control.stopped().await })
        };

        control.request_stop();
        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn stopped_returns_immediately_when_already_stopped() {
        let control = LoopControl::new(1000);
        control.request_stop();
        control.stopped().await;
    }
}
