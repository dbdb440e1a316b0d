//! The periodic tick loop.
//!
//! [`run_simulation`] asks the [`controller`](crate::controller) for one tick,
//! hands the committed status to a [`TickCallback`], then sleeps for the
//! interval held in [`LoopControl`]. The loop runs until a stop is requested
//! or the controller goes away.
//!
//! A failed tick is logged and skipped. A store outage therefore pauses the
//! simulation instead of ending it, and the next tick retries.

use tracing::{debug, info, warn};
use voltdash_types::VehicleStatus;

use crate::control::LoopControl;
use crate::controller::{ControllerError, ControllerHandle, TickOutcome};

/// Errors that end the tick loop.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The controller task stopped while the loop was running.
    #[error("vehicle controller stopped unexpectedly")]
    ControllerClosed,
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks attempted.
    pub total_ticks: u64,
    /// Ticks that committed a new status.
    pub committed_ticks: u64,
    /// Ticks skipped because no status record existed.
    pub skipped_ticks: u64,
    /// Ticks that failed with a store error.
    pub failed_ticks: u64,
}

/// Callback invoked after each committed tick.
///
/// The server uses this to push the new status to live dashboard clients.
pub trait TickCallback: Send {
    /// Called with the status as committed by the tick.
    fn on_tick(&mut self, status: &VehicleStatus);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _status: &VehicleStatus) {}
}

/// Run the tick loop until `control` requests a stop.
///
/// A stop requested during the sleep takes effect immediately; one requested
/// during a tick takes effect once that tick has committed.
///
/// # Errors
///
/// Returns [`RunnerError::ControllerClosed`] if the controller task is gone.
pub async fn run_simulation(
    controller: &ControllerHandle,
    control: &LoopControl,
    callback: &mut dyn TickCallback,
) -> Result<RunSummary, RunnerError> {
    let mut summary = RunSummary::default();

    info!(
        tick_interval_ms = control.tick_interval_ms(),
        "Simulation starting"
    );

    loop {
        if control.is_stop_requested() {
            info!("Stop requested");
            return Ok(summary);
        }

        summary.total_ticks = summary.total_ticks.saturating_add(1);
        match controller.tick().await {
            Ok(TickOutcome::Committed { status, .. }) => {
                summary.committed_ticks = summary.committed_ticks.saturating_add(1);
                callback.on_tick(&status);
            }
            Ok(TickOutcome::Skipped) => {
                summary.skipped_ticks = summary.skipped_ticks.saturating_add(1);
                debug!("Tick skipped, no vehicle status");
            }
            Err(ControllerError::Closed) => return Err(RunnerError::ControllerClosed),
            Err(e) => {
                summary.failed_ticks = summary.failed_ticks.saturating_add(1);
                warn!(error = %e, "Tick failed, retrying next interval");
            }
        }

        tokio::select! {
            () = control.stopped() => {}
            () = tokio::time::sleep(control.tick_interval()) => {}
        }
    }
}

/// Log how the loop ended.
pub fn log_simulation_end(result: &Result<RunSummary, RunnerError>) {
    match result {
        Ok(summary) => {
            info!(
                total_ticks = summary.total_ticks,
                committed_ticks = summary.committed_ticks,
                skipped_ticks = summary.skipped_ticks,
                failed_ticks = summary.failed_ticks,
                "Simulation ended"
            );
            if summary.committed_ticks == 0 {
                warn!("Simulation ended with no committed ticks");
            }
        }
        Err(e) => warn!(error = %e, "Simulation ended abnormally"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::controller::{ControllerConfig, spawn_controller};
    use crate::store::InMemoryStore;

    /// Counts ticks and requests a stop after `stop_after`.
    struct StopAfter {
        control: Arc<LoopControl>,
        stop_after: usize,
        seen: Vec<VehicleStatus>,
    }

    impl TickCallback for StopAfter {
        fn on_tick(&mut self, status: &VehicleStatus) {
            self.seen.push(status.clone());
            if self.seen.len() >= self.stop_after {
                self.control.request_stop();
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_until_stop_is_requested() {
        let store = InMemoryStore::new();
        let (handle, _task) = spawn_controller(store.clone(), ControllerConfig::default());
        handle.initialize().await.unwrap();
        handle.set_rpm(800.0).await.unwrap();

        let control = Arc::new(LoopControl::new(1000));
        let mut callback = StopAfter {
            control: Arc::clone(&control),
            stop_after: 3,
            seen: Vec::new(),
        };

        let summary = run_simulation(&handle, &control, &mut callback)
            .await
            .unwrap();

        assert_eq!(summary.total_ticks, 3);
        assert_eq!(summary.committed_ticks, 3);
        assert_eq!(store.history_len().await, 3);

        let last = callback.seen.last().unwrap();
        assert!((last.battery.percentage - 99.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stop_before_start_runs_nothing() {
        let (handle, _task) = spawn_controller(InMemoryStore::new(), ControllerConfig::default());
        let control = LoopControl::new(1000);
        control.request_stop();

        let summary = run_simulation(&handle, &control, &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_record_skips_ticks() {
        let (handle, _task) = spawn_controller(InMemoryStore::new(), ControllerConfig::default());
        let control = Arc::new(LoopControl::new(1000));

        let stopper = {
            let control = Arc::clone(&control);
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
                control.request_stop();
            })
        };

        let summary = run_simulation(&handle, &control, &mut NoOpCallback)
            .await
            .unwrap();
        stopper.await.unwrap();

        assert_eq!(summary.committed_ticks, 0);
        assert_eq!(summary.skipped_ticks, summary.total_ticks);
        assert_eq!(summary.total_ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn store_outage_does_not_end_the_loop() {
        let store = InMemoryStore::new();
        let (handle, _task) = spawn_controller(store.clone(), ControllerConfig::default());
        handle.initialize().await.unwrap();
        store.set_unavailable(true);

        let control = Arc::new(LoopControl::new(1000));
        let stopper = {
            let control = Arc::clone(&control);
            let store = store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
                store.set_unavailable(false);
                tokio::time::sleep(std::time::Duration::from_millis(1000)).await;
                control.request_stop();
            })
        };

        let summary = run_simulation(&handle, &control, &mut NoOpCallback)
            .await
            .unwrap();
        stopper.await.unwrap();

        assert_eq!(summary.failed_ticks, 2);
        assert_eq!(summary.committed_ticks, 1);
    }

    #[tokio::test]
    async fn closed_controller_ends_the_loop() {
        let (handle, task) = spawn_controller(InMemoryStore::new(), ControllerConfig::default());
        task.abort();
        let _ = task.await;

        let control = LoopControl::new(1000);
        let result = run_simulation(&handle, &control, &mut NoOpCallback).await;
        assert!(matches!(result, Err(RunnerError::ControllerClosed)));
    }
}
