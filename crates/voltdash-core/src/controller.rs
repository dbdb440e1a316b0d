//! The vehicle controller: the single owner of every status mutation.
//!
//! Ticks and dashboard commands both perform read-modify-write cycles on the
//! same record. Instead of locking, every cycle is sent as a message to one
//! [`VehicleController`] task that processes them strictly in order. A
//! command is validated against exactly the snapshot it commits on, and a
//! tick can never interleave with a command.
//!
//! # Architecture
//!
//! ```text
//! HTTP handlers --+
//!                 +--> ControllerHandle --(mpsc)--> VehicleController --> VehicleStore
//! tick loop ------+            ^                            |
//!                              +---------(oneshot)----------+
//! ```
//!
//! Reads go through the same queue, so callers only ever observe committed
//! states. The task ends when every [`ControllerHandle`] has been dropped.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use voltdash_types::{HistoryRecord, StatusPatch, VehicleStatus};

use crate::commands::{self, CommandError};
use crate::physics;
use crate::store::{StoreError, VehicleStore};

/// Default capacity of the controller's request queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Errors returned to callers of a [`ControllerHandle`].
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The command was rejected; nothing was written.
    #[error(transparent)]
    Rejected(#[from] CommandError),

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The current-status record has not been created yet.
    #[error("vehicle status has not been initialized")]
    NotInitialized,

    /// The controller task has stopped.
    #[error("vehicle controller is not running")]
    Closed,
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No status record exists; nothing was written.
    Skipped,
    /// The tick committed.
    Committed {
        /// The record as read back after the write.
        status: VehicleStatus,
        /// Whether a history snapshot was appended.
        history_recorded: bool,
    },
}

impl TickOutcome {
    /// The committed status, if the tick committed.
    pub const fn status(&self) -> Option<&VehicleStatus> {
        match self {
            Self::Skipped => None,
            Self::Committed { status, .. } => Some(status),
        }
    }
}

/// What startup initialization did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// No record existed; the first-boot defaults were written.
    Created,
    /// A record existed; driving and charging were reset.
    Reset,
}

/// Tunables for the controller task.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Capacity of the request queue.
    pub queue_capacity: usize,
    /// Whether committed ticks append history snapshots.
    pub record_history: bool,
    /// Number of history snapshots to keep.
    pub retention_limit: usize,
    /// Prune history every N committed ticks (0 disables pruning).
    pub prune_interval_ticks: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            record_history: true,
            retention_limit: 86_400,
            prune_interval_ticks: 60,
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, ControllerError>>;

/// Messages accepted by the controller task.
#[derive(Debug)]
enum Request {
    Initialize { reply: Reply<InitOutcome> },
    Status { reply: Reply<Option<VehicleStatus>> },
    Tick { reply: Reply<TickOutcome> },
    SetRpm { rpm: f64, reply: Reply<f64> },
    SetCharging { is_charging: bool, reply: Reply<bool> },
    SetParkingBrake { engaged: bool, reply: Reply<bool> },
    History { limit: usize, reply: Reply<Vec<HistoryRecord>> },
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable handle for sending requests to the controller task.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Request>,
}

impl ControllerHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, ControllerError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_err| ControllerError::Closed)?;
        response.await.map_err(|_err| ControllerError::Closed)?
    }

    /// Create the record with first-boot defaults, or reset driving and
    /// charging on an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the store fails.
    pub async fn initialize(&self) -> Result<InitOutcome, ControllerError> {
        self.request(|reply| Request::Initialize { reply }).await
    }

    /// Read the current status. `None` if it was never created.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the store fails.
    pub async fn status(&self) -> Result<Option<VehicleStatus>, ControllerError> {
        self.request(|reply| Request::Status { reply }).await
    }

    /// Advance the simulation by one tick.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the store fails.
    pub async fn tick(&self) -> Result<TickOutcome, ControllerError> {
        self.request(|reply| Request::Tick { reply }).await
    }

    /// Set the motor speed. Returns the accepted RPM.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::Rejected`] while charging or for a negative RPM.
    /// - [`ControllerError::NotInitialized`] if no record exists.
    /// - [`ControllerError::Store`] if the store fails.
    pub async fn set_rpm(&self, rpm: f64) -> Result<f64, ControllerError> {
        self.request(|reply| Request::SetRpm { rpm, reply }).await
    }

    /// Set the charging flag, stopping the motor. Returns the new flag.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::NotInitialized`] if no record exists.
    /// - [`ControllerError::Store`] if the store fails.
    pub async fn set_charging(&self, is_charging: bool) -> Result<bool, ControllerError> {
        self.request(|reply| Request::SetCharging { is_charging, reply })
            .await
    }

    /// Engage or release the parking brake. Returns the new state.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::NotInitialized`] if no record exists.
    /// - [`ControllerError::Store`] if the store fails.
    pub async fn set_parking_brake(&self, engaged: bool) -> Result<bool, ControllerError> {
        self.request(|reply| Request::SetParkingBrake { engaged, reply })
            .await
    }

    /// Return up to `limit` history snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the store fails.
    pub async fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>, ControllerError> {
        self.request(|reply| Request::History { limit, reply }).await
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// The task that owns the store and applies requests one at a time.
pub struct VehicleController<S> {
    store: S,
    config: ControllerConfig,
    committed_ticks: u64,
}

/// Spawn the controller task on the current Tokio runtime.
///
/// Returns the handle used to talk to it and the task's [`JoinHandle`]. The
/// task exits once every handle has been dropped.
pub fn spawn_controller<S: VehicleStore>(
    store: S,
    config: ControllerConfig,
) -> (ControllerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    let controller = VehicleController {
        store,
        config,
        committed_ticks: 0,
    };
    let task = tokio::spawn(controller.run(rx));
    (ControllerHandle { tx }, task)
}

impl<S: VehicleStore> VehicleController<S> {
    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        debug!("Vehicle controller started");
        while let Some(request) = rx.recv().await {
            self.dispatch(request).await;
        }
        info!(
            committed_ticks = self.committed_ticks,
            "Vehicle controller stopped"
        );
    }

    async fn dispatch(&mut self, request: Request) {
        // A send fails only if the caller gave up waiting; the work is
        // already committed either way.
        match request {
            Request::Initialize { reply } => {
                let _ = reply.send(self.initialize().await);
            }
            Request::Status { reply } => {
                let _ = reply.send(self.status().await);
            }
            Request::Tick { reply } => {
                let _ = reply.send(self.tick().await);
            }
            Request::SetRpm { rpm, reply } => {
                let _ = reply.send(self.set_rpm(rpm).await);
            }
            Request::SetCharging { is_charging, reply } => {
                let _ = reply.send(self.set_charging(is_charging).await);
            }
            Request::SetParkingBrake { engaged, reply } => {
                let _ = reply.send(self.set_parking_brake(engaged).await);
            }
            Request::History { limit, reply } => {
                let _ = reply.send(self.history(limit).await);
            }
        }
    }

    async fn initialize(&self) -> Result<InitOutcome, ControllerError> {
        if self.store.get_current_status().await?.is_some() {
            self.store
                .update_current_status(&commands::startup_reset())
                .await?;
            info!("Existing vehicle status found, driving and charging reset");
            Ok(InitOutcome::Reset)
        } else {
            let mut status = VehicleStatus::initial();
            status.refresh_derived();
            self.store.set_current_status(&status).await?;
            info!("Vehicle status created with first-boot defaults");
            Ok(InitOutcome::Created)
        }
    }

    async fn status(&self) -> Result<Option<VehicleStatus>, ControllerError> {
        Ok(self.store.get_current_status().await?)
    }

    async fn current(&self) -> Result<VehicleStatus, ControllerError> {
        self.store
            .get_current_status()
            .await?
            .ok_or(ControllerError::NotInitialized)
    }

    async fn commit(&self, patch: &StatusPatch) -> Result<(), ControllerError> {
        self.store.update_current_status(patch).await?;
        Ok(())
    }

    async fn tick(&mut self) -> Result<TickOutcome, ControllerError> {
        let Some(current) = self.store.get_current_status().await? else {
            debug!("No vehicle status yet, tick skipped");
            return Ok(TickOutcome::Skipped);
        };

        self.commit(&physics::tick_patch(&current)).await?;

        // Read back so the snapshot reflects what the store actually holds.
        let committed = self.current().await?;
        self.committed_ticks = self.committed_ticks.saturating_add(1);

        // The status is already committed; a lost snapshot must not turn
        // the tick into a failure.
        let history_recorded =
            self.config.record_history && self.record_history(&committed).await;

        debug!(
            tick = self.committed_ticks,
            rpm = committed.motor.rpm,
            percentage = committed.battery.percentage,
            temperature = committed.battery.temperature,
            "Tick committed"
        );

        Ok(TickOutcome::Committed {
            status: committed,
            history_recorded,
        })
    }

    async fn record_history(&self, committed: &VehicleStatus) -> bool {
        let record = HistoryRecord::from_status(committed, Utc::now());
        if let Err(e) = self.store.append_history(&record).await {
            warn!(error = %e, "Failed to append history snapshot");
            return false;
        }
        self.prune_if_due().await;
        true
    }

    async fn prune_if_due(&self) {
        let due = self
            .committed_ticks
            .checked_rem(self.config.prune_interval_ticks)
            .is_some_and(|rem| rem == 0);
        if !due {
            return;
        }
        match self.store.prune_history(self.config.retention_limit).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Pruned history snapshots"),
            Err(e) => warn!(error = %e, "History pruning failed"),
        }
    }

    async fn set_rpm(&self, rpm: f64) -> Result<f64, ControllerError> {
        let current = self.current().await?;
        let patch = commands::set_rpm(&current, rpm).inspect_err(|e| {
            info!(rpm, reason = %e, "RPM change rejected");
        })?;
        self.commit(&patch).await?;
        info!(rpm, "RPM updated");
        Ok(rpm)
    }

    async fn set_charging(&self, is_charging: bool) -> Result<bool, ControllerError> {
        // Read first so a missing record is reported rather than created.
        self.current().await?;
        self.commit(&commands::set_charging(is_charging)).await?;
        info!(is_charging, "Charging state updated");
        Ok(is_charging)
    }

    async fn set_parking_brake(&self, engaged: bool) -> Result<bool, ControllerError> {
        self.current().await?;
        self.commit(&commands::set_parking_brake(engaged)).await?;
        info!(engaged, "Parking brake updated");
        Ok(engaged)
    }

    async fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>, ControllerError> {
        Ok(self.store.query_history(limit).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn spawn_with(store: &InMemoryStore, config: ControllerConfig) -> ControllerHandle {
        spawn_controller(store.clone(), config).0
    }

    async fn initialized() -> (InMemoryStore, ControllerHandle) {
        let store = InMemoryStore::new();
        let handle = spawn_with(&store, ControllerConfig::default());
        assert_eq!(handle.initialize().await.unwrap(), InitOutcome::Created);
        (store, handle)
    }

    #[tokio::test]
    async fn initialize_resets_existing_record() {
        let mut status = VehicleStatus::initial();
        status.battery.is_charging = true;
        status.battery.percentage = 55.0;
        let store = InMemoryStore::with_status(status);
        let handle = spawn_with(&store, ControllerConfig::default());

        assert_eq!(handle.initialize().await.unwrap(), InitOutcome::Reset);
        let status = handle.status().await.unwrap().unwrap();
        assert!(!status.battery.is_charging);
        assert!(close(status.battery.percentage, 55.0));
    }

    #[tokio::test]
    async fn tick_without_record_is_skipped() {
        let store = InMemoryStore::new();
        let handle = spawn_with(&store, ControllerConfig::default());

        assert_eq!(handle.tick().await.unwrap(), TickOutcome::Skipped);
        assert_eq!(store.history_len().await, 0);
    }

    #[tokio::test]
    async fn set_rpm_then_read_is_consistent() {
        let (_store, handle) = initialized().await;

        assert!(close(handle.set_rpm(500.0).await.unwrap(), 500.0));
        let status = handle.status().await.unwrap().unwrap();
        assert!(close(status.motor.rpm, 500.0));
        assert!(close(status.motor.power_consumption, 625.0));
        assert!(status.motor.is_active);
    }

    #[tokio::test]
    async fn drive_then_tick_scenario() {
        let (store, handle) = initialized().await;
        handle.set_rpm(800.0).await.unwrap();

        let outcome = handle.tick().await.unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Committed {
                history_recorded: true,
                ..
            }
        ));
        let status = outcome.status().unwrap();
        assert!(close(status.battery.percentage, 99.9));
        assert!(close(status.battery.temperature, 25.08));
        assert!(close(status.motor.power_consumption, 1000.0));
        assert_eq!(store.history_len().await, 1);

        let history = handle.history(10).await.unwrap();
        assert!(close(history.first().unwrap().rpm, 800.0));
    }

    #[tokio::test]
    async fn charging_blocks_rpm_until_released() {
        let (_store, handle) = initialized().await;
        handle.set_rpm(800.0).await.unwrap();

        assert!(handle.set_charging(true).await.unwrap());
        let status = handle.status().await.unwrap().unwrap();
        assert!(close(status.motor.rpm, 0.0));
        assert!(status.battery.is_charging);

        let rejected = handle.set_rpm(100.0).await;
        assert!(matches!(
            rejected,
            Err(ControllerError::Rejected(CommandError::ChargingConflict))
        ));
        let unchanged = handle.status().await.unwrap().unwrap();
        assert_eq!(unchanged, status);

        handle.set_charging(false).await.unwrap();
        assert!(close(handle.set_rpm(100.0).await.unwrap(), 100.0));
    }

    #[tokio::test]
    async fn commands_require_a_record() {
        let store = InMemoryStore::new();
        let handle = spawn_with(&store, ControllerConfig::default());

        assert!(matches!(
            handle.set_rpm(100.0).await,
            Err(ControllerError::NotInitialized)
        ));
        assert!(matches!(
            handle.set_charging(true).await,
            Err(ControllerError::NotInitialized)
        ));
        assert!(store.get_current_status().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_outage_is_reported_and_recovers() {
        let (store, handle) = initialized().await;
        store.set_unavailable(true);
        assert!(matches!(
            handle.tick().await,
            Err(ControllerError::Store(StoreError::Unavailable(_)))
        ));

        store.set_unavailable(false);
        assert!(matches!(
            handle.tick().await,
            Ok(TickOutcome::Committed { .. })
        ));
    }

    #[tokio::test]
    async fn history_failure_still_commits_the_tick() {
        let (store, handle) = initialized().await;
        handle.set_rpm(800.0).await.unwrap();
        store.set_history_unavailable(true);

        let outcome = handle.tick().await.unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Committed {
                history_recorded: false,
                ..
            }
        ));
        assert!(close(outcome.status().unwrap().battery.percentage, 99.9));
        assert_eq!(store.history_len().await, 0);

        store.set_history_unavailable(false);
        let outcome = handle.tick().await.unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Committed {
                history_recorded: true,
                ..
            }
        ));
        assert_eq!(store.history_len().await, 1);
    }

    #[tokio::test]
    async fn history_can_be_disabled() {
        let store = InMemoryStore::new();
        let config = ControllerConfig {
            record_history: false,
            ..ControllerConfig::default()
        };
        let handle = spawn_with(&store, config);
        handle.initialize().await.unwrap();

        let outcome = handle.tick().await.unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Committed {
                history_recorded: false,
                ..
            }
        ));
        assert_eq!(store.history_len().await, 0);
    }

    #[tokio::test]
    async fn history_is_pruned_to_retention_limit() {
        let store = InMemoryStore::new();
        let config = ControllerConfig {
            retention_limit: 3,
            prune_interval_ticks: 2,
            ..ControllerConfig::default()
        };
        let handle = spawn_with(&store, config);
        handle.initialize().await.unwrap();

        for _ in 0..6 {
            handle.tick().await.unwrap();
        }
        assert_eq!(store.history_len().await, 3);
    }

    #[tokio::test]
    async fn invariants_hold_across_interleaved_requests() {
        let (_store, handle) = initialized().await;

        let mut tasks = Vec::new();
        for i in 0..20_u32 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                match i % 4 {
                    0 => {
                        let _ = handle.set_rpm(f64::from(i) * 40.0).await;
                    }
                    1 => {
                        let _ = handle.set_charging(i % 8 == 1).await;
                    }
                    _ => {
                        let _ = handle.tick().await;
                    }
                }
                handle.status().await.unwrap().unwrap()
            }));
        }

        for task in tasks {
            let status = task.await.unwrap();
            assert!(status.drive_charge_exclusive());
            assert!(status.derived_fields_consistent());
        }
    }

    #[tokio::test]
    async fn handle_reports_closed_after_task_ends() {
        let store = InMemoryStore::new();
        let (handle, task) = spawn_controller(store, ControllerConfig::default());
        task.abort();
        let _ = task.await;
        assert!(matches!(handle.status().await, Err(ControllerError::Closed)));
    }
}
