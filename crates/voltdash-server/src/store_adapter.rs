//! [`VehicleStore`] implementation over Dragonfly and `PostgreSQL`.
//!
//! Bridges the core storage trait to the data layer: the current status
//! lives in Dragonfly, history rows in `PostgreSQL`. Data-layer errors are
//! folded into [`StoreError`] so the controller stays storage-agnostic.

use voltdash_core::store::{StoreError, VehicleStore};
use voltdash_db::{DbError, DragonflyPool, HistoryStore, PostgresPool};
use voltdash_types::{HistoryRecord, StatusPatch, VehicleStatus};

/// Production store: Dragonfly for the current status, `PostgreSQL` for
/// history.
#[derive(Clone)]
pub struct DashboardStore {
    dragonfly: DragonflyPool,
    postgres: PostgresPool,
}

impl DashboardStore {
    /// Combine connected pools into a store.
    pub const fn new(dragonfly: DragonflyPool, postgres: PostgresPool) -> Self {
        Self {
            dragonfly,
            postgres,
        }
    }

    fn history(&self) -> HistoryStore<'_> {
        HistoryStore::new(self.postgres.pool())
    }
}

/// Fold a data-layer error into the core store error.
fn to_store_error(err: DbError) -> StoreError {
    match err {
        DbError::KeyNotFound(_) => StoreError::MissingRecord,
        e if e.is_malformed() => StoreError::Malformed(e.to_string()),
        e => StoreError::Unavailable(e.to_string()),
    }
}

impl VehicleStore for DashboardStore {
    async fn get_current_status(&self) -> Result<Option<VehicleStatus>, StoreError> {
        self.dragonfly
            .get_current_status()
            .await
            .map_err(to_store_error)
    }

    async fn update_current_status(&self, patch: &StatusPatch) -> Result<(), StoreError> {
        self.dragonfly
            .update_current_status(patch)
            .await
            .map_err(to_store_error)
    }

    async fn set_current_status(&self, status: &VehicleStatus) -> Result<(), StoreError> {
        self.dragonfly
            .set_current_status(status)
            .await
            .map_err(to_store_error)
    }

    async fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        self.history().insert(record).await.map_err(to_store_error)
    }

    async fn query_history(&self, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        let rows = self.history().recent(limit).await.map_err(to_store_error)?;
        Ok(rows.into_iter().map(HistoryRecord::from).collect())
    }

    async fn prune_history(&self, keep: usize) -> Result<u64, StoreError> {
        self.history().prune(keep).await.map_err(to_store_error)
    }
}
