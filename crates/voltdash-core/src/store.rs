//! Storage collaborator for the current-status record and its history.
//!
//! The [`VehicleStore`] trait abstracts where the record lives. The server
//! binary implements it over Dragonfly (current status) and `PostgreSQL`
//! (history); [`InMemoryStore`] backs tests and local runs without
//! infrastructure.
//!
//! Implementations do not need to make [`VehicleStore::update_current_status`]
//! atomic against other writers: all writes go through the single
//! [`controller`](crate::controller) task.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use voltdash_types::{HistoryRecord, StatusPatch, VehicleStatus};

/// Errors surfaced by a [`VehicleStore`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document could not be decoded.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// A partial update targeted a record that does not exist.
    #[error("current status record does not exist")]
    MissingRecord,
}

/// Access to the current-status record and the append-only history log.
pub trait VehicleStore: Send + Sync + 'static {
    /// Read the current status, or `None` if it was never created.
    fn get_current_status(
        &self,
    ) -> impl Future<Output = Result<Option<VehicleStatus>, StoreError>> + Send;

    /// Apply `patch` to the stored record.
    ///
    /// Returns [`StoreError::MissingRecord`] if no record exists.
    fn update_current_status(
        &self,
        patch: &StatusPatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace the stored record. Used for first-time initialization.
    fn set_current_status(
        &self,
        status: &VehicleStatus,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Append one history snapshot.
    fn append_history(
        &self,
        record: &HistoryRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Return up to `limit` snapshots, newest first.
    fn query_history(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>, StoreError>> + Send;

    /// Delete all but the newest `keep` snapshots. Returns the number removed.
    fn prune_history(&self, keep: usize) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct InMemoryInner {
    status: RwLock<Option<VehicleStatus>>,
    /// Oldest first.
    history: RwLock<Vec<HistoryRecord>>,
    unavailable: AtomicBool,
    history_unavailable: AtomicBool,
}

/// A [`VehicleStore`] held in process memory.
///
/// Clones share the same data. [`InMemoryStore::set_unavailable`] makes every
/// operation fail, which lets tests exercise outage handling.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryInner>,
}

impl InMemoryStore {
    /// Create an empty store with no status record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `status`.
    pub fn with_status(status: VehicleStatus) -> Self {
        let inner = InMemoryInner {
            status: RwLock::new(Some(status)),
            ..InMemoryInner::default()
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Simulate an outage: while set, every operation returns
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::Release);
    }

    /// Make only [`VehicleStore::append_history`] fail while set. The
    /// current-status record stays writable.
    pub fn set_history_unavailable(&self, unavailable: bool) {
        self.inner
            .history_unavailable
            .store(unavailable, Ordering::Release);
    }

    /// Number of history snapshots currently held.
    pub async fn history_len(&self) -> usize {
        self.inner.history.read().await.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::Acquire) {
            Err(StoreError::Unavailable("in-memory store marked unavailable".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl VehicleStore for InMemoryStore {
    async fn get_current_status(&self) -> Result<Option<VehicleStatus>, StoreError> {
        self.check_available()?;
        Ok(self.inner.status.read().await.clone())
    }

    async fn update_current_status(&self, patch: &StatusPatch) -> Result<(), StoreError> {
        self.check_available()?;
        let mut guard = self.inner.status.write().await;
        let status = guard.as_mut().ok_or(StoreError::MissingRecord)?;
        patch.apply_to(status);
        Ok(())
    }

    async fn set_current_status(&self, status: &VehicleStatus) -> Result<(), StoreError> {
        self.check_available()?;
        *self.inner.status.write().await = Some(status.clone());
        Ok(())
    }

    async fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        self.check_available()?;
        if self.inner.history_unavailable.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("history table unavailable".to_owned()));
        }
        self.inner.history.write().await.push(record.clone());
        Ok(())
    }

    async fn query_history(&self, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        self.check_available()?;
        let history = self.inner.history.read().await;
        Ok(history.iter().rev().take(limit).cloned().collect())
    }

    async fn prune_history(&self, keep: usize) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut history = self.inner.history.write().await;
        let excess = history.len().saturating_sub(keep);
        history.drain(..excess);
        Ok(u64::try_from(excess).unwrap_or(u64::MAX))
    }
}
