//! Shared application state for the dashboard API.
//!
//! [`AppState`] holds the controller handle every handler talks to, the
//! broadcast channel that feeds `WebSocket` clients, and the history query
//! settings.

use std::sync::Arc;

use tokio::sync::broadcast;
use voltdash_core::config::HistorySection;
use voltdash_core::control::LoopControl;
use voltdash_core::controller::ControllerHandle;
use voltdash_types::VehicleStatus;

/// Capacity of the status broadcast channel.
///
/// A subscriber more than this many statuses behind receives
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest.
const BROADCAST_CAPACITY: usize = 256;

/// Shared state for the Axum application, injected via `State`.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the vehicle controller.
    pub controller: ControllerHandle,
    /// Broadcast sender for committed statuses.
    pub tx: broadcast::Sender<VehicleStatus>,
    /// Stop signal shared with the tick loop; open `WebSocket`s close on it.
    pub control: Arc<LoopControl>,
    /// History limit and timestamp defaults.
    pub history: HistorySection,
}

impl AppState {
    /// Create application state around a running controller.
    pub fn new(
        controller: ControllerHandle,
        control: Arc<LoopControl>,
        history: HistorySection,
    ) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            controller,
            tx,
            control,
            history,
        }
    }

    /// Subscribe to committed statuses.
    pub fn subscribe(&self) -> broadcast::Receiver<VehicleStatus> {
        self.tx.subscribe()
    }

    /// Publish a committed status to all connected clients.
    ///
    /// Returns the number of receivers, 0 when nobody is connected.
    pub fn broadcast(&self, status: &VehicleStatus) -> usize {
        // send fails only when there are no receivers.
        self.tx.send(status.clone()).unwrap_or(0)
    }
}
