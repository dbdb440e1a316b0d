//! Tick callback that pushes committed statuses to `WebSocket` clients.

use std::sync::Arc;

use tracing::debug;
use voltdash_api::AppState;
use voltdash_core::runner::TickCallback;
use voltdash_types::VehicleStatus;

/// Bridges the tick loop to the dashboard API broadcast channel.
pub struct BroadcastCallback {
    state: Arc<AppState>,
}

impl BroadcastCallback {
    /// Create a callback publishing through `state`.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl TickCallback for BroadcastCallback {
    fn on_tick(&mut self, status: &VehicleStatus) {
        let receivers = self.state.broadcast(status);
        debug!(
            receivers,
            percentage = status.battery.percentage,
            "Status broadcast sent"
        );
    }
}
