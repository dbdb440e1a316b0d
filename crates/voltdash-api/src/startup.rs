//! Background startup of the dashboard API.
//!
//! [`spawn_api`] binds the socket before returning, so a port conflict fails
//! process startup instead of surfacing later from a background task.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use voltdash_core::config::CorsSection;
use voltdash_core::control::LoopControl;

use crate::router::build_router;
use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the API server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the API socket and serve on a background task until `shutdown`
/// resolves.
///
/// The returned handle completes after in-flight requests have drained. If
/// serving fails, a stop is requested on the shared [`LoopControl`] so the
/// process does not keep ticking without an HTTP surface.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_api(
    config: &ServerConfig,
    cors: &CorsSection,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), ServerError>>, StartupError> {
    let listener = server::bind(config).await?;
    let control = Arc::clone(&state.control);
    let router = build_router(state, cors);

    let handle = tokio::spawn(async move {
        let result = server::serve(listener, router, shutdown).await;
        stop_on_failure(&result, &control);
        result
    });

    tracing::info!(port = config.port, "Dashboard API spawned on background task");
    Ok(handle)
}

/// Losing the API ends the process: request a stop if serving failed.
fn stop_on_failure(result: &Result<(), ServerError>, control: &LoopControl) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Dashboard API exited with error, stopping");
        control.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_failure_requests_stop() {
        let control = LoopControl::new(1000);
        stop_on_failure(&Err(ServerError::Serve("connection reset".to_owned())), &control);
        assert!(control.is_stop_requested());
    }

    #[test]
    fn clean_exit_leaves_control_alone() {
        let control = LoopControl::new(1000);
        stop_on_failure(&Ok(()), &control);
        assert!(!control.is_stop_requested());
    }
}
