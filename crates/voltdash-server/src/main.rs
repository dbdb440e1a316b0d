//! VoltDash server binary.
//!
//! Wires the vehicle controller to Dragonfly and `PostgreSQL`, serves the
//! dashboard API, and runs the tick loop until the process is asked to stop.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `voltdash-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Resolve credentials (local file in development, environment otherwise)
//! 4. Connect to Dragonfly and `PostgreSQL`, run migrations
//! 5. Spawn the vehicle controller and initialize the status record
//! 6. Bind and spawn the dashboard API
//! 7. Run the tick loop until `SIGINT`/`SIGTERM` or the API fails
//! 8. Drain the API, stop the controller, close connections
//!
//! Any failure before step 7 aborts the process with an error.

mod broadcast_callback;
mod credentials;
mod error;
mod store_adapter;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voltdash_api::{AppState, ServerConfig};
use voltdash_core::config::{LoggingSection, VoltDashConfig};
use voltdash_core::control::LoopControl;
use voltdash_core::controller::spawn_controller;
use voltdash_core::runner;
use voltdash_db::{DragonflyPool, PostgresPool};

use crate::broadcast_callback::BroadcastCallback;
use crate::error::ServerBinError;
use crate::store_adapter::DashboardStore;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "voltdash-config.yaml";

/// How long to wait for the controller to drain its queue on shutdown.
const CONTROLLER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), ServerBinError> {
    // 1-2. Configuration, then logging at the configured level.
    let config = load_config()?;
    init_tracing(&config.logging);
    info!(
        port = config.server.port,
        tick_interval_ms = config.simulation.tick_interval_ms,
        environment = %config.infrastructure.environment,
        "voltdash-server starting"
    );

    // 3. Credentials.
    let creds = credentials::resolve(&config.infrastructure, |name| std::env::var(name).ok())?;

    // 4. Data stores.
    let dragonfly = DragonflyPool::connect(&creds.dragonfly_url).await?;
    let postgres = PostgresPool::connect_url(&creds.postgres_url).await?;
    postgres.run_migrations().await?;
    let store = DashboardStore::new(dragonfly.clone(), postgres.clone());

    // 5. Controller and status record.
    let (controller, controller_task) = spawn_controller(store, config.controller_config());
    let outcome = controller.initialize().await?;
    info!(?outcome, "Vehicle status ready");

    // 6. Dashboard API.
    let control = Arc::new(LoopControl::new(config.simulation.tick_interval_ms));
    let app_state = Arc::new(AppState::new(
        controller.clone(),
        Arc::clone(&control),
        config.history.clone(),
    ));
    let api_shutdown = {
        let control = Arc::clone(&control);
        async move { control.stopped().await }
    };
    let api_handle = voltdash_api::spawn_api(
        &ServerConfig::from(&config.server),
        &config.cors,
        Arc::clone(&app_state),
        api_shutdown,
    )
    .await?;

    // Signals and an API failure flip the shared stop flag; the loop and the
    // API both watch it.
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            control.request_stop();
        });
    }

    // 7. Tick loop.
    let mut callback = BroadcastCallback::new(app_state);
    let result = runner::run_simulation(&controller, &control, &mut callback).await;
    runner::log_simulation_end(&result);

    // 8. Shutdown.
    control.request_stop();
    let api_result = api_handle.await.map_err(|e| ServerBinError::Task {
        message: format!("API task failed: {e}"),
    })?;

    drop(callback);
    drop(controller);
    if tokio::time::timeout(CONTROLLER_DRAIN_TIMEOUT, controller_task)
        .await
        .is_err()
    {
        warn!("Vehicle controller did not stop in time");
    }

    postgres.close().await;
    if let Err(e) = dragonfly.close().await {
        warn!(error = %e, "Failed to close Dragonfly connection");
    }

    result?;
    api_result?;
    info!("voltdash-server shutdown complete");
    Ok(())
}

/// Load `voltdash-config.yaml` from the working directory, or defaults with
/// environment overrides if it does not exist.
fn load_config() -> Result<VoltDashConfig, ServerBinError> {
    let path = Path::new(CONFIG_PATH);
    if path.exists() {
        Ok(VoltDashConfig::from_file(path)?)
    } else {
        let mut config = VoltDashConfig::default();
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingSection) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Resolve on `SIGINT`, or `SIGTERM` on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
