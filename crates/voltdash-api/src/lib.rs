//! Dashboard API server for VoltDash.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for reading the vehicle status and history and for
//!   the dashboard commands (motor RPM, charging, parking brake)
//! - **`WebSocket` endpoint** (`/ws/status`) that pushes every committed
//!   status via [`tokio::sync::broadcast`]
//! - **Health endpoints** (`/test`, `/api/test`) for the dashboard's
//!   connectivity banner
//!
//! # Architecture
//!
//! Handlers never touch the store. Every read and command is sent to the
//! vehicle controller through the [`ControllerHandle`] held in
//! [`AppState`], so HTTP requests and ticks are applied strictly one after
//! another.
//!
//! [`ControllerHandle`]: voltdash_core::controller::ControllerHandle

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::{StartupError, spawn_api};
pub use state::AppState;
