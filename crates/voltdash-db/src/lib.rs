//! Data layer for VoltDash (`Dragonfly` + `PostgreSQL`).
//!
//! `Dragonfly` holds the single current-status document that every tick and
//! command rewrites. `PostgreSQL` holds the append-only history of per-tick
//! snapshots that the dashboard charts.
//!
//! ```text
//! Vehicle controller
//!     |
//!     +-- current status --> Dragonfly  (DragonflyPool, vehicle:status:current)
//!     |
//!     +-- tick snapshot ----> PostgreSQL (HistoryStore, vehicle_history)
//! ```
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) current-status operations
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`history_store`] -- History snapshot insertion, querying, and pruning
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod history_store;
pub mod postgres;

// Re-export primary types for convenience.
pub use dragonfly::{CURRENT_STATUS_KEY, DragonflyPool};
pub use error::DbError;
pub use history_store::{HistoryRow, HistoryStore};
pub use postgres::{PostgresConfig, PostgresPool};
