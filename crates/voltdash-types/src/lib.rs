//! Shared type definitions for the VoltDash vehicle dashboard.
//!
//! This crate is the single source of truth for the documents exchanged
//! between the simulation core, the storage layer, and the HTTP API. Types
//! defined here flow downstream to `TypeScript` via `ts-rs` for the
//! dashboard frontend.
//!
//! # Modules
//!
//! - [`status`] -- The live vehicle status document and its partial-update
//!   shape
//! - [`history`] -- Immutable per-tick history snapshots and their display
//!   rendering

pub mod history;
pub mod status;

// Re-export all public types at crate root for convenience.
pub use history::{HistoryEntry, HistoryRecord, HistoryTimestamp, TimestampFormat};
pub use status::{BatteryStatus, Indicators, MotorStatus, StatusPatch, VehicleStatus};
