//! Battery and motor simulation, command rules, and orchestration for VoltDash.
//!
//! This crate owns everything with design content: the per-tick physics,
//! the rules the dashboard commands must obey, and the single task that
//! serializes every mutation of the current-status record.
//!
//! # Modules
//!
//! - [`physics`] -- Rate constants and the pure state-advance function.
//! - [`commands`] -- Validation and patch construction for dashboard
//!   commands (set RPM, set charging, parking brake).
//! - [`store`] -- [`VehicleStore`] trait and an in-memory implementation.
//! - [`controller`] -- The serializing controller task and its handle.
//! - [`control`] -- Shared stop signal and tick interval for the loop.
//! - [`runner`] -- The recurring tick loop.
//! - [`config`] -- Configuration loading from `voltdash-config.yaml`.
//!
//! [`VehicleStore`]: store::VehicleStore

pub mod commands;
pub mod config;
pub mod control;
pub mod controller;
pub mod physics;
pub mod runner;
pub mod store;
