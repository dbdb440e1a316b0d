//! Error types for the server binary.
//!
//! [`ServerBinError`] wraps every failure that can abort startup or end the
//! process, so `main` can propagate with `?`.

use crate::credentials::CredentialsError;

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
pub enum ServerBinError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: voltdash_core::config::ConfigError,
    },

    /// No usable credentials were found.
    #[error("credentials error: {source}")]
    Credentials {
        /// The underlying credentials error.
        #[from]
        source: CredentialsError,
    },

    /// Connecting to or migrating a database failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying data-layer error.
        #[from]
        source: voltdash_db::DbError,
    },

    /// The vehicle record could not be initialized.
    #[error("initialization error: {source}")]
    Initialize {
        /// The underlying controller error.
        #[from]
        source: voltdash_core::controller::ControllerError,
    },

    /// The dashboard API failed to start.
    #[error("API startup error: {source}")]
    Startup {
        /// The underlying startup error.
        #[from]
        source: voltdash_api::StartupError,
    },

    /// The dashboard API stopped with an error.
    #[error("API server error: {source}")]
    Api {
        /// The underlying server error.
        #[from]
        source: voltdash_api::ServerError,
    },

    /// The tick loop ended abnormally.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: voltdash_core::runner::RunnerError,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}
