//! `Dragonfly` (Redis-compatible) current-status operations.
//!
//! The live vehicle state is one JSON document. Ticks and commands replace it
//! wholesale after applying a [`StatusPatch`] to the stored copy; the caller
//! is responsible for serializing those read-modify-write cycles.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `vehicle:status:current` | JSON | The current [`VehicleStatus`] |

use fred::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use voltdash_types::{StatusPatch, VehicleStatus};

use crate::error::DbError;

/// Key holding the current vehicle status.
pub const CURRENT_STATUS_KEY: &str = "vehicle:status:current";

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL follows the Redis scheme: `redis://host:port` or
    /// `redis://host:port/db`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Generic JSON get/set/delete
    // =========================================================================

    /// Serialize `value` as JSON and store it at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if serialization fails.
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize it, or `None` if the key is
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        value
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(DbError::from)
    }

    /// Read the value at `key` and deserialize it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::KeyNotFound`] if the key does not exist.
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, DbError> {
        self.get_optional_json(key)
            .await?
            .ok_or_else(|| DbError::KeyNotFound(key.to_owned()))
    }

    /// Delete a key from `Dragonfly`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    // =========================================================================
    // Current Status -- vehicle:status:current
    // =========================================================================

    /// Read the current status, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or deserialization fails.
    pub async fn get_current_status(&self) -> Result<Option<VehicleStatus>, DbError> {
        self.get_optional_json(CURRENT_STATUS_KEY).await
    }

    /// Replace the current status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or the write fails.
    pub async fn set_current_status(&self, status: &VehicleStatus) -> Result<(), DbError> {
        self.set_json(CURRENT_STATUS_KEY, status).await
    }

    /// Apply `patch` to the stored status and write it back.
    ///
    /// Not atomic against other writers.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::KeyNotFound`] if no status has been written.
    /// Returns [`DbError`] if the read, write, or (de)serialization fails.
    pub async fn update_current_status(&self, patch: &StatusPatch) -> Result<(), DbError> {
        let mut status: VehicleStatus = self.get_json(CURRENT_STATUS_KEY).await?;
        patch.apply_to(&mut status);
        self.set_current_status(&status).await
    }

    /// Delete the current status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn clear_current_status(&self) -> Result<(), DbError> {
        self.delete(CURRENT_STATUS_KEY).await
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the `QUIT` command fails.
    pub async fn close(&self) -> Result<(), DbError> {
        self.client.quit().await?;
        tracing::info!("Dragonfly connection closed");
        Ok(())
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}
