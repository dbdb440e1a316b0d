//! Persistence for per-tick history snapshots.
//!
//! One row is appended to `vehicle_history` for each committed tick. The
//! dashboard reads the newest rows; retention deletes everything past the
//! newest `keep` rows.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use voltdash_types::HistoryRecord;

use crate::error::DbError;

/// Operations on the `vehicle_history` table.
pub struct HistoryStore<'a> {
    pool: &'a PgPool,
}

impl<'a> HistoryStore<'a> {
    /// Create a history store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert one snapshot. Re-inserting the same id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, record: &HistoryRecord) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO vehicle_history
              (id, recorded_at, rpm, power_consumption, battery_percentage, temperature, is_charging)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(record.id)
        .bind(record.timestamp)
        .bind(record.rpm)
        .bind(record.power_consumption)
        .bind(record.battery_percentage)
        .bind(record.temperature)
        .bind(record.is_charging)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Return up to `limit` snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn recent(&self, limit: usize) -> Result<Vec<HistoryRow>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, HistoryRow>(
            r"SELECT id, recorded_at, rpm, power_consumption, battery_percentage, temperature, is_charging
              FROM vehicle_history
              ORDER BY recorded_at DESC
              LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete all but the newest `keep` snapshots. Returns the number of
    /// rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn prune(&self, keep: usize) -> Result<u64, DbError> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);

        let result = sqlx::query(
            r"DELETE FROM vehicle_history
              WHERE id IN (
                SELECT id FROM vehicle_history
                ORDER BY recorded_at DESC
                OFFSET $1
              )",
        )
        .bind(keep)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count stored snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count(&self) -> Result<i64, DbError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vehicle_history")
            .fetch_one(self.pool)
            .await?;
        Ok(row.0)
    }
}

/// A row from the `vehicle_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    /// Snapshot id.
    pub id: Uuid,
    /// When the tick committed.
    pub recorded_at: DateTime<Utc>,
    /// Motor RPM.
    pub rpm: f64,
    /// Power consumption in kW.
    pub power_consumption: f64,
    /// Battery charge in percent.
    pub battery_percentage: f64,
    /// Battery temperature in degrees Celsius.
    pub temperature: f64,
    /// Whether the battery was charging.
    pub is_charging: bool,
}

impl From<HistoryRow> for HistoryRecord {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            timestamp: row.recorded_at,
            rpm: row.rpm,
            power_consumption: row.power_consumption,
            battery_percentage: row.battery_percentage,
            temperature: row.temperature,
            is_charging: row.is_charging,
        }
    }
}
