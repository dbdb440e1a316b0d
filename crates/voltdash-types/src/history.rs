//! Immutable history snapshots.
//!
//! A [`HistoryRecord`] is appended every time a simulation tick commits.
//! Records are never mutated. For display they are rendered into a
//! [`HistoryEntry`] whose timestamp shape is chosen by [`TimestampFormat`]:
//! the history table of the dashboard reads `{_seconds, _nanoseconds}`,
//! other consumers prefer ISO-8601 strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::status::VehicleStatus;

/// A snapshot of the vehicle taken when a tick committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Row identifier (UUID v7, time-ordered).
    pub id: Uuid,
    /// Wall-clock time the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Motor RPM.
    pub rpm: f64,
    /// Motor power draw in kW.
    pub power_consumption: f64,
    /// Battery state of charge.
    pub battery_percentage: f64,
    /// Battery temperature.
    pub temperature: f64,
    /// Whether the battery was charging.
    pub is_charging: bool,
}

impl HistoryRecord {
    /// Capture the fields of a committed status at `timestamp`.
    pub fn from_status(status: &VehicleStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp,
            rpm: status.motor.rpm,
            power_consumption: status.motor.power_consumption,
            battery_percentage: status.battery.percentage,
            temperature: status.battery.temperature,
            is_charging: status.battery.is_charging,
        }
    }

    /// Render the record for display with the requested timestamp shape.
    pub fn render(&self, format: TimestampFormat) -> HistoryEntry {
        let timestamp = match format {
            TimestampFormat::Iso8601 => HistoryTimestamp::Iso8601(self.timestamp.to_rfc3339()),
            TimestampFormat::Epoch => HistoryTimestamp::Epoch {
                seconds: self.timestamp.timestamp(),
                nanoseconds: self.timestamp.timestamp_subsec_nanos(),
            },
        };

        HistoryEntry {
            timestamp,
            rpm: self.rpm,
            power_consumption: self.power_consumption,
            battery_percentage: self.battery_percentage,
            temperature: self.temperature,
            is_charging: self.is_charging,
        }
    }
}

/// How timestamps are rendered in history responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum TimestampFormat {
    /// RFC 3339 / ISO-8601 string.
    Iso8601,
    /// `{_seconds, _nanoseconds}` object.
    #[default]
    Epoch,
}

/// A rendered timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum HistoryTimestamp {
    /// ISO-8601 string form.
    Iso8601(String),
    /// Seconds and nanoseconds since the Unix epoch.
    Epoch {
        /// Whole seconds since the epoch.
        #[serde(rename = "_seconds")]
        seconds: i64,
        /// Sub-second nanoseconds.
        #[serde(rename = "_nanoseconds")]
        nanoseconds: u32,
    },
}

/// A history record as served by `GET /api/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HistoryEntry {
    /// When the snapshot was taken.
    pub timestamp: HistoryTimestamp,
    /// Motor RPM.
    pub rpm: f64,
    /// Motor power draw in kW.
    pub power_consumption: f64,
    /// Battery state of charge.
    pub battery_percentage: f64,
    /// Battery temperature.
    pub temperature: f64,
    /// Whether the battery was charging.
    pub is_charging: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> HistoryRecord {
        let mut status = VehicleStatus::initial();
        status.motor.rpm = 800.0;
        status.motor.power_consumption = 1000.0;
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap();
        HistoryRecord::from_status(&status, at)
    }

    #[test]
    fn epoch_rendering_uses_underscore_keys() {
        let json = serde_json::to_value(sample().render(TimestampFormat::Epoch)).unwrap();
        assert_eq!(json["timestamp"]["_seconds"], 1_709_294_405_i64);
        assert_eq!(json["timestamp"]["_nanoseconds"], 0);
        assert_eq!(json["is_charging"], false);
    }

    #[test]
    fn iso_rendering_is_a_string() {
        let json = serde_json::to_value(sample().render(TimestampFormat::Iso8601)).unwrap();
        assert_eq!(json["timestamp"], "2024-03-01T12:00:05+00:00");
    }

    #[test]
    fn snapshot_copies_status_fields() {
        let record = sample();
        assert!(record.rpm > 799.0);
        assert!(record.power_consumption > 999.0);
        assert!(!record.is_charging);
    }

    #[test]
    fn format_parses_from_lowercase() {
        let format: TimestampFormat = serde_json::from_str(r#""iso8601""#).unwrap();
        assert_eq!(format, TimestampFormat::Iso8601);
        assert_eq!(TimestampFormat::default(), TimestampFormat::Epoch);
    }
}
