//! The live vehicle status document.
//!
//! There is exactly one [`VehicleStatus`] per deployment, stored under the
//! logical key `current`. It is created once with [`VehicleStatus::initial`]
//! and then mutated forever in place, either by a simulation tick or by a
//! command from the dashboard. Every mutation is expressed as a
//! [`StatusPatch`] so the derived fields can be recomputed in one place.
//!
//! Field names serialize in camelCase because the dashboard frontend reads
//! them verbatim (`motor.powerConsumption`, `battery.isCharging`, ...).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Descriptive gear ratio shown on the dashboard info bar.
pub const DEFAULT_GEAR_RATIO: &str = "3:1";

/// Battery percentage below which the low-battery light turns on.
pub const DEFAULT_LOW_BATTERY_THRESHOLD: f64 = 20.0;

/// Battery percentage of a freshly created record.
pub const FULL_CHARGE_PERCENTAGE: f64 = 100.0;

/// Battery temperature of a freshly created record (ambient, in degrees C).
pub const AMBIENT_TEMPERATURE: f64 = 25.0;

// ---------------------------------------------------------------------------
// Motor
// ---------------------------------------------------------------------------

/// Motor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct MotorStatus {
    /// Current motor speed in revolutions per minute. Never negative.
    pub rpm: f64,
    /// Instantaneous power draw in kW. Negative while charging.
    pub power_consumption: f64,
    /// Fixed descriptive gear ratio.
    pub gear_ratio: String,
    /// Derived: `rpm > 0`.
    pub is_active: bool,
}

impl Default for MotorStatus {
    fn default() -> Self {
        Self {
            rpm: 0.0,
            power_consumption: 0.0,
            gear_ratio: DEFAULT_GEAR_RATIO.to_owned(),
            is_active: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

/// Battery state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct BatteryStatus {
    /// State of charge, 0 to 100.
    pub percentage: f64,
    /// Pack temperature in degrees C, 25 to 90.
    pub temperature: f64,
    /// Whether the vehicle is plugged in and charging.
    pub is_charging: bool,
    /// Percentage below which [`Indicators::battery_low`] is lit.
    pub low_battery_threshold: f64,
}

impl Default for BatteryStatus {
    fn default() -> Self {
        Self {
            percentage: FULL_CHARGE_PERCENTAGE,
            temperature: AMBIENT_TEMPERATURE,
            is_charging: false,
            low_battery_threshold: DEFAULT_LOW_BATTERY_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// Dashboard indicator lights.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct Indicators {
    /// Parking brake engaged.
    pub parking_brake: bool,
    /// Check-engine fault light.
    pub check_engine: bool,
    /// Derived: mirrors [`MotorStatus::is_active`].
    pub motor_active: bool,
    /// Derived: battery percentage is below the low-battery threshold.
    pub battery_low: bool,
}

// ---------------------------------------------------------------------------
// VehicleStatus
// ---------------------------------------------------------------------------

/// The single current-status record of the vehicle.
///
/// Missing fields in a stored document fall back to the values of
/// [`VehicleStatus::initial`], so a partially written record still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export, export_to = "bindings/")]
pub struct VehicleStatus {
    /// Motor state.
    pub motor: MotorStatus,
    /// Battery state.
    pub battery: BatteryStatus,
    /// Indicator lights.
    pub indicators: Indicators,
}

impl VehicleStatus {
    /// The record written on first boot: motor stopped, battery full and
    /// at ambient temperature, not charging, no faults.
    pub fn initial() -> Self {
        Self::default()
    }

    /// Whether the motor is turning.
    pub fn is_driving(&self) -> bool {
        self.motor.rpm > 0.0
    }

    /// Recompute every derived field from the primary fields.
    ///
    /// - `motor.isActive` and `indicators.motorActive` from `motor.rpm`
    /// - `indicators.batteryLow` from `battery.percentage` and the threshold
    pub fn refresh_derived(&mut self) {
        let driving = self.is_driving();
        self.motor.is_active = driving;
        self.indicators.motor_active = driving;
        self.indicators.battery_low =
            self.battery.percentage < self.battery.low_battery_threshold;
    }

    /// Whether driving and charging are mutually exclusive in this state.
    pub fn drive_charge_exclusive(&self) -> bool {
        !(self.is_driving() && self.battery.is_charging)
    }

    /// Whether every derived field agrees with the primary fields.
    pub fn derived_fields_consistent(&self) -> bool {
        let driving = self.is_driving();
        self.motor.is_active == driving
            && self.indicators.motor_active == driving
            && self.indicators.battery_low
                == (self.battery.percentage < self.battery.low_battery_threshold)
    }
}

// ---------------------------------------------------------------------------
// StatusPatch
// ---------------------------------------------------------------------------

/// A partial update to the current-status record.
///
/// Only the primary fields can be patched. Derived fields are recomputed by
/// [`StatusPatch::apply_to`] after the patch is written, so a committed
/// record is always internally consistent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusPatch {
    /// New `motor.rpm`.
    pub rpm: Option<f64>,
    /// New `motor.powerConsumption`.
    pub power_consumption: Option<f64>,
    /// New `battery.percentage`.
    pub percentage: Option<f64>,
    /// New `battery.temperature`.
    pub temperature: Option<f64>,
    /// New `battery.isCharging`.
    pub is_charging: Option<bool>,
    /// New `indicators.parkingBrake`.
    pub parking_brake: Option<bool>,
}

impl StatusPatch {
    /// Whether the patch changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.rpm.is_none()
            && self.power_consumption.is_none()
            && self.percentage.is_none()
            && self.temperature.is_none()
            && self.is_charging.is_none()
            && self.parking_brake.is_none()
    }

    /// Write the patched fields into `status` and refresh derived fields.
    pub fn apply_to(&self, status: &mut VehicleStatus) {
        if let Some(rpm) = self.rpm {
            status.motor.rpm = rpm;
        }
        if let Some(power) = self.power_consumption {
            status.motor.power_consumption = power;
        }
        if let Some(percentage) = self.percentage {
            status.battery.percentage = percentage;
        }
        if let Some(temperature) = self.temperature {
            status.battery.temperature = temperature;
        }
        if let Some(is_charging) = self.is_charging {
            status.battery.is_charging = is_charging;
        }
        if let Some(parking_brake) = self.parking_brake {
            status.indicators.parking_brake = parking_brake;
        }
        status.refresh_derived();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn initial_record_matches_first_boot_defaults() {
        let status = VehicleStatus::initial();
        assert!(!status.is_driving());
        assert!(!status.battery.is_charging);
        assert_eq!(status.motor.gear_ratio, "3:1");
        assert!(!status.indicators.parking_brake);
        assert!(!status.indicators.check_engine);
        assert!(status.derived_fields_consistent());
    }

    #[test]
    fn serializes_with_dashboard_field_names() {
        let json = serde_json::to_value(VehicleStatus::initial()).unwrap();
        assert!(json["motor"]["powerConsumption"].is_number());
        assert_eq!(json["motor"]["gearRatio"], "3:1");
        assert_eq!(json["motor"]["isActive"], false);
        assert_eq!(json["battery"]["isCharging"], false);
        assert!(json["battery"]["lowBatteryThreshold"].is_number());
        assert_eq!(json["indicators"]["parkingBrake"], false);
        assert_eq!(json["indicators"]["motorActive"], false);
        assert_eq!(json["indicators"]["batteryLow"], false);
    }

    #[test]
    fn partial_document_falls_back_to_defaults() {
        let status: VehicleStatus =
            serde_json::from_str(r#"{"motor": {"rpm": 200}, "battery": {"isCharging": false}}"#)
                .unwrap();
        assert!(status.is_driving());
        assert_eq!(status.motor.gear_ratio, DEFAULT_GEAR_RATIO);
        assert!(status.battery.temperature > 24.9 && status.battery.temperature < 25.1);
    }

    #[test]
    fn patch_refreshes_derived_fields() {
        let mut status = VehicleStatus::initial();
        let patch = StatusPatch {
            rpm: Some(400.0),
            percentage: Some(10.0),
            ..StatusPatch::default()
        };
        patch.apply_to(&mut status);

        assert!(status.motor.is_active);
        assert!(status.indicators.motor_active);
        assert!(status.indicators.battery_low);
        assert!(status.derived_fields_consistent());
    }

    #[test]
    fn empty_patch_only_refreshes() {
        let patch = StatusPatch::default();
        assert!(patch.is_empty());

        let mut status = VehicleStatus::initial();
        status.motor.is_active = true;
        patch.apply_to(&mut status);
        assert!(!status.motor.is_active);
    }

    #[test]
    fn exclusion_detects_driving_while_charging() {
        let mut status = VehicleStatus::initial();
        status.motor.rpm = 100.0;
        status.battery.is_charging = true;
        assert!(!status.drive_charge_exclusive());
    }
}
