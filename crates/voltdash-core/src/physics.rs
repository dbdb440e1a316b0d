//! Per-tick battery and motor physics.
//!
//! One tick advances the vehicle by a fixed quantum of one second. All rates
//! below are expressed per tick, independent of how often the loop actually
//! runs, and are policy constants rather than values derived from physical
//! units.
//!
//! The advance is a pure function of the current status: [`tick_patch`]
//! computes the fields a tick changes and [`advance`] applies them to a copy.
//!
//! | Condition | Power | Percentage | Temperature |
//! |-----------|-------|------------|-------------|
//! | charging | [`CHARGING_POWER`] | `+ CHARGING_RATE`, max 100 | cools |
//! | `rpm > 0` | `rpm * RPM_TO_POWER` | `- BATTERY_DRAIN_RATE`, min 0 | heats with rpm, max 90 |
//! | idle | 0 | unchanged | `- TEMP_DECREASE_RATE`, min 25 |

use voltdash_types::{StatusPatch, VehicleStatus};

/// Power reported while the battery is charging (kW, negative = inflow).
pub const CHARGING_POWER: f64 = -10.0;

/// kW of draw per motor RPM. 800 RPM maps to 1000 kW.
pub const RPM_TO_POWER: f64 = 1000.0 / 800.0;

/// Percentage points gained per tick while charging.
pub const CHARGING_RATE: f64 = 0.2;

/// Percentage points lost per tick while the motor turns.
pub const BATTERY_DRAIN_RATE: f64 = 0.1;

/// Degrees gained per tick per 1000 RPM.
pub const TEMP_INCREASE_RATE: f64 = 0.1;

/// Degrees lost per tick while the motor is stopped.
pub const TEMP_DECREASE_RATE: f64 = 0.05;

/// RPM that scales [`TEMP_INCREASE_RATE`].
pub const TEMP_RPM_SCALE: f64 = 1000.0;

/// Lowest battery percentage.
pub const MIN_PERCENTAGE: f64 = 0.0;

/// Highest battery percentage.
pub const MAX_PERCENTAGE: f64 = 100.0;

/// Lowest battery temperature (ambient).
pub const MIN_TEMPERATURE: f64 = 25.0;

/// Highest battery temperature.
pub const MAX_TEMPERATURE: f64 = 90.0;

/// Power draw of the motor at `rpm`. Zero when stopped.
///
/// Shared by the tick and by the set-RPM command so the value written by a
/// command already matches what the next tick will compute.
pub fn motor_power(rpm: f64) -> f64 {
    if rpm > 0.0 { rpm * RPM_TO_POWER } else { 0.0 }
}

/// Power consumption for the current state.
pub fn power_consumption(status: &VehicleStatus) -> f64 {
    if status.battery.is_charging {
        CHARGING_POWER
    } else {
        motor_power(status.motor.rpm)
    }
}

/// Battery percentage after one tick.
pub fn next_percentage(status: &VehicleStatus) -> f64 {
    let current = status.battery.percentage;
    if status.battery.is_charging {
        (current + CHARGING_RATE).min(MAX_PERCENTAGE)
    } else if status.is_driving() {
        (current - BATTERY_DRAIN_RATE).max(MIN_PERCENTAGE)
    } else {
        current
    }
}

/// Battery temperature after one tick.
///
/// Charging has no effect of its own; only the motor heats the pack.
pub fn next_temperature(status: &VehicleStatus) -> f64 {
    let current = status.battery.temperature;
    if status.is_driving() {
        let rise = TEMP_INCREASE_RATE * (status.motor.rpm / TEMP_RPM_SCALE);
        (current + rise).min(MAX_TEMPERATURE)
    } else {
        (current - TEMP_DECREASE_RATE).max(MIN_TEMPERATURE)
    }
}

/// The fields one tick writes, computed from `status`.
///
/// Derived indicators (`batteryLow`, `motorActive`) are recomputed from the
/// new values when the patch is applied.
pub fn tick_patch(status: &VehicleStatus) -> StatusPatch {
    StatusPatch {
        power_consumption: Some(power_consumption(status)),
        percentage: Some(next_percentage(status)),
        temperature: Some(next_temperature(status)),
        ..StatusPatch::default()
    }
}

/// Advance `status` by one tick.
pub fn advance(status: &VehicleStatus) -> VehicleStatus {
    let mut next = status.clone();
    tick_patch(status).apply_to(&mut next);
    next
}
