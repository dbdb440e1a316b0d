//! Rules for the dashboard commands.
//!
//! Each command is validated against the status it will be committed on and
//! turned into a [`StatusPatch`]. The functions here are pure; the
//! [`controller`](crate::controller) runs them on the snapshot it holds, so a
//! decision such as "reject because charging" is never made on stale state.
//!
//! Driving and charging are mutually exclusive: setting RPM while charging
//! is rejected, and toggling the charging flag always stops the motor.

use voltdash_types::{StatusPatch, VehicleStatus};

use crate::physics::{self, CHARGING_POWER};

/// Reasons a command is rejected without mutating the record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// RPM cannot change while the battery is charging.
    #[error("Cannot change RPM while charging")]
    ChargingConflict,

    /// The requested RPM is negative, not a finite number, or out of range.
    #[error("RPM must be a non-negative number in range, got {0}")]
    InvalidRpm(f64),
}

/// Build the patch for setting the motor speed.
///
/// Power consumption is recomputed with the same rule the tick uses so the
/// record is consistent immediately rather than after the next tick.
///
/// # Errors
///
/// - [`CommandError::InvalidRpm`] if `rpm` is negative, not finite, or so
///   large that its power draw overflows.
/// - [`CommandError::ChargingConflict`] if the battery is charging.
pub fn set_rpm(status: &VehicleStatus, rpm: f64) -> Result<StatusPatch, CommandError> {
    // The stored record must stay encodable: JSON has no infinity.
    if !rpm.is_finite() || rpm < 0.0 || !physics::motor_power(rpm).is_finite() {
        return Err(CommandError::InvalidRpm(rpm));
    }
    if status.battery.is_charging {
        return Err(CommandError::ChargingConflict);
    }

    Ok(StatusPatch {
        rpm: Some(rpm),
        power_consumption: Some(physics::motor_power(rpm)),
        ..StatusPatch::default()
    })
}

/// Build the patch for toggling the charging flag.
///
/// The motor is stopped in both directions. Turning charging off does not
/// restore the previous speed; the driver has to set it again.
pub fn set_charging(is_charging: bool) -> StatusPatch {
    StatusPatch {
        is_charging: Some(is_charging),
        rpm: Some(0.0),
        power_consumption: Some(if is_charging { CHARGING_POWER } else { 0.0 }),
        ..StatusPatch::default()
    }
}

/// Build the patch for engaging or releasing the parking brake.
pub fn set_parking_brake(engaged: bool) -> StatusPatch {
    StatusPatch {
        parking_brake: Some(engaged),
        ..StatusPatch::default()
    }
}

/// Patch applied to an existing record when the process boots.
///
/// A restarted process never resumes driving or charging on its own.
pub fn startup_reset() -> StatusPatch {
    StatusPatch {
        is_charging: Some(false),
        rpm: Some(0.0),
        power_consumption: Some(0.0),
        ..StatusPatch::default()
    }
}
