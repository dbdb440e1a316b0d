//! REST endpoint handlers for the dashboard.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/status` | Current vehicle status, `{}` before initialization |
//! | `PUT` | `/api/motor/rpm` | Set motor speed |
//! | `PUT` | `/api/battery/charging` | Start or stop charging |
//! | `PUT` | `/api/indicators/parkingBrake` | Engage or release the parking brake |
//! | `GET` | `/api/history` | Recent per-tick snapshots, newest first |
//! | `GET` | `/test` | Liveness |
//! | `GET` | `/api/test` | Store connectivity |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use voltdash_types::{HistoryEntry, TimestampFormat};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `PUT /api/motor/rpm`.
#[derive(Debug, Deserialize)]
pub struct SetRpmRequest {
    /// Requested motor speed. Missing means 0.
    #[serde(default)]
    pub rpm: f64,
}

/// Response of `PUT /api/motor/rpm`.
#[derive(Debug, Serialize)]
pub struct SetRpmResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// The speed now stored.
    pub new_rpm: f64,
}

/// Body of `PUT /api/battery/charging`.
#[derive(Debug, Deserialize)]
pub struct SetChargingRequest {
    /// Requested charging state. Missing means `true`.
    #[serde(rename = "isCharging", default = "default_true")]
    pub is_charging: bool,
}

/// Response of `PUT /api/battery/charging`.
#[derive(Debug, Serialize)]
pub struct SetChargingResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// The charging state now stored.
    #[serde(rename = "isCharging")]
    pub is_charging: bool,
}

/// Body of `PUT /api/indicators/parkingBrake`.
#[derive(Debug, Deserialize)]
pub struct SetParkingBrakeRequest {
    /// Requested brake state. Missing means engaged.
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Response of `PUT /api/indicators/parkingBrake`.
#[derive(Debug, Serialize)]
pub struct SetParkingBrakeResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// The brake state now stored.
    #[serde(rename = "parkingBrake")]
    pub parking_brake: bool,
}

/// Query parameters of `GET /api/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum rows; defaults to and is capped by configuration.
    pub limit: Option<usize>,
    /// Timestamp rendering: `epoch` or `iso8601`.
    pub format: Option<TimestampFormat>,
}

const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Return the current status, or `{}` if it was never created.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let response = match state.controller.status().await? {
        Some(status) => Json(status).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    };
    Ok(response)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Set the motor speed. Rejected with 400 while charging.
pub async fn set_rpm(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<SetRpmRequest>,
) -> Result<Json<SetRpmResponse>, ApiError> {
    let new_rpm = state.controller.set_rpm(body.rpm).await?;
    Ok(Json(SetRpmResponse {
        success: true,
        new_rpm,
    }))
}

/// Start or stop charging. Either way the motor is stopped.
pub async fn set_charging(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<SetChargingRequest>,
) -> Result<Json<SetChargingResponse>, ApiError> {
    let is_charging = state.controller.set_charging(body.is_charging).await?;
    Ok(Json(SetChargingResponse {
        success: true,
        is_charging,
    }))
}

/// Engage or release the parking brake.
pub async fn set_parking_brake(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<SetParkingBrakeRequest>,
) -> Result<Json<SetParkingBrakeResponse>, ApiError> {
    let parking_brake = state.controller.set_parking_brake(body.active).await?;
    Ok(Json(SetParkingBrakeResponse {
        success: true,
        parking_brake,
    }))
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Return recent snapshots, newest first.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let limit = state.history.effective_limit(query.limit);
    let format = query.format.unwrap_or(state.history.timestamp_format);

    let records = state.controller.history(limit).await?;
    tracing::debug!(limit, returned = records.len(), "History requested");

    Ok(Json(
        records.iter().map(|record| record.render(format)).collect(),
    ))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Liveness check.
pub async fn server_test() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Server is running!",
        "status": "OK",
    }))
}

/// Check that the store answers, and whether the status record exists.
pub async fn store_test(State(state): State<Arc<AppState>>) -> Response {
    match state.controller.status().await {
        Ok(status) => Json(serde_json::json!({
            "message": "Database connection successful",
            "data_exists": status.is_some(),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Store connectivity check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "message": "Database connection failed",
                })),
            )
                .into_response()
        }
    }
}
