//! Error types for the dashboard API.
//!
//! [`ApiError`] is converted into an Axum response with a JSON body of the
//! form `{"error": "<message>"}`, which is what the dashboard displays.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use voltdash_core::commands::CommandError;
use voltdash_core::controller::ControllerError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The command was rejected by the vehicle rules.
    #[error(transparent)]
    Rejected(#[from] CommandError),

    /// The request body or query string could not be decoded.
    #[error("{0}")]
    BadRequest(String),

    /// The vehicle status has not been created yet.
    #[error("vehicle status has not been initialized")]
    NotInitialized,

    /// The store failed while handling the request.
    #[error("{0}")]
    Store(String),

    /// The vehicle controller is not running.
    #[error("vehicle controller is not running")]
    Unavailable,
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::Rejected(e) => Self::Rejected(e),
            ControllerError::NotInitialized => Self::NotInitialized,
            ControllerError::Store(e) => Self::Store(e.to_string()),
            ControllerError::Closed => Self::Unavailable,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotInitialized => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use voltdash_core::store::StoreError;

    use super::*;

    #[test]
    fn charging_conflict_is_a_bad_request_with_the_exact_message() {
        let err = ApiError::from(ControllerError::Rejected(CommandError::ChargingConflict));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Cannot change RPM while charging");
    }

    #[test]
    fn controller_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(ControllerError::NotInitialized).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ControllerError::Store(StoreError::MissingRecord)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(ControllerError::Closed).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
