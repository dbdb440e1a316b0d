//! Axum router construction for the dashboard API.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, put};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use voltdash_core::config::CorsSection;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete router.
///
/// - `GET /api/status`
/// - `PUT /api/motor/rpm`
/// - `PUT /api/battery/charging`
/// - `PUT /api/indicators/parkingBrake`
/// - `GET /api/history`
/// - `GET /test`, `GET /api/test`
/// - `GET /ws/status` -- `WebSocket` status stream
pub fn build_router(state: Arc<AppState>, cors: &CorsSection) -> Router {
    Router::new()
        .route("/api/status", get(handlers::get_status))
        .route("/api/motor/rpm", put(handlers::set_rpm))
        .route("/api/battery/charging", put(handlers::set_charging))
        .route(
            "/api/indicators/parkingBrake",
            put(handlers::set_parking_brake),
        )
        .route("/api/history", get(handlers::get_history))
        .route("/test", get(handlers::server_test))
        .route("/api/test", get(handlers::store_test))
        .route("/ws/status", get(ws::ws_status))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the dashboard. An empty origin list allows any origin.
fn cors_layer(cors: &CorsSection) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cors.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| tracing::warn!(%origin, error = %e, "Ignoring invalid CORS origin"))
                .ok()
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
