//! `WebSocket` handler for live status streaming.
//!
//! Clients connect to `GET /ws/status` and receive the JSON-encoded
//! [`VehicleStatus`](voltdash_types::VehicleStatus) after every committed
//! tick. A client that falls behind skips to the newest status. Connections
//! are closed when the server begins shutting down.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade to a `WebSocket` and stream committed statuses.
pub async fn ws_status(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");
    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            () = state.control.stopped() => {
                debug!("Server stopping, closing WebSocket");
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
            result = rx.recv() => {
                match result {
                    Ok(status) => {
                        let json = match serde_json::to_string(&status) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!(error = %e, "Failed to serialize status");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Status channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket error");
                        return;
                    }
                    // Client text and binary frames carry nothing.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
