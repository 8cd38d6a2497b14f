//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// The subscriber is registered before the upgrade completes, so every
/// snapshot published after the handshake reaches it. A failed upgrade
/// drops the subscription and unregisters it.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let subscription = state.broadcaster.connect();
    ws.on_upgrade(move |socket| run_connection(socket, subscription))
}
