//! Live channel endpoint

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use futures::StreamExt;

use crate::agent::run_agent;
use crate::AppState;

/// GET /ws
///
/// Upgrades to a WebSocket; the connection lives as a connection agent.
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = socket.split();
        run_agent(sink, stream, state.hub, state.dispatcher).await;
    })
}

/// Build live channel routes
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}
