//! Web module: axum HTTP + WebSocket endpoint for participants.
//!
//! - `WS /ws` — signaling and frame relay channel (one session per socket)
//! - `GET /api/status` — server status
//! - `GET /api/rooms` — room diagnostics

pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::server::{Coordinator, RoomSummary};

/// Shared state for the web server
struct WebState {
    coordinator: Coordinator,
    start_time: Instant,
}

/// Build the axum application.
///
/// `start` drives this against its own listener; tests bind one
/// themselves to get an ephemeral port.
pub fn app(coordinator: Coordinator) -> Router {
    let state = Arc::new(WebState {
        coordinator,
        start_time: Instant::now(),
    });

    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/api/status", get(api_status))
        .route("/api/rooms", get(api_rooms))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server and serve until the process shuts down
pub async fn start(coordinator: Coordinator, bind: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("Failed to bind to {}", bind))?;

    info!("Web server listening on http://{}", bind);

    axum::serve(listener, app(coordinator))
        .await
        .context("Web server error")?;

    Ok(())
}

/// WebSocket upgrade handler
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WebState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws::handle_ws(socket, state.coordinator.clone()))
}

/// GET /api/status — server status
async fn api_status(State(state): State<Arc<WebState>>) -> Json<serde_json::Value> {
    let stats = state.coordinator.stats();
    let rooms = state.coordinator.room_count().await;
    let uptime = state.start_time.elapsed().as_secs();

    Json(serde_json::json!({
        "rooms": rooms,
        "connections": stats.connections,
        "events_relayed": stats.events_relayed,
        "frames_relayed": stats.frames_relayed,
        "frames_dropped": stats.frames_dropped,
        "uptime_secs": uptime,
    }))
}

/// GET /api/rooms — list live rooms with member counts
async fn api_rooms(State(state): State<Arc<WebState>>) -> Json<Vec<RoomSummary>> {
    Json(state.coordinator.room_summaries().await)
}
