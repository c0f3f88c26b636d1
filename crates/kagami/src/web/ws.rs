//! WebSocket handler: one coordinator session per socket, translating
//! wire messages to and from core envelopes.
//!
//! Malformed or oversized inbound messages are logged and dropped; the
//! connection stays open. Socket close or a read error tears the
//! session down through the coordinator's single disconnect path.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::server::Coordinator;
use crate::{ClientEvent, ConnId, ServerEvent, MAX_EVENT_SIZE, OUTBOUND_QUEUE_DEPTH};

/// Handle a single WebSocket connection for its whole lifetime
pub async fn handle_ws(socket: WebSocket, coordinator: Coordinator) {
    let conn = ConnId::new(Uuid::new_v4().to_string());
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTBOUND_QUEUE_DEPTH);
    coordinator.connect(conn.clone(), tx).await;

    loop {
        tokio::select! {
            // Outbound: events queued for this connection by the relay
            event = rx.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(conn = %conn, error = %e, "Failed to encode outbound event");
                    }
                }
            }
            // Inbound: wire messages from the participant
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_EVENT_SIZE {
                            warn!(conn = %conn, len = text.len(), "Oversized message, dropping");
                            continue;
                        }
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => coordinator.handle_event(&conn, event).await,
                            Err(e) => {
                                warn!(conn = %conn, error = %e, "Unrecognized message, dropping");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn = %conn, error = %e, "WebSocket read error");
                        break;
                    }
                    _ => {} // Binary/pong ignored
                }
            }
        }
    }

    coordinator.disconnect(&conn).await;
    debug!(conn = %conn, "WebSocket session ended");
}
