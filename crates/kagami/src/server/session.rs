//! Session coordinator: the per-connection state machine driving the
//! room registry and relay router.
//!
//! One entry point takes a connection id and an inbound event and
//! performs a bounded set of effects: a registry mutation plus zero or
//! more forwarding calls. Registry mutation and the broadcasts it
//! triggers happen under a single lock, so notifications for one room
//! are observed by every recipient in the order they were issued.
//! Forwarding itself enqueues without blocking, so holding the lock
//! across dispatch never waits on a socket.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use super::registry::{JoinOutcome, Registry};
use super::relay::{Relay, RelayStats};
use crate::{ClientEvent, ConnId, Role, RoomId, ServerEvent};

/// Lifecycle position of one connection.
///
/// The terminal state is represented by removing the entry: transport
/// connection ids are never reused, so an absent entry and a closed
/// session are indistinguishable, and disconnect stays idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Unjoined,
    Joined { role: Role, room_id: RoomId },
}

/// Summary of one room, for diagnostics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub has_host: bool,
    pub viewers: usize,
}

/// Session coordinator. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    /// Registry and session table, serialized behind one lock
    /// (single-writer discipline)
    state: Mutex<CoordinatorState>,
    relay: Relay,
}

#[derive(Default)]
struct CoordinatorState {
    registry: Registry,
    sessions: HashMap<ConnId, SessionState>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                state: Mutex::new(CoordinatorState::default()),
                relay: Relay::new(),
            }),
        }
    }

    /// Register a freshly accepted connection and its outbound queue.
    ///
    /// The transport adapter calls this once per accept, before
    /// feeding any events for the connection.
    pub async fn connect(&self, conn: ConnId, outbound: mpsc::Sender<ServerEvent>) {
        self.inner.relay.register(conn.clone(), outbound).await;
        let mut state = self.inner.state.lock().await;
        state.sessions.insert(conn.clone(), SessionState::Unjoined);
        info!(conn = %conn, "Connection registered");
    }

    /// Process one inbound event from a connection
    pub async fn handle_event(&self, conn: &ConnId, event: ClientEvent) {
        match event {
            ClientEvent::JoinRoom { room_id, role } => self.handle_join(conn, room_id, role).await,
            ClientEvent::Signal {
                room_id,
                to,
                signal,
            } => self.handle_signal(conn, room_id, to, signal).await,
            ClientEvent::Frame { to, data } => self.handle_frame(conn, to, data).await,
        }
    }

    /// Tear down a connection: remove it from every room, notify
    /// survivors of a host departure, and forget the session.
    ///
    /// Idempotent: the transport may report closure from multiple code
    /// paths, and only the first call has any effect.
    pub async fn disconnect(&self, conn: &ConnId) {
        self.inner.relay.unregister(conn).await;

        let mut state = self.inner.state.lock().await;
        if state.sessions.remove(conn).is_none() {
            return;
        }

        let effect = state.registry.remove_connection(conn);
        for room_id in effect.host_departed {
            let members = state.registry.members(&room_id);
            self.inner
                .relay
                .broadcast(&members, ServerEvent::HostDisconnected, None)
                .await;
            info!(room = %room_id, conn = %conn, "Host disconnected");
        }
        info!(conn = %conn, "Connection closed");
    }

    /// Get a relay stats snapshot
    pub fn stats(&self) -> RelayStats {
        self.inner.relay.stats()
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.inner.state.lock().await.registry.len()
    }

    /// Snapshot of every live room, for diagnostics
    pub async fn room_summaries(&self) -> Vec<RoomSummary> {
        let state = self.inner.state.lock().await;
        state
            .registry
            .iter()
            .map(|(room_id, room)| RoomSummary {
                room_id: room_id.clone(),
                has_host: room.host().is_some(),
                viewers: room.viewers().len(),
            })
            .collect()
    }

    async fn handle_join(&self, conn: &ConnId, room_id: RoomId, role: Role) {
        let mut state = self.inner.state.lock().await;
        if !state.sessions.contains_key(conn) {
            debug!(conn = %conn, "Join from unknown connection, dropping");
            return;
        }

        // A repeat join while already Joined re-runs the transition
        // unconditionally; leniency inherited from the protocol.
        match role {
            Role::Host => {
                let outcome = state.registry.join_as_host(&room_id, conn);
                if let JoinOutcome::ReplacedHost(prev) = &outcome {
                    info!(room = %room_id, new_host = %conn, displaced = %prev, "Host replaced");
                }
                state.sessions.insert(
                    conn.clone(),
                    SessionState::Joined {
                        role,
                        room_id: room_id.clone(),
                    },
                );

                self.inner
                    .relay
                    .forward(
                        conn,
                        ServerEvent::Joined {
                            role,
                            room_id: room_id.clone(),
                        },
                    )
                    .await;

                let members = state.registry.members(&room_id);
                self.inner
                    .relay
                    .broadcast(&members, ServerEvent::HostReady, Some(conn))
                    .await;
                info!(room = %room_id, conn = %conn, "Host joined");
            }
            Role::Viewer => {
                state.registry.join_as_viewer(&room_id, conn);
                state.sessions.insert(
                    conn.clone(),
                    SessionState::Joined {
                        role,
                        room_id: room_id.clone(),
                    },
                );

                self.inner
                    .relay
                    .forward(
                        conn,
                        ServerEvent::Joined {
                            role,
                            room_id: room_id.clone(),
                        },
                    )
                    .await;

                if let Some(host) = state.registry.current_host(&room_id) {
                    self.inner
                        .relay
                        .forward(
                            &host,
                            ServerEvent::ViewerJoined {
                                viewer_id: conn.clone(),
                            },
                        )
                        .await;
                }
                info!(room = %room_id, conn = %conn, "Viewer joined");
            }
        }
    }

    async fn handle_signal(&self, conn: &ConnId, room_id: RoomId, to: ConnId, signal: Value) {
        // Sender must be joined to the room it names; membership is the
        // only authorization the protocol defines.
        {
            let state = self.inner.state.lock().await;
            match state.sessions.get(conn) {
                Some(SessionState::Joined { room_id: joined, .. }) if *joined == room_id => {}
                _ => {
                    debug!(conn = %conn, room = %room_id, "Signal outside joined room, dropping");
                    return;
                }
            }
        }

        // Routing happens off the registry lock
        self.inner
            .relay
            .forward(
                &to,
                ServerEvent::Signal {
                    from: conn.clone(),
                    signal,
                },
            )
            .await;
    }

    async fn handle_frame(&self, conn: &ConnId, to: ConnId, data: Value) {
        // Hot path: any known connection may relay frames, no registry
        // access needed.
        if !self.inner.relay.is_connected(conn).await {
            debug!(conn = %conn, "Frame from unknown connection, dropping");
            return;
        }

        self.inner
            .relay
            .forward(
                &to,
                ServerEvent::Frame {
                    from: conn.clone(),
                    data,
                },
            )
            .await;
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
