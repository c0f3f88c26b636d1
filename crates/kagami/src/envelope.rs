//! Wire envelopes exchanged between a connection and the core.
//!
//! Messages are JSON, tagged by a `type` field with kebab-case names
//! and camelCase payload fields:
//!
//! ```text
//! client → server: join-room {roomId, role}
//!                  signal    {roomId, to, signal}
//!                  frame     {to, data}
//! server → client: joined    {role, roomId}
//!                  host-ready
//!                  viewer-joined {viewerId}
//!                  signal    {from, signal}
//!                  frame     {from, data}
//!                  host-disconnected
//! ```
//!
//! The `signal` and `data` payloads are opaque: the core forwards them
//! verbatim and never inspects or validates their contents. That is
//! the negotiation/codec layer's job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ConnId, Role, RoomId};

/// Inbound event from a connection.
///
/// The implicit fourth event, disconnect, has no payload; it is
/// derived from transport-level close and handled by the coordinator
/// directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join (or lazily create) a room as host or viewer
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId, role: Role },
    /// Negotiation payload addressed to one connection
    #[serde(rename_all = "camelCase")]
    Signal {
        room_id: RoomId,
        to: ConnId,
        signal: Value,
    },
    /// Payload frame addressed to one connection; the high-rate path
    Frame { to: ConnId, data: Value },
}

/// Outbound event to a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Join acknowledgment, sent to the joiner itself
    #[serde(rename_all = "camelCase")]
    Joined { role: Role, room_id: RoomId },
    /// Broadcast to a room when a host joins it
    HostReady,
    /// Sent to the host when a viewer joins its room
    #[serde(rename_all = "camelCase")]
    ViewerJoined { viewer_id: ConnId },
    /// Forwarded negotiation payload, `from` rewritten to the sender
    Signal { from: ConnId, signal: Value },
    /// Forwarded payload frame, `from` rewritten to the sender
    Frame { from: ConnId, data: Value },
    /// Broadcast to a room's survivors when its host disconnects
    HostDisconnected,
}
