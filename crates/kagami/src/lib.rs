//! Kagami — signaling and relay core for remote screen viewing
//!
//! Coordinates transient bidirectional connections into named rooms,
//! each with at most one host (the screen source) and any number of
//! viewers, and relays two kinds of traffic between them:
//!
//! - connection-negotiation envelopes (`signal`), forwarded opaque
//! - high-rate payload frames (`frame`), forwarded opaque
//!
//! The crate does not capture screens, encode video, or inject input;
//! those live behind the payloads it never inspects.
//!
//! - **Core types** (crate root): `ConnId`, `RoomId`, `Role`, the
//!   `ClientEvent`/`ServerEvent` envelopes, protocol constants
//! - **`server`**: room registry, relay router, session coordinator
//! - **`web`**: axum HTTP + WebSocket transport adapter

mod envelope;
mod ids;
mod protocol;

pub use envelope::{ClientEvent, ServerEvent};
pub use ids::{ConnId, Role, RoomId};
pub use protocol::*;

// Server: registry, relay, session coordinator
pub mod server;

// Web: axum HTTP server, WebSocket adapter
pub mod web;
