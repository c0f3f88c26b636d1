//! Server module: room registry, relay router, session coordinator.
//!
//! The registry is the only shared mutable state in the system; the
//! coordinator owns it behind a single lock and drives the relay, so
//! room-level notifications for one room are observed in the order
//! they were issued.

mod registry;
mod relay;
mod session;

pub use registry::{JoinOutcome, Registry, RemovalEffect, Room};
pub use relay::{Relay, RelayStats};
pub use session::{Coordinator, RoomSummary};
