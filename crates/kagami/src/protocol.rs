//! Protocol constants for Kagami

/// Default port for the web/WebSocket endpoint
pub const DEFAULT_WEB_PORT: u16 = 3400;

/// Per-connection outbound queue depth.
///
/// When a slow connection's queue fills, further frames to it are
/// dropped rather than stalling the coordinator.
pub const OUTBOUND_QUEUE_DEPTH: usize = 256;

/// Maximum accepted inbound message size (16 MB, generous for
/// base64-encoded screen frames)
pub const MAX_EVENT_SIZE: usize = 16 * 1024 * 1024;

/// Log one warning per this many dropped frames on a congested connection
pub const DROP_LOG_INTERVAL: u64 = 100;
