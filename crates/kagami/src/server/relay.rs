//! Relay router: resolves connection ids to outbound queues and
//! forwards envelopes verbatim.
//!
//! Every connection has one bounded outbound queue, drained by that
//! connection's writer task. Enqueues here never block, so a stalled
//! socket cannot hold up relay for anyone else; when a queue is full
//! the frame is dropped for that connection only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{ConnId, ServerEvent, DROP_LOG_INTERVAL};

/// Statistics about relay traffic (snapshot from atomic counters)
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    pub connections: usize,
    pub events_relayed: u64,
    pub frames_relayed: u64,
    pub frames_dropped: u64,
}

/// Internal atomic counters for lock-free stats tracking
struct AtomicRelayStats {
    connections: AtomicUsize,
    events_relayed: AtomicU64,
    frames_relayed: AtomicU64,
    frames_dropped: AtomicU64,
}

impl AtomicRelayStats {
    fn new() -> Self {
        Self {
            connections: AtomicUsize::new(0),
            events_relayed: AtomicU64::new(0),
            frames_relayed: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        }
    }

    /// Read all atomics and return a plain RelayStats snapshot
    fn snapshot(&self) -> RelayStats {
        RelayStats {
            connections: self.connections.load(Ordering::Relaxed),
            events_relayed: self.events_relayed.load(Ordering::Relaxed),
            frames_relayed: self.frames_relayed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Relay router. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    /// Outbound queues for live connections
    connections: RwLock<HashMap<ConnId, mpsc::Sender<ServerEvent>>>,
    /// Lock-free atomic stats
    stats: AtomicRelayStats,
}

impl Relay {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                connections: RwLock::new(HashMap::new()),
                stats: AtomicRelayStats::new(),
            }),
        }
    }

    /// Register a connection's outbound queue
    pub async fn register(&self, conn: ConnId, tx: mpsc::Sender<ServerEvent>) {
        let mut connections = self.inner.connections.write().await;
        if connections.insert(conn, tx).is_none() {
            self.inner.stats.connections.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove a connection's outbound queue, cancelling pending sends
    pub async fn unregister(&self, conn: &ConnId) {
        let mut connections = self.inner.connections.write().await;
        if connections.remove(conn).is_some() {
            self.inner.stats.connections.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Whether a connection is currently registered
    pub async fn is_connected(&self, conn: &ConnId) -> bool {
        self.inner.connections.read().await.contains_key(conn)
    }

    /// Forward an envelope to one connection.
    ///
    /// Unknown or already-closed targets are a silent no-op: a departed
    /// viewer racing an in-flight signal is routine churn, and the
    /// sender cannot act on a delivery failure anyway.
    pub async fn forward(&self, target: &ConnId, event: ServerEvent) {
        let tx = self.inner.connections.read().await.get(target).cloned();
        match tx {
            Some(tx) => self.enqueue(target, &tx, event),
            None => debug!(target = %target, "No route for event, dropping"),
        }
    }

    /// Enqueue an envelope to every member of a snapshot except the
    /// excluded connection.
    ///
    /// The membership snapshot is taken by the caller at call time, so
    /// a join landing mid-broadcast is never targeted by it.
    pub async fn broadcast(
        &self,
        members: &[ConnId],
        event: ServerEvent,
        excluding: Option<&ConnId>,
    ) {
        let targets: Vec<(ConnId, mpsc::Sender<ServerEvent>)> = {
            let connections = self.inner.connections.read().await;
            let mut targets = Vec::with_capacity(members.len());
            for member in members {
                if excluding == Some(member) {
                    continue;
                }
                if let Some(tx) = connections.get(member) {
                    targets.push((member.clone(), tx.clone()));
                }
            }
            targets
        };

        for (target, tx) in &targets {
            self.enqueue(target, tx, event.clone());
        }
    }

    /// Get a stats snapshot
    pub fn stats(&self) -> RelayStats {
        self.inner.stats.snapshot()
    }

    fn enqueue(&self, target: &ConnId, tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) {
        let is_frame = matches!(event, ServerEvent::Frame { .. });
        match tx.try_send(event) {
            Ok(()) => {
                let counter = if is_frame {
                    &self.inner.stats.frames_relayed
                } else {
                    &self.inner.stats.events_relayed
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                if is_frame {
                    // Slow consumer: shed its frames, throttle the log
                    let dropped = self
                        .inner
                        .stats
                        .frames_dropped
                        .fetch_add(1, Ordering::Relaxed);
                    if dropped % DROP_LOG_INTERVAL == 0 {
                        warn!(target = %target, dropped = dropped + 1, "Outbound queue full, dropping frames");
                    }
                } else {
                    warn!(target = %target, "Outbound queue full, dropping event");
                }
            }
            Err(TrySendError::Closed(_)) => {
                // Connection torn down between lookup and enqueue
                debug!(target = %target, "Outbound queue closed, dropping event");
            }
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}
