//! Kagami Server — headless signaling and relay server
//!
//! Accepts participant connections over WebSocket, tracks who plays
//! which role in which room, and relays negotiation signals and
//! payload frames between peers.
//!
//! ## Usage
//!
//! ```bash
//! # Start server (WebSocket + API on port 3400)
//! kagami-server
//!
//! # Custom port
//! KAGAMI_WEB_PORT=8080 kagami-server
//! ```

use std::net::SocketAddr;

use anyhow::Result;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use kagami::server::Coordinator;
use kagami::DEFAULT_WEB_PORT;

/// Server configuration from environment
struct Config {
    web_port: u16,
    stats_interval_secs: u64,
}

impl Config {
    fn from_env() -> Self {
        let web_port: u16 = std::env::var("KAGAMI_WEB_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_WEB_PORT);

        let stats_interval_secs: u64 = std::env::var("KAGAMI_STATS_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            web_port,
            stats_interval_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env();

    info!("Kagami Server starting");
    info!("  Web port: {}", config.web_port);
    info!("  Stats interval: {}s", config.stats_interval_secs);

    let coordinator = Coordinator::new();

    // Graceful shutdown
    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();

    // Spawn web server
    let web_coordinator = coordinator.clone();
    let web_bind = SocketAddr::from(([0, 0, 0, 0], config.web_port));
    let web_cancel = cancel.clone();
    tracker.spawn(async move {
        tokio::select! {
            result = kagami::web::start(web_coordinator, web_bind) => {
                if let Err(e) = result {
                    error!("Web server error: {}", e);
                }
            }
            _ = web_cancel.cancelled() => {
                info!("Web server: shutting down");
            }
        }
    });

    tracker.close();

    run_headless(coordinator, config.stats_interval_secs, cancel, tracker).await
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kagami=info".parse().unwrap()),
        )
        .init();
}

/// Headless mode: log stats periodically, shut down on ctrl-c
async fn run_headless(
    coordinator: Coordinator,
    stats_interval_secs: u64,
    cancel: CancellationToken,
    tracker: TaskTracker,
) -> Result<()> {
    info!("Waiting for connections...");
    let mut stats_interval = interval(Duration::from_secs(stats_interval_secs));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                cancel.cancel();
                break;
            }
            _ = stats_interval.tick() => {
                let stats = coordinator.stats();
                let rooms = coordinator.room_count().await;
                info!(
                    "Stats: {} rooms, {} connections, {} events, {} frames relayed, {} dropped",
                    rooms, stats.connections, stats.events_relayed,
                    stats.frames_relayed, stats.frames_dropped
                );
            }
        }
    }

    if tokio::time::timeout(Duration::from_secs(5), tracker.wait())
        .await
        .is_err()
    {
        warn!("Shutdown timed out after 5s");
    }
    Ok(())
}
