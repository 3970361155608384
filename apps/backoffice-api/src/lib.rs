//! # Multas Back-Office API
//!
//! HTTP API behind the React back office of a traffic-fine appeal service.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Back-Office API Process                            │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │  routes.rs (axum Router)                                          │ │
//! │  │  /services  /charges  /webhooks  /split-preview  /health          │ │
//! │  └──────────────────────────────┬────────────────────────────────────┘ │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │  commands/ (validation, viability policy, DTOs)                   │ │
//! │  └──────────────────────────────┬────────────────────────────────────┘ │
//! │                                 │                                       │
//! │              ┌──────────────────┴───────────────────┐                   │
//! │              ▼                                      ▼                   │
//! │  ┌───────────────────────┐              ┌────────────────────────────┐ │
//! │  │  multas-core          │              │  multas-db                 │ │
//! │  │  Money, SplitConfig,  │              │  SQLite (WAL), repositories│ │
//! │  │  validation           │              │  webhook outbox            │ │
//! │  └───────────────────────┘              └────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize logging (tracing)
//! 2. Load configuration from the environment
//! 3. Open the SQLite pool, run migrations, purge old delivered webhooks
//! 4. Serve until Ctrl+C / SIGTERM, then close the pool

pub mod commands;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use multas_db::{Database, DbConfig};

use crate::config::ApiConfig;
use crate::state::AppState;

/// Delivered outbox rows older than this are deleted at startup.
const DELIVERED_WEBHOOK_RETENTION_DAYS: u32 = 30;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=multas=trace` - Show trace for multas crates only
/// - Default: `info,multas=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,multas=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Runs the API until a shutdown signal arrives.
pub async fn run() -> anyhow::Result<()> {
    let config = ApiConfig::load()?;
    info!(
        port = config.http_port,
        db_path = %config.db_path,
        environment = %config.environment,
        policy = ?config.viability_policy(),
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.db_path)).await?;

    let purged = db
        .webhook_outbox()
        .cleanup_delivered(DELIVERED_WEBHOOK_RETENTION_DAYS)
        .await?;
    if purged > 0 {
        info!(purged, "Purged old delivered webhooks");
    }

    let bind_addr = config.bind_address();
    let state = AppState::new(db.clone(), config);
    let app = routes::router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Back-office API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
