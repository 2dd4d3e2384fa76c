//! `continuityd`: HTTP/JSON server for the narrative continuity engine.
//!
//! Configuration comes from the environment (a `.env` file is honoured):
//!
//! ```bash
//! CONTINUITY_PORT=8300 CONTINUITY_SNAPSHOT=./continuity.json cargo run -p continuity-server
//! ```
//!
//! When `CONTINUITY_SNAPSHOT` is set the store is loaded from that file at
//! start (if it exists) and written back on shutdown.

mod auth;
mod config;
mod error;
mod extract;
mod routes;

use config::ServerConfig;
use continuity_core::{ContinuityEngine, InMemoryStore, StoreSnapshot};
use routes::ServerState;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().map_err(|e| {
        tracing::error!("invalid configuration: {e}");
        e
    })?;

    let store = Arc::new(open_store(config.snapshot.as_deref()).await?);
    let engine = ContinuityEngine::with_config(store.clone(), config.engine.clone());
    let app = routes::router(Arc::new(ServerState::new(engine)));

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!("failed to bind {addr}: {e}");
        e
    })?;
    tracing::info!(%addr, "continuityd listening");

    // Serve with graceful shutdown on SIGTERM/SIGINT.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = &config.snapshot {
        let snapshot = store.snapshot().await;
        snapshot.save_json(path).await?;
        tracing::info!(
            path = %path.display(),
            records = snapshot.record_count(),
            "snapshot saved"
        );
    }
    Ok(())
}

async fn open_store(snapshot: Option<&Path>) -> Result<InMemoryStore, Box<dyn std::error::Error>> {
    match snapshot {
        Some(path) if tokio::fs::try_exists(path).await? => {
            let snapshot = StoreSnapshot::load_json(path).await.map_err(|e| {
                tracing::error!(path = %path.display(), "failed to load snapshot: {e}");
                e
            })?;
            tracing::info!(
                path = %path.display(),
                records = snapshot.record_count(),
                "snapshot loaded"
            );
            Ok(InMemoryStore::from_snapshot(snapshot))
        }
        _ => Ok(InMemoryStore::new()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {e}");
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
    tracing::info!("continuityd shutting down");
}
