//! `aura-server` entry point.
//!
//! Loads `AuraConfig`, opens the SQLite store and serves the HTTP API until
//! Ctrl+C.

use std::sync::Arc;

use anyhow::Context;
use aura_server::{AppState, AuraConfig, router};
use aura_store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("aura-server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = AuraConfig::load().context("failed to load configuration")?;

    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("failed to open store at {}", db_path.display()))?;
    tracing::info!("Store at {}", db_path.display());

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, Arc::new(store));

    if state.models.config().api_key.is_none() {
        tracing::warn!(
            api_key_env = %state.config.audit.api_key_env,
            "no model API key; audits will report CONFIGURATION_MISSING"
        );
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("aura-server exiting cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Signal received, shutting down");
}
