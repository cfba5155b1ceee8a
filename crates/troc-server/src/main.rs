//! # troc-server
//!
//! HTTP front end for the Troc barter marketplace.
//!
//! This binary provides:
//! - **REST API** (axum) for items, likes, matches, trade conversations,
//!   messages and notifications
//! - **Session registry** mapping bearer tokens issued through the admin API
//!   to user ids
//! - **Background reconcile sweep** that completes trades whose parties both
//!   accepted but whose promotion never ran

mod api;
mod config;
mod error;
mod sessions;

use std::time::Duration;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use troc_engine::reconcile_sweep;
use troc_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,troc_server=debug")),
        )
        .init();

    info!("Starting Troc server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        instance = %config.instance_name,
        http_addr = %config.http_addr,
        admin_enabled = config.admin_token.is_some(),
        reconcile_interval_secs = config.reconcile_interval_secs,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the store
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database ready");
    }

    let http_addr = config.http_addr;
    let interval_secs = config.reconcile_interval_secs;
    let app_state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Spawn the reconcile sweep
    // -----------------------------------------------------------------------
    if interval_secs > 0 {
        let db = app_state.db.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                let Ok(guard) = db.lock() else {
                    warn!("Database lock poisoned, stopping reconcile sweep");
                    break;
                };
                match reconcile_sweep(&guard) {
                    Ok(0) => debug!("Reconcile sweep found nothing to do"),
                    Ok(n) => info!(completed = n, "Reconcile sweep completed trades"),
                    Err(e) => warn!(error = %e, "Reconcile sweep failed"),
                }
            }
        });
    }

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
