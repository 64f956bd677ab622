mod config;
mod db;
mod errors;
mod models;
mod packing;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::packing::registry::PackSetRegistry;
use crate::packing::store::{MemoryPackSetStore, PackSetStore, PgPackSetStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Packulator API v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    // Pick the pack set store
    let store: Arc<dyn PackSetStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, config.db_max_connections).await?;
            ensure_schema(&pool).await?;
            Arc::new(PgPackSetStore::new(pool))
        }
        None => {
            if config.is_production() {
                warn!("DATABASE_URL not set in production; pack sets will not survive restarts");
            }
            info!("DATABASE_URL not set, using in-memory pack set store");
            Arc::new(MemoryPackSetStore::new())
        }
    };

    info!(
        "Solver limits: {} cells, {} steps; result cache capacity: {}",
        config.solver_max_table_size, config.solver_max_steps, config.result_cache_capacity
    );

    let state = AppState::new(PackSetRegistry::new(store), config.clone());

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = config
        .server_address()
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.server_address()))?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C so in-flight requests can finish.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
