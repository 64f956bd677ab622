use axum::{extract::State, Json};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// GET /health
/// Reports "degraded" when the pack set store does not answer.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    let database = match state.registry.health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            warn!("Health check failed: {e}");
            "error"
        }
    };

    Json(HealthStatus {
        status: if database == "ok" { "ok" } else { "degraded" },
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}
