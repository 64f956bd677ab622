pub mod health;

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::warn;

use crate::errors::AppError;
use crate::packing::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Pack set registry
        .route(
            "/api/v1/packs",
            get(handlers::handle_list_packs).post(handlers::handle_create_packs),
        )
        .route(
            "/api/v1/packs/:id",
            get(handlers::handle_get_pack).delete(handlers::handle_delete_pack),
        )
        .route(
            "/api/v1/packs/hash/:hash",
            get(handlers::handle_get_pack_by_hash),
        )
        // Packaging calculation
        .route(
            "/api/v1/packaging/number_of_packages",
            get(handlers::handle_number_of_packages),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            timeout_middleware,
        ))
        .with_state(state)
}

/// Bounds every request by `REQUEST_TIMEOUT_SECS`.
async fn timeout_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let limit = Duration::from_secs(state.config.request_timeout_secs);
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!("Request timed out after {}s", limit.as_secs());
            AppError::Timeout.into_response()
        }
    }
}
