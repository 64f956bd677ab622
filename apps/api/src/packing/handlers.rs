use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pack_set::{CalculateQuery, CalculationResult, CreatePacksRequest, PackSet};
use crate::packing::calculator::calculate;
use crate::state::AppState;

/// POST /api/v1/packs
/// 201 when the catalog is new, 200 when an identical catalog already existed.
pub async fn handle_create_packs(
    State(state): State<AppState>,
    req: Result<Json<CreatePacksRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PackSet>), AppError> {
    let Json(req) = req?;
    let registered = state.registry.create_or_reuse(&req.packs).await?;
    let status = if registered.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(registered.pack_set)))
}

/// GET /api/v1/packs
pub async fn handle_list_packs(
    State(state): State<AppState>,
) -> Result<Json<Vec<PackSet>>, AppError> {
    Ok(Json(state.registry.list().await?))
}

/// GET /api/v1/packs/:id
pub async fn handle_get_pack(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<PackSet>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.registry.get(id).await?))
}

/// GET /api/v1/packs/hash/:hash
pub async fn handle_get_pack_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<PackSet>, AppError> {
    Ok(Json(state.registry.get_by_hash(&hash).await?))
}

/// DELETE /api/v1/packs/:id
pub async fn handle_delete_pack(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    state.registry.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/packaging/number_of_packages?amount=&packs_hash=
pub async fn handle_number_of_packages(
    State(state): State<AppState>,
    params: Result<Query<CalculateQuery>, QueryRejection>,
) -> Result<Json<CalculationResult>, AppError> {
    let Query(params) = params?;
    if params.packs_hash.trim().is_empty() {
        return Err(AppError::Validation("packs_hash must not be empty".to_string()));
    }

    let result = calculate(
        &state.registry,
        &state.cache,
        state.config.solver_limits(),
        params.amount,
        &params.packs_hash,
    )
    .await?;
    Ok(Json(result))
}
