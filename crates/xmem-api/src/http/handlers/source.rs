//! Source config and on-demand sync handlers.
//!
//! Credentials are accepted on write but never serialized back.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use xmem_types::source::{SourceConfig, SyncResult, UpsertSourceConfig};

use crate::http::error::AppError;
use crate::http::extractors::auth::Tenant;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// PUT /api/v1/sources - Create or update the config for one source.
pub async fn upsert_source(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(body): Json<UpsertSourceConfig>,
) -> Result<Json<ApiResponse<SourceConfig>>, AppError> {
    let start = Instant::now();

    let config = state.source_service.upsert(&tenant, body).await?;
    let href = format!("/api/v1/sources/{}", config.source);

    Ok(Json(ApiResponse::success(config, start).with_link("self", &href)))
}

/// GET /api/v1/sources
pub async fn list_sources(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
) -> Result<Json<ApiResponse<Vec<SourceConfig>>>, AppError> {
    let start = Instant::now();
    let configs = state.source_service.list(&tenant).await?;
    Ok(Json(ApiResponse::success(configs, start)))
}

/// GET /api/v1/sources/{source}
pub async fn get_source(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(source): Path<String>,
) -> Result<Json<ApiResponse<SourceConfig>>, AppError> {
    let start = Instant::now();
    let config = state.source_service.get(&tenant, &source).await?;
    Ok(Json(ApiResponse::success(config, start)))
}

/// DELETE /api/v1/sources/{source}
pub async fn delete_source(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(source): Path<String>,
) -> Result<StatusCode, AppError> {
    state.source_service.delete(&tenant, &source).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sync - Sync every enabled source of the caller's tenant now.
///
/// Always 200 once the configs are listed; per-source failures are reported
/// in the results.
pub async fn sync_sources(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
) -> Result<Json<ApiResponse<Vec<SyncResult>>>, AppError> {
    let start = Instant::now();
    let results = state.scheduler.sync_enabled(Some(&tenant)).await?;
    Ok(Json(ApiResponse::success(results, start)))
}
