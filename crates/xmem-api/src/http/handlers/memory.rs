//! Memory CRUD and search handlers for the REST API.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use xmem_types::memory::{
    CreateMemoryRequest, Memory, SearchRequest, SearchResult, UpdateMemoryRequest,
};

use crate::http::error::AppError;
use crate::http::extractors::auth::Tenant;
use crate::http::extractors::query::MemoryListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Parse a path id. A malformed id can never name a memory.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid id '{raw}'")))
}

/// POST /api/v1/memories - Create a memory.
pub async fn create_memory(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(body): Json<CreateMemoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Memory>>), AppError> {
    let start = Instant::now();

    let memory = state.memory_service.create(&tenant, body).await?;
    let href = format!("/api/v1/memories/{}", memory.id);
    let resp = ApiResponse::success(memory, start).with_link("self", &href);

    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/memories - List the tenant's memories, newest first.
pub async fn list_memories(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Query(query): Query<MemoryListQuery>,
) -> Result<Json<ApiResponse<Vec<Memory>>>, AppError> {
    let start = Instant::now();

    let filter = query.into_filter()?;
    let memories = state.memory_service.list(&tenant, &filter).await?;

    Ok(Json(
        ApiResponse::success(memories, start).with_link("self", "/api/v1/memories"),
    ))
}

/// GET /api/v1/memories/{id}
pub async fn get_memory(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Memory>>, AppError> {
    let start = Instant::now();

    let id = parse_id(&id)?;
    let memory = state.memory_service.get(&tenant, &id).await?;

    Ok(Json(ApiResponse::success(memory, start)))
}

/// PUT /api/v1/memories/{id} - Partial update; absent fields are kept.
pub async fn update_memory(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
    Json(body): Json<UpdateMemoryRequest>,
) -> Result<Json<ApiResponse<Memory>>, AppError> {
    let start = Instant::now();

    let id = parse_id(&id)?;
    let memory = state.memory_service.update(&tenant, &id, body).await?;

    Ok(Json(ApiResponse::success(memory, start)))
}

/// DELETE /api/v1/memories/{id}
pub async fn delete_memory(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    state.memory_service.delete(&tenant, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/memories/{id}/archive
pub async fn archive_memory(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Memory>>, AppError> {
    let start = Instant::now();

    let id = parse_id(&id)?;
    let memory = state.memory_service.set_archived(&tenant, &id, true).await?;

    Ok(Json(ApiResponse::success(memory, start)))
}

/// POST /api/v1/memories/{id}/restore
pub async fn restore_memory(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Memory>>, AppError> {
    let start = Instant::now();

    let id = parse_id(&id)?;
    let memory = state.memory_service.set_archived(&tenant, &id, false).await?;

    Ok(Json(ApiResponse::success(memory, start)))
}

/// POST /api/v1/search - Semantic search over the tenant's memories.
pub async fn search(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(body): Json<SearchRequest>,
) -> Result<Json<ApiResponse<Vec<SearchResult>>>, AppError> {
    let start = Instant::now();

    let results = state.memory_service.search(&tenant, &body).await?;
    tracing::debug!(tenant_id = %tenant, hits = results.len(), "search served");

    Ok(Json(ApiResponse::success(results, start)))
}
