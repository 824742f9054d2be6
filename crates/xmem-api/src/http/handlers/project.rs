//! Project handlers for the REST API.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;

use xmem_types::project::{CreateProjectRequest, Project};

use crate::http::error::AppError;
use crate::http::extractors::auth::Tenant;
use crate::http::handlers::memory::parse_id;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProjectDeleted {
    /// Memories whose project reference was cleared.
    pub detached_memories: u64,
}

/// POST /api/v1/projects
pub async fn create_project(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Project>>), AppError> {
    let start = Instant::now();

    let project = state.project_service.create(&tenant, body).await?;
    let href = format!("/api/v1/projects/{}", project.id);
    let resp = ApiResponse::success(project, start).with_link("self", &href);

    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/projects
pub async fn list_projects(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
) -> Result<Json<ApiResponse<Vec<Project>>>, AppError> {
    let start = Instant::now();
    let projects = state.project_service.list(&tenant).await?;
    Ok(Json(ApiResponse::success(projects, start)))
}

/// GET /api/v1/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Project>>, AppError> {
    let start = Instant::now();
    let id = parse_id(&id)?;
    let project = state.project_service.get(&tenant, &id).await?;
    Ok(Json(ApiResponse::success(project, start)))
}

/// DELETE /api/v1/projects/{id} - Delete a project; its memories are kept.
pub async fn delete_project(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProjectDeleted>>, AppError> {
    let start = Instant::now();
    let id = parse_id(&id)?;
    let detached_memories = state.project_service.delete(&tenant, &id).await?;
    Ok(Json(ApiResponse::success(
        ProjectDeleted { detached_memories },
        start,
    )))
}
