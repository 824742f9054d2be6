//! Bulk CSV import handler.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;

use xmem_types::import::ImportSummary;

use crate::http::error::AppError;
use crate::http::extractors::auth::Tenant;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/import/csv - Import the request body (CSV with a header row).
///
/// Row-level failures are reported in the summary; only unreadable input
/// fails the whole request.
pub async fn import_csv(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    body: Bytes,
) -> Result<Json<ApiResponse<ImportSummary>>, AppError> {
    let start = Instant::now();

    if body.is_empty() {
        return Err(AppError::Validation("request body is empty".to_string()));
    }
    let summary = state.importer.import(&tenant, body.as_ref()).await?;
    tracing::info!(
        tenant_id = %tenant,
        imported = summary.imported,
        failed = summary.failed.len(),
        "csv import finished"
    );

    Ok(Json(ApiResponse::success(summary, start)))
}
