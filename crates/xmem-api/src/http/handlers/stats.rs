//! Collection stats handler.
//!
//! Provider names stay off the REST surface; `xmem provider list` shows them
//! to operators.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use xmem_types::vector::CollectionStats;

use crate::http::error::AppError;
use crate::http::extractors::auth::Tenant;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// `delegated` or `in_process`.
    pub retrieval_path: &'static str,
    pub collection: CollectionStats,
    pub embedding_cache_entries: usize,
}

/// GET /api/v1/stats - Counts for the caller's collection.
pub async fn get_stats(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
) -> Result<Json<ApiResponse<StatsResponse>>, AppError> {
    let start = Instant::now();

    let collection = state.memory_service.collection_stats(&tenant).await?;
    let stats = StatsResponse {
        retrieval_path: state.memory_service.active_path()?,
        collection,
        embedding_cache_entries: state.memory_service.embeddings().cache().len(),
    };

    Ok(Json(ApiResponse::success(stats, start)))
}
