//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/` and require an API key, except `/health`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Memories
        .route(
            "/memories",
            post(handlers::memory::create_memory).get(handlers::memory::list_memories),
        )
        .route(
            "/memories/{id}",
            get(handlers::memory::get_memory)
                .put(handlers::memory::update_memory)
                .delete(handlers::memory::delete_memory),
        )
        .route("/memories/{id}/archive", post(handlers::memory::archive_memory))
        .route("/memories/{id}/restore", post(handlers::memory::restore_memory))
        .route("/search", post(handlers::memory::search))
        // Bulk import
        .route("/import/csv", post(handlers::import::import_csv))
        // Projects
        .route(
            "/projects",
            post(handlers::project::create_project).get(handlers::project::list_projects),
        )
        .route(
            "/projects/{id}",
            get(handlers::project::get_project).delete(handlers::project::delete_project),
        )
        // External sources
        .route(
            "/sources",
            get(handlers::source::list_sources).put(handlers::source::upsert_source),
        )
        .route(
            "/sources/{source}",
            get(handlers::source::get_source).delete(handlers::source::delete_source),
        )
        .route("/sync", post(handlers::source::sync_sources))
        // Observability
        .route("/stats", get(handlers::stats::get_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
