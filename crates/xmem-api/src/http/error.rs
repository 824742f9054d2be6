//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use xmem_types::error::{ImportError, MemoryError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Retrieval engine errors.
    Memory(MemoryError),
    /// Tabular input that could not be read at all.
    Import(ImportError),
    /// Authentication failure.
    Unauthorized(String),
    /// Request validation error raised before reaching a service.
    Validation(String),
}

impl From<MemoryError> for AppError {
    fn from(e: MemoryError) -> Self {
        AppError::Memory(e)
    }
}

impl From<ImportError> for AppError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::Memory(inner) => AppError::Memory(inner),
            other => AppError::Import(other),
        }
    }
}

impl AppError {
    /// Status, machine-readable code and end-user message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Memory(e) => {
                let status = match e {
                    MemoryError::Validation(_) => StatusCode::BAD_REQUEST,
                    MemoryError::NotFound => StatusCode::NOT_FOUND,
                    MemoryError::Unauthorized => StatusCode::UNAUTHORIZED,
                    MemoryError::SourceConfigConflict(_) => StatusCode::CONFLICT,
                    MemoryError::UnknownProvider(_)
                    | MemoryError::NoDefaultProvider(_)
                    | MemoryError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    MemoryError::EmbeddingTimeout => StatusCode::GATEWAY_TIMEOUT,
                    MemoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind(), e.public_message())
            }
            AppError::Import(e) => (StatusCode::BAD_REQUEST, "MALFORMED_INPUT", e.to_string()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            // Full detail stays in the logs; the body only carries the public message.
            tracing::warn!(code, error = ?self, "request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
