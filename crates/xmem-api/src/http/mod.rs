//! HTTP/REST API layer for xmem.
//!
//! Axum-based REST API at `/api/v1/` with API key to tenant resolution,
//! envelope response format, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
