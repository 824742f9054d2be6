//! Embedding service: the active LLM provider behind a memoizing cache.

pub mod cache;
pub mod service;
