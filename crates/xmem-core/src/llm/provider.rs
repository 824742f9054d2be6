//! LlmProvider trait definition.
//!
//! The abstraction embedding backends implement. Text in, fixed-width
//! vector out; completion is optional.

use xmem_types::error::AdapterError;

/// Trait for embedding / completion backends (OpenAI-compatible, Ollama, ...).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in xmem-infra.
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Embedding model identifier. Part of the embedding cache key.
    fn model_name(&self) -> &str;

    /// Embed a single text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, AdapterError>> + Send;

    /// Complete a prompt. Providers without a completion endpoint keep the
    /// default, which reports `Unsupported`.
    fn complete(
        &self,
        _prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, AdapterError>> + Send {
        async { Err(AdapterError::Unsupported) }
    }
}
