//! Embedding service.
//!
//! Resolves the default `llm` provider on every call, so a default switch in
//! the registry takes effect immediately, and memoizes results by
//! provider/model/normalized-text hash.

use std::sync::Arc;
use std::time::Duration;

use xmem_types::config::EmbeddingConfig;
use xmem_types::error::MemoryError;

use super::cache::{EmbeddingCache, cache_key};
use crate::registry::ProviderRegistry;

pub struct EmbeddingService {
    registry: Arc<ProviderRegistry>,
    cache: EmbeddingCache,
    timeout: Duration,
    dimension: Option<usize>,
}

impl EmbeddingService {
    /// - `dimension`: expected vector width, `None` to accept any width
    pub fn new(
        registry: Arc<ProviderRegistry>,
        cache: EmbeddingCache,
        timeout: Duration,
        dimension: Option<usize>,
    ) -> Self {
        Self {
            registry,
            cache,
            timeout,
            dimension,
        }
    }

    pub fn from_config(registry: Arc<ProviderRegistry>, config: &EmbeddingConfig) -> Self {
        Self::new(
            registry,
            EmbeddingCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.cache_max_entries,
            ),
            Duration::from_secs(config.timeout_secs),
            (config.dimension > 0).then_some(config.dimension),
        )
    }

    /// Expected embedding width, if one is configured.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Embed `text` with the default `llm` provider.
    ///
    /// Fails `EmbeddingTimeout` when the provider exceeds the configured
    /// timeout and `BackendUnavailable` on any provider error.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let provider = self.registry.resolve_llm(None)?;
        let key = cache_key(provider.name(), provider.model_name(), text);

        if let Some(vector) = self.cache.get(&key) {
            tracing::debug!(provider = provider.name(), "embedding cache hit");
            return Ok(vector);
        }

        let vector = match tokio::time::timeout(self.timeout, provider.embed(text)).await {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => {
                tracing::warn!(provider = provider.name(), error = %e, "embedding failed");
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(
                    provider = provider.name(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "embedding timed out"
                );
                return Err(MemoryError::EmbeddingTimeout);
            }
        };

        if vector.is_empty() {
            return Err(MemoryError::BackendUnavailable(
                "provider returned an empty embedding".to_string(),
            ));
        }

        self.cache.insert(key, &vector);
        Ok(vector)
    }

    /// Reject vectors whose width differs from the configured dimension.
    pub fn check_dimension(&self, vector: &[f32]) -> Result<(), MemoryError> {
        match self.dimension {
            Some(expected) if vector.len() != expected => Err(MemoryError::Validation(format!(
                "embedding dimension {} does not match configured dimension {expected}",
                vector.len()
            ))),
            _ => Ok(()),
        }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}
