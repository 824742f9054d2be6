//! Build a [`ProviderRegistry`] from configuration.
//!
//! Registers the configured embedding provider under the `llm` role and the
//! configured vector backend (if any) under the `vector` role. Each becomes
//! the default for its role. Misconfiguration fails here, at startup, rather
//! than on the first request.

use std::time::Duration;

use xmem_core::llm::box_provider::BoxLlmProvider;
use xmem_core::registry::{ProviderHandle, ProviderRegistry};
use xmem_core::vector::box_store::BoxVectorStore;
use xmem_types::config::{EmbeddingConfig, GlobalConfig, VectorConfig};
use xmem_types::error::AdapterError;
use xmem_types::provider::ProviderRole;

use crate::config::secret_from_env;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAiProvider;
use crate::vector::chroma::ChromaStore;
use crate::vector::document::DocumentStore;
use crate::vector::memory::InMemoryVectorStore;
use crate::vector::pinecone::PineconeStore;
use crate::vector::qdrant::QdrantStore;

/// Build and populate a registry.
pub fn build_registry(config: &GlobalConfig) -> Result<ProviderRegistry, AdapterError> {
    let registry = ProviderRegistry::new();

    let llm = llm_provider(&config.embedding)?;
    registry
        .register_provider(ProviderRole::Llm, config.embedding.provider.clone(), ProviderHandle::llm(llm))
        .map_err(|e| AdapterError::InvalidConfig(e.to_string()))?;

    if let Some(store) = vector_store(&config.vector)? {
        registry
            .register_provider(ProviderRole::Vector, config.vector.provider.clone(), ProviderHandle::vector(store))
            .map_err(|e| AdapterError::InvalidConfig(e.to_string()))?;
    }

    Ok(registry)
}

fn llm_provider(config: &EmbeddingConfig) -> Result<BoxLlmProvider, AdapterError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.provider.as_str() {
        "openai" => {
            let key = secret_from_env(&config.api_key_env);
            if key.is_none() {
                tracing::warn!(env = %config.api_key_env, "embedding api key not set");
            }
            let provider = OpenAiProvider::new(&config.base_url, key, &config.model, timeout)?;
            Ok(BoxLlmProvider::new(provider))
        }
        "ollama" => Ok(BoxLlmProvider::new(OllamaProvider::new(
            &config.base_url,
            &config.model,
            timeout,
        )?)),
        other => Err(AdapterError::InvalidConfig(format!(
            "unknown embedding provider '{other}'"
        ))),
    }
}

fn vector_store(config: &VectorConfig) -> Result<Option<BoxVectorStore>, AdapterError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let key = secret_from_env(&config.api_key_env);
    let store = match config.provider.as_str() {
        "none" | "" => return Ok(None),
        "memory" => BoxVectorStore::new(InMemoryVectorStore::new()),
        "qdrant" => BoxVectorStore::new(QdrantStore::new(&config.url, key, timeout)?),
        "chroma" => BoxVectorStore::new(ChromaStore::new(&config.url, key, timeout)?),
        "pinecone" => BoxVectorStore::new(PineconeStore::new(
            &config.url,
            &config.index,
            &config.environment,
            key,
            timeout,
        )?),
        "document" => BoxVectorStore::new(DocumentStore::new(
            &config.url,
            &config.environment,
            key,
            timeout,
        )?),
        other => {
            return Err(AdapterError::InvalidConfig(format!(
                "unknown vector provider '{other}'"
            )));
        }
    };
    Ok(Some(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_registers_llm_only() {
        let registry = build_registry(&GlobalConfig::default()).unwrap();
        assert_eq!(registry.default_name(ProviderRole::Llm).as_deref(), Some("openai"));
        assert!(registry.default_name(ProviderRole::Vector).is_none());
    }

    #[test]
    fn test_memory_vector_store_registered_as_default() {
        let mut config = GlobalConfig::default();
        config.vector.provider = "memory".to_string();
        let registry = build_registry(&config).unwrap();
        let store = registry.resolve_vector(None).unwrap();
        assert_eq!(store.name(), "memory");
        assert!(registry.list(ProviderRole::Vector)[0].is_default);
    }

    #[test]
    fn test_unknown_providers_fail_at_startup() {
        let mut config = GlobalConfig::default();
        config.vector.provider = "weaviate".to_string();
        assert!(matches!(build_registry(&config), Err(AdapterError::InvalidConfig(_))));

        let mut config = GlobalConfig::default();
        config.embedding.provider = "magic".to_string();
        assert!(matches!(build_registry(&config), Err(AdapterError::InvalidConfig(_))));
    }

    #[test]
    fn test_pinecone_without_key_fails() {
        let mut config = GlobalConfig::default();
        config.vector.provider = "pinecone".to_string();
        config.vector.url = "http://localhost:5080".to_string();
        config.vector.api_key_env = "XMEM_TEST_SURELY_UNSET_VARIABLE".to_string();
        assert!(build_registry(&config).is_err());
    }

    #[test]
    fn test_qdrant_registered_with_url() {
        let mut config = GlobalConfig::default();
        config.embedding.provider = "ollama".to_string();
        config.vector.provider = "qdrant".to_string();
        config.vector.url = "http://localhost:6333".to_string();
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.resolve_vector(None).unwrap().name(), "qdrant");
        assert_eq!(registry.resolve_llm(None).unwrap().name(), "ollama");
    }
}
