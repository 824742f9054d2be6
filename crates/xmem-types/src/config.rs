//! Global configuration types for xmem.
//!
//! `GlobalConfig` represents the top-level `config.toml` in the data
//! directory. Every field has a default so an empty file is valid. Secrets
//! are never stored here: adapters name the environment variable that holds
//! their credential.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    /// Static API key to tenant bindings for the REST surface.
    #[serde(default)]
    pub api_keys: Vec<ApiKeyBinding>,
}

/// Which embedding backend to talk to, and how the service caches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,
    /// Expected vector width. `0` disables the check.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    1000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            api_key_env: default_embedding_key_env(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

/// Vector backend selection.
///
/// `provider` is one of `none`, `memory`, `qdrant`, `chroma`, `pinecone`,
/// `document`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "default_vector_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key_env: String,
    /// Managed-index name.
    #[serde(default)]
    pub index: String,
    /// Managed-index environment, or the keyspace for the document store.
    #[serde(default)]
    pub environment: String,
    #[serde(default = "default_vector_timeout")]
    pub timeout_secs: u64,
}

fn default_vector_provider() -> String {
    "none".to_string()
}

fn default_vector_timeout() -> u64 {
    10
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            provider: default_vector_provider(),
            url: String::new(),
            api_key_env: String::new(),
            index: String::new(),
            environment: String::new(),
            timeout_secs: default_vector_timeout(),
        }
    }
}

/// Which search path the engine takes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Delegate when a default vector provider is registered, else scan.
    #[default]
    Auto,
    /// Always delegate; fails if no vector provider is registered.
    Delegated,
    /// Always compute cosine similarity over the relational store.
    InProcess,
}

/// Retrieval engine bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub strategy: RetrievalStrategy,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
    #[serde(default = "default_max_tag_length")]
    pub max_tag_length: usize,
    /// Upper bound on any single vector backend call.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_secs: u64,
}

fn default_top_k() -> usize {
    10
}

fn default_max_top_k() -> usize {
    100
}

fn default_max_content_length() -> usize {
    10_000
}

fn default_max_tags() -> usize {
    32
}

fn default_max_tag_length() -> usize {
    64
}

fn default_adapter_timeout() -> u64 {
    15
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: RetrievalStrategy::default(),
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            max_content_length: default_max_content_length(),
            max_tags: default_max_tags(),
            max_tag_length: default_max_tag_length(),
            adapter_timeout_secs: default_adapter_timeout(),
        }
    }
}

/// Tabular import settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Columns treated as metadata; every other column becomes content.
    /// Compared case-sensitively against the header row.
    #[serde(default = "default_metadata_fields")]
    pub metadata_fields: Vec<String>,
    /// Metadata columns split into a list on `list_delimiter`.
    #[serde(default = "default_list_fields")]
    pub list_fields: Vec<String>,
    #[serde(default = "default_list_delimiter")]
    pub list_delimiter: String,
    #[serde(default = "default_row_timeout")]
    pub row_timeout_secs: u64,
}

fn default_metadata_fields() -> Vec<String> {
    ["title", "category", "tags", "description", "source", "author", "date"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_list_fields() -> Vec<String> {
    vec!["tags".to_string()]
}

fn default_list_delimiter() -> String {
    ",".to_string()
}

fn default_row_timeout() -> u64 {
    30
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            metadata_fields: default_metadata_fields(),
            list_fields: default_list_fields(),
            list_delimiter: default_list_delimiter(),
            row_timeout_secs: default_row_timeout(),
        }
    }
}

/// Source sync scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_source_timeout() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    60
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_timeout_secs: default_source_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// Maps the SHA-256 of an API key to the tenant it authenticates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyBinding {
    /// Lowercase hex SHA-256 of the plaintext key.
    pub key_sha256: String,
    pub tenant_id: String,
}
