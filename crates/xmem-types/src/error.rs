use thiserror::Error;

use crate::provider::ProviderRole;

/// Errors surfaced by the retrieval engine and its batch callers.
///
/// Every variant has a stable machine-readable [`kind`](MemoryError::kind).
/// `NotFound` is returned both for absent ids and for ids owned by another
/// tenant so callers cannot learn whether it exists.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("no default provider for role '{0}'")]
    NoDefaultProvider(ProviderRole),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("embedding timed out")]
    EmbeddingTimeout,

    #[error("source config conflict: {0}")]
    SourceConfigConflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl MemoryError {
    /// Machine-readable error code.
    pub fn kind(&self) -> &'static str {
        match self {
            MemoryError::Validation(_) => "VALIDATION_ERROR",
            MemoryError::NotFound => "NOT_FOUND",
            MemoryError::Unauthorized => "UNAUTHORIZED",
            MemoryError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            MemoryError::NoDefaultProvider(_) => "NO_DEFAULT_PROVIDER",
            MemoryError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            MemoryError::EmbeddingTimeout => "EMBEDDING_TIMEOUT",
            MemoryError::SourceConfigConflict(_) => "SOURCE_CONFIG_CONFLICT",
            MemoryError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Short message safe to show to an end user.
    ///
    /// Backend and storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            MemoryError::BackendUnavailable(_) => "backend unavailable".to_string(),
            MemoryError::Storage(_) => "storage error".to_string(),
            MemoryError::UnknownProvider(_) => "unknown provider".to_string(),
            other => other.to_string(),
        }
    }
}

/// Errors from repository operations (used by trait definitions in xmem-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for MemoryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => MemoryError::NotFound,
            RepositoryError::Conflict(msg) => MemoryError::Validation(msg),
            other => MemoryError::Storage(other.to_string()),
        }
    }
}

/// Errors from vector-store and LLM adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("backend unreachable: {0}")]
    Unavailable(String),

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),

    #[error("operation not supported by this adapter")]
    Unsupported,

    #[error("backend call timed out")]
    Timeout,
}

impl From<AdapterError> for MemoryError {
    fn from(err: AdapterError) -> Self {
        MemoryError::BackendUnavailable(err.to_string())
    }
}

/// Errors from the provider registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown provider '{name}' for role '{role}'")]
    UnknownProvider { role: ProviderRole, name: String },

    #[error("no default provider for role '{0}'")]
    NoDefaultProvider(ProviderRole),

    #[error("provider registered for role '{actual}' cannot be used as '{expected}'")]
    RoleMismatch {
        expected: ProviderRole,
        actual: ProviderRole,
    },
}

impl From<RegistryError> for MemoryError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownProvider { name, .. } => MemoryError::UnknownProvider(name),
            RegistryError::NoDefaultProvider(role) => MemoryError::NoDefaultProvider(role),
            other => MemoryError::Validation(other.to_string()),
        }
    }
}

/// Errors reading tabular import input.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed input at record {record}: {message}")]
    Malformed { record: usize, message: String },

    #[error("input has no header row")]
    MissingHeader,

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Errors from an external source connector.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid credential for source '{0}'")]
    InvalidCredential(String),

    #[error("invalid source config: {0}")]
    InvalidConfig(String),

    #[error("no connector for source '{0}'")]
    NoConnector(String),

    #[error("sync timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
