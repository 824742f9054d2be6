//! Source configuration service.

use xmem_types::error::{MemoryError, RepositoryError};
use xmem_types::source::{SourceConfig, UpsertSourceConfig};
use xmem_types::tenant::TenantId;

use crate::repository::source::SourceConfigRepository;

const MAX_SOURCE_NAME_LENGTH: usize = 64;

pub struct SourceConfigService<S: SourceConfigRepository> {
    sources: S,
}

impl<S: SourceConfigRepository> SourceConfigService<S> {
    pub fn new(sources: S) -> Self {
        Self { sources }
    }

    /// Create or update the config for `(tenant, source)`.
    pub async fn upsert(
        &self,
        tenant: &TenantId,
        mut request: UpsertSourceConfig,
    ) -> Result<SourceConfig, MemoryError> {
        request.source = normalize_source(&request.source)?;
        if let Some(url) = request.webhook_url.as_deref() {
            let url = url.trim();
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(MemoryError::Validation(format!(
                    "webhook url must be http(s): '{url}'"
                )));
            }
            request.webhook_url = Some(url.to_string());
        }
        if request.sync_interval_secs == Some(0) {
            return Err(MemoryError::Validation(
                "sync interval must be at least one second".to_string(),
            ));
        }

        let config = self
            .sources
            .upsert(tenant, &request)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => MemoryError::SourceConfigConflict(msg),
                other => other.into(),
            })?;
        tracing::info!(tenant_id = %tenant, source = %config.source, "source config saved");
        Ok(config)
    }

    pub async fn get(&self, tenant: &TenantId, source: &str) -> Result<SourceConfig, MemoryError> {
        let source = normalize_source(source)?;
        self.sources
            .get(tenant, &source)
            .await?
            .ok_or(MemoryError::NotFound)
    }

    pub async fn list(&self, tenant: &TenantId) -> Result<Vec<SourceConfig>, MemoryError> {
        Ok(self.sources.list(tenant).await?)
    }

    pub async fn delete(&self, tenant: &TenantId, source: &str) -> Result<(), MemoryError> {
        let source = normalize_source(source)?;
        if !self.sources.delete(tenant, &source).await? {
            return Err(MemoryError::NotFound);
        }
        Ok(())
    }
}

/// Source names are lowercase identifiers: `[a-z0-9_-]`.
fn normalize_source(source: &str) -> Result<String, MemoryError> {
    let source = source.trim().to_lowercase();
    if source.is_empty() || source.len() > MAX_SOURCE_NAME_LENGTH {
        return Err(MemoryError::Validation(format!(
            "source name must be 1 to {MAX_SOURCE_NAME_LENGTH} characters"
        )));
    }
    if !source
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(MemoryError::Validation(format!(
            "invalid source name '{source}'"
        )));
    }
    Ok(source)
}
