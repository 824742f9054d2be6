//! Source config repository trait definition.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use xmem_types::error::RepositoryError;
use xmem_types::source::{SourceConfig, UpsertSourceConfig};
use xmem_types::tenant::TenantId;

/// Persistence for per-tenant source configs.
///
/// Writes are upserts keyed by `(tenant_id, source)`, unlike memories and
/// projects which are strict-create.
pub trait SourceConfigRepository: Send + Sync {
    /// Insert, or update in place when `(tenant, source)` already exists.
    /// A newly created config is enabled unless `is_enabled` says otherwise.
    fn upsert(
        &self,
        tenant: &TenantId,
        config: &UpsertSourceConfig,
    ) -> impl std::future::Future<Output = Result<SourceConfig, RepositoryError>> + Send;

    fn get(
        &self,
        tenant: &TenantId,
        source: &str,
    ) -> impl std::future::Future<Output = Result<Option<SourceConfig>, RepositoryError>> + Send;

    fn list(
        &self,
        tenant: &TenantId,
    ) -> impl std::future::Future<Output = Result<Vec<SourceConfig>, RepositoryError>> + Send;

    /// Enabled configs, optionally restricted to one tenant, in a stable
    /// order (tenant, then creation time).
    fn list_enabled(
        &self,
        scope: Option<&TenantId>,
    ) -> impl std::future::Future<Output = Result<Vec<SourceConfig>, RepositoryError>> + Send;

    /// Returns whether a row was removed.
    fn delete(
        &self,
        tenant: &TenantId,
        source: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Stamp `last_sync_at` on exactly one config row.
    fn record_sync(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
