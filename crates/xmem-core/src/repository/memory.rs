//! Memory repository trait definition.

use uuid::Uuid;

use xmem_types::error::RepositoryError;
use xmem_types::memory::{Memory, MemoryListFilter};
use xmem_types::tenant::TenantId;
use xmem_types::vector::VectorFilter;

/// Canonical memory store.
///
/// Implementations live in xmem-infra (e.g. `SqliteMemoryRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait MemoryRepository: Send + Sync {
    /// Insert a new record. Fails `Conflict` if the id already exists.
    fn create(
        &self,
        memory: &Memory,
    ) -> impl std::future::Future<Output = Result<Memory, RepositoryError>> + Send;

    fn get(
        &self,
        tenant: &TenantId,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Memory>, RepositoryError>> + Send;

    /// Fetch several records of one tenant. Unknown ids are skipped.
    fn get_many(
        &self,
        tenant: &TenantId,
        ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// Replace the mutable fields of an existing record, matched on
    /// `(tenant_id, id)`. Fails `NotFound` if nothing matched.
    fn update(
        &self,
        memory: &Memory,
    ) -> impl std::future::Future<Output = Result<Memory, RepositoryError>> + Send;

    /// Delete a record. Returns whether a row was removed.
    fn delete(
        &self,
        tenant: &TenantId,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// List records newest first.
    fn list(
        &self,
        tenant: &TenantId,
        filter: &MemoryListFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// Non-archived records with an embedding that satisfy `filter`.
    ///
    /// Feeds the in-process similarity path. The filter is compiled from the
    /// allow-listed field set into bound parameters.
    fn scan_candidates(
        &self,
        tenant: &TenantId,
        filter: &VectorFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// Count of non-archived records for a tenant.
    fn count(
        &self,
        tenant: &TenantId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
