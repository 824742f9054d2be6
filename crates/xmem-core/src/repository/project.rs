//! Project repository trait definition.

use uuid::Uuid;

use xmem_types::error::RepositoryError;
use xmem_types::project::Project;
use xmem_types::tenant::TenantId;

pub trait ProjectRepository: Send + Sync {
    /// Insert a project. Fails `Conflict` on a duplicate name within the tenant.
    fn create(
        &self,
        project: &Project,
    ) -> impl std::future::Future<Output = Result<Project, RepositoryError>> + Send;

    fn get(
        &self,
        tenant: &TenantId,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Project>, RepositoryError>> + Send;

    fn list(
        &self,
        tenant: &TenantId,
    ) -> impl std::future::Future<Output = Result<Vec<Project>, RepositoryError>> + Send;

    /// Delete a project and detach every memory that referenced it, in one
    /// transaction. Returns the number of memories detached. Fails
    /// `NotFound` if the project does not exist for this tenant.
    fn delete(
        &self,
        tenant: &TenantId,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
