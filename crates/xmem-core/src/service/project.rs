//! Project management service.
//!
//! Projects only group memories. Deleting one detaches its memories, it
//! never removes them.

use chrono::Utc;
use uuid::Uuid;

use xmem_types::error::{MemoryError, RepositoryError};
use xmem_types::project::{CreateProjectRequest, Project};
use xmem_types::tenant::TenantId;

use crate::repository::project::ProjectRepository;

pub const MAX_PROJECT_NAME_LENGTH: usize = 100;
pub const MAX_PROJECT_DESCRIPTION_LENGTH: usize = 500;

pub struct ProjectService<P: ProjectRepository> {
    projects: P,
}

impl<P: ProjectRepository> ProjectService<P> {
    pub fn new(projects: P) -> Self {
        Self { projects }
    }

    pub async fn create(
        &self,
        tenant: &TenantId,
        request: CreateProjectRequest,
    ) -> Result<Project, MemoryError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(MemoryError::Validation(
                "project name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_PROJECT_NAME_LENGTH {
            return Err(MemoryError::Validation(format!(
                "project name exceeds {MAX_PROJECT_NAME_LENGTH} characters"
            )));
        }
        let description = request.description.trim().to_string();
        if description.chars().count() > MAX_PROJECT_DESCRIPTION_LENGTH {
            return Err(MemoryError::Validation(format!(
                "project description exceeds {MAX_PROJECT_DESCRIPTION_LENGTH} characters"
            )));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::now_v7(),
            tenant_id: tenant.clone(),
            name,
            description,
            visibility: request.visibility,
            created_at: now,
            updated_at: now,
        };

        self.projects.create(&project).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => MemoryError::Validation(format!(
                "a project named '{}' already exists",
                project.name
            )),
            other => other.into(),
        })
    }

    pub async fn get(&self, tenant: &TenantId, id: &Uuid) -> Result<Project, MemoryError> {
        self.projects
            .get(tenant, id)
            .await?
            .ok_or(MemoryError::NotFound)
    }

    pub async fn list(&self, tenant: &TenantId) -> Result<Vec<Project>, MemoryError> {
        Ok(self.projects.list(tenant).await?)
    }

    /// Delete a project, returning how many memories were detached.
    pub async fn delete(&self, tenant: &TenantId, id: &Uuid) -> Result<u64, MemoryError> {
        let detached = self.projects.delete(tenant, id).await?;
        tracing::info!(tenant_id = %tenant, project_id = %id, detached, "project deleted");
        Ok(detached)
    }
}
