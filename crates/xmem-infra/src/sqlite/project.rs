//! SQLite project repository implementation.

use sqlx::Row;
use uuid::Uuid;

use xmem_core::repository::project::ProjectRepository;
use xmem_types::error::RepositoryError;
use xmem_types::project::{Project, Visibility};
use xmem_types::tenant::TenantId;

use super::memory::{format_datetime, parse_datetime};
use super::pool::DatabasePool;

pub struct SqliteProjectRepository {
    pool: DatabasePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn project_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Project, RepositoryError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let tenant_id: String = row
        .try_get("tenant_id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let description: String = row
        .try_get("description")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let visibility: String = row
        .try_get("visibility")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let updated_at: String = row
        .try_get("updated_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(Project {
        id: Uuid::parse_str(&id)
            .map_err(|e| RepositoryError::Query(format!("invalid project id: {e}")))?,
        tenant_id: TenantId::new(tenant_id),
        name,
        description,
        visibility: visibility
            .parse::<Visibility>()
            .map_err(RepositoryError::Query)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl ProjectRepository for SqliteProjectRepository {
    async fn create(&self, project: &Project) -> Result<Project, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO projects (id, tenant_id, name, description, visibility, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(project.id.to_string())
        .bind(project.tenant_id.as_str())
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.visibility.to_string())
        .bind(format_datetime(&project.created_at))
        .bind(format_datetime(&project.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(project.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Err(RepositoryError::Conflict(format!(
                    "project '{}' already exists",
                    project.name
                )))
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn get(&self, tenant: &TenantId, id: &Uuid) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM projects WHERE tenant_id = ? AND id = ?")
            .bind(tenant.as_str())
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(project_from_row).transpose()
    }

    async fn list(&self, tenant: &TenantId) -> Result<Vec<Project>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM projects WHERE tenant_id = ? ORDER BY name ASC")
            .bind(tenant.as_str())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(project_from_row).collect()
    }

    async fn delete(&self, tenant: &TenantId, id: &Uuid) -> Result<u64, RepositoryError> {
        // Detach memories and delete the project atomically.
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let detached = sqlx::query(
            "UPDATE memories SET project_id = NULL WHERE tenant_id = ? AND project_id = ?",
        )
        .bind(tenant.as_str())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM projects WHERE tenant_id = ? AND id = ?")
            .bind(tenant.as_str())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .rows_affected();

        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(detached)
    }
}
