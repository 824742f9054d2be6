//! SQLite memory repository implementation.
//!
//! Implements `MemoryRepository` from `xmem-core` using sqlx with split
//! read/write pools. Tags, metadata and embeddings are stored as JSON text.
//! Every statement is scoped by `tenant_id`.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use xmem_core::repository::memory::MemoryRepository;
use xmem_types::error::RepositoryError;
use xmem_types::memory::{Memory, MemoryListFilter, MemoryType};
use xmem_types::tenant::TenantId;
use xmem_types::vector::VectorFilter;

use super::filter::compile;
use super::pool::DatabasePool;

/// SQLite-backed implementation of `MemoryRepository`.
pub struct SqliteMemoryRepository {
    pool: DatabasePool,
}

impl SqliteMemoryRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct MemoryRow {
    id: String,
    tenant_id: String,
    content: String,
    memory_type: String,
    tags: String,
    metadata: String,
    project_id: Option<String>,
    embedding: Option<String>,
    version: i64,
    is_archived: i64,
    created_at: String,
    updated_at: String,
}

impl MemoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            content: row.try_get("content")?,
            memory_type: row.try_get("memory_type")?,
            tags: row.try_get("tags")?,
            metadata: row.try_get("metadata")?,
            project_id: row.try_get("project_id")?,
            embedding: row.try_get("embedding")?,
            version: row.try_get("version")?,
            is_archived: row.try_get("is_archived")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_memory(self) -> Result<Memory, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid memory id: {e}")))?;
        let memory_type: MemoryType = self
            .memory_type
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| RepositoryError::Query(format!("invalid tags JSON: {e}")))?;
        let metadata: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&self.metadata)
                .map_err(|e| RepositoryError::Query(format!("invalid metadata JSON: {e}")))?;
        let project_id = self
            .project_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid project_id: {e}")))?;
        let embedding = self
            .embedding
            .as_deref()
            .map(serde_json::from_str::<Vec<f32>>)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid embedding JSON: {e}")))?;

        Ok(Memory {
            id,
            tenant_id: TenantId::new(self.tenant_id),
            content: self.content,
            memory_type,
            tags,
            metadata,
            project_id,
            embedding,
            version: self.version,
            is_archived: self.is_archived != 0,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width UTC timestamps, so text ordering matches time ordering.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(e.to_string()))
}

fn collect_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Memory>, RepositoryError> {
    let mut memories = Vec::with_capacity(rows.len());
    for row in rows {
        let memory_row =
            MemoryRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        memories.push(memory_row.into_memory()?);
    }
    Ok(memories)
}

// ---------------------------------------------------------------------------
// MemoryRepository implementation
// ---------------------------------------------------------------------------

impl MemoryRepository for SqliteMemoryRepository {
    async fn create(&self, memory: &Memory) -> Result<Memory, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO memories (id, tenant_id, content, memory_type, tags, metadata, project_id, embedding, embedding_dim, version, is_archived, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(memory.id.to_string())
        .bind(memory.tenant_id.as_str())
        .bind(&memory.content)
        .bind(memory.memory_type.to_string())
        .bind(to_json(&memory.tags)?)
        .bind(to_json(&memory.metadata)?)
        .bind(memory.project_id.map(|id| id.to_string()))
        .bind(memory.embedding.as_ref().map(to_json).transpose()?)
        .bind(memory.embedding.as_ref().map(|e| e.len() as i64))
        .bind(memory.version)
        .bind(memory.is_archived as i64)
        .bind(format_datetime(&memory.created_at))
        .bind(format_datetime(&memory.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(memory.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("memory '{}' already exists", memory.id)),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn get(&self, tenant: &TenantId, id: &Uuid) -> Result<Option<Memory>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM memories WHERE tenant_id = ? AND id = ?")
            .bind(tenant.as_str())
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let memory_row =
                    MemoryRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(memory_row.into_memory()?))
            }
            None => Ok(None),
        }
    }

    async fn get_many(&self, tenant: &TenantId, ids: &[Uuid]) -> Result<Vec<Memory>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM memories WHERE tenant_id = ? AND id IN ({placeholders})");

        let mut query = sqlx::query(&sql).bind(tenant.as_str());
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        collect_rows(&rows)
    }

    async fn update(&self, memory: &Memory) -> Result<Memory, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE memories
               SET content = ?, memory_type = ?, tags = ?, metadata = ?, project_id = ?, embedding = ?, embedding_dim = ?, version = ?, is_archived = ?, updated_at = ?
               WHERE tenant_id = ? AND id = ?"#,
        )
        .bind(&memory.content)
        .bind(memory.memory_type.to_string())
        .bind(to_json(&memory.tags)?)
        .bind(to_json(&memory.metadata)?)
        .bind(memory.project_id.map(|id| id.to_string()))
        .bind(memory.embedding.as_ref().map(to_json).transpose()?)
        .bind(memory.embedding.as_ref().map(|e| e.len() as i64))
        .bind(memory.version)
        .bind(memory.is_archived as i64)
        .bind(format_datetime(&memory.updated_at))
        .bind(memory.tenant_id.as_str())
        .bind(memory.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(memory.clone())
    }

    async fn delete(&self, tenant: &TenantId, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM memories WHERE tenant_id = ? AND id = ?")
            .bind(tenant.as_str())
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        tenant: &TenantId,
        filter: &MemoryListFilter,
    ) -> Result<Vec<Memory>, RepositoryError> {
        let mut sql = String::from("SELECT * FROM memories m WHERE m.tenant_id = ?");
        let mut binds: Vec<String> = vec![tenant.as_str().to_string()];

        if !filter.include_archived {
            sql.push_str(" AND m.is_archived = 0");
        }
        if let Some(project_id) = filter.project_id {
            sql.push_str(" AND m.project_id = ?");
            binds.push(project_id.to_string());
        }
        if let Some(memory_type) = filter.memory_type {
            sql.push_str(" AND m.memory_type = ?");
            binds.push(memory_type.to_string());
        }
        if let Some(tag) = &filter.tag {
            sql.push_str(" AND EXISTS (SELECT 1 FROM json_each(m.tags) WHERE json_each.value = ?)");
            binds.push(tag.clone());
        }
        sql.push_str(" ORDER BY m.created_at DESC, m.id DESC");
        // Numeric, never caller text.
        let limit = filter.limit.map(i64::from).unwrap_or(-1);
        let offset = filter.offset.map(i64::from).unwrap_or(0);
        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));

        let mut query = sqlx::query(&sql);
        for value in &binds {
            query = query.bind(value.as_str());
        }
        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        collect_rows(&rows)
    }

    async fn scan_candidates(
        &self,
        tenant: &TenantId,
        filter: &VectorFilter,
    ) -> Result<Vec<Memory>, RepositoryError> {
        let compiled = compile(filter);
        let mut sql = String::from(
            "SELECT * FROM memories m WHERE m.tenant_id = ? AND m.is_archived = 0 AND m.embedding IS NOT NULL",
        );
        if !compiled.clause.is_empty() {
            sql.push_str(" AND ");
            sql.push_str(&compiled.clause);
        }

        let mut query = sqlx::query(&sql).bind(tenant.as_str());
        for value in &compiled.binds {
            query = query.bind(value.as_str());
        }
        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        collect_rows(&rows)
    }

    async fn count(&self, tenant: &TenantId) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM memories WHERE tenant_id = ? AND is_archived = 0 AND embedding IS NOT NULL",
        )
        .bind(tenant.as_str())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count as u64)
    }
}
