//! SQLite source config repository implementation.
//!
//! Writes are upserts keyed by `(tenant_id, source)`.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use xmem_core::repository::source::SourceConfigRepository;
use xmem_types::error::RepositoryError;
use xmem_types::source::{SourceConfig, UpsertSourceConfig};
use xmem_types::tenant::TenantId;

use super::memory::{format_datetime, parse_datetime};
use super::pool::DatabasePool;

const DEFAULT_SYNC_INTERVAL_SECS: i64 = 3600;

pub struct SqliteSourceConfigRepository {
    pool: DatabasePool,
}

impl SqliteSourceConfigRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, tenant: &TenantId, source: &str) -> Result<Option<SourceConfig>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM source_configs WHERE tenant_id = ? AND source = ?")
            .bind(tenant.as_str())
            .bind(source)
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(config_from_row).transpose()
    }
}

struct SourceConfigRow {
    id: String,
    tenant_id: String,
    source: String,
    api_key: Option<String>,
    api_secret: Option<String>,
    webhook_url: Option<String>,
    sync_interval_secs: i64,
    is_enabled: i64,
    last_sync_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn config_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SourceConfig, RepositoryError> {
    let raw = (|| -> Result<SourceConfigRow, sqlx::Error> {
        Ok(SourceConfigRow {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            source: row.try_get("source")?,
            api_key: row.try_get("api_key")?,
            api_secret: row.try_get("api_secret")?,
            webhook_url: row.try_get("webhook_url")?,
            sync_interval_secs: row.try_get("sync_interval_secs")?,
            is_enabled: row.try_get("is_enabled")?,
            last_sync_at: row.try_get("last_sync_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    })()
    .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(SourceConfig {
        id: Uuid::parse_str(&raw.id)
            .map_err(|e| RepositoryError::Query(format!("invalid source config id: {e}")))?,
        tenant_id: TenantId::new(raw.tenant_id),
        source: raw.source,
        api_key: raw.api_key,
        api_secret: raw.api_secret,
        webhook_url: raw.webhook_url,
        sync_interval_secs: raw.sync_interval_secs.max(0) as u64,
        is_enabled: raw.is_enabled != 0,
        last_sync_at: raw.last_sync_at.as_deref().map(parse_datetime).transpose()?,
        created_at: parse_datetime(&raw.created_at)?,
        updated_at: parse_datetime(&raw.updated_at)?,
    })
}

impl SourceConfigRepository for SqliteSourceConfigRepository {
    async fn upsert(
        &self,
        tenant: &TenantId,
        config: &UpsertSourceConfig,
    ) -> Result<SourceConfig, RepositoryError> {
        let now = format_datetime(&Utc::now());
        // COALESCE keeps the stored interval/enabled flag when the caller
        // leaves them unset on update.
        sqlx::query(
            r#"INSERT INTO source_configs (id, tenant_id, source, api_key, api_secret, webhook_url, sync_interval_secs, is_enabled, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, COALESCE(?, ?), COALESCE(?, 1), ?, ?)
               ON CONFLICT(tenant_id, source) DO UPDATE SET
                   api_key = excluded.api_key,
                   api_secret = excluded.api_secret,
                   webhook_url = excluded.webhook_url,
                   sync_interval_secs = COALESCE(?, source_configs.sync_interval_secs),
                   is_enabled = COALESCE(?, source_configs.is_enabled),
                   updated_at = excluded.updated_at"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(tenant.as_str())
        .bind(&config.source)
        .bind(&config.api_key)
        .bind(&config.api_secret)
        .bind(&config.webhook_url)
        .bind(config.sync_interval_secs.map(|s| s as i64))
        .bind(DEFAULT_SYNC_INTERVAL_SECS)
        .bind(config.is_enabled.map(i64::from))
        .bind(&now)
        .bind(&now)
        .bind(config.sync_interval_secs.map(|s| s as i64))
        .bind(config.is_enabled.map(i64::from))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        self.fetch(tenant, &config.source)
            .await?
            .ok_or_else(|| RepositoryError::Conflict(format!("source '{}' vanished during upsert", config.source)))
    }

    async fn get(&self, tenant: &TenantId, source: &str) -> Result<Option<SourceConfig>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM source_configs WHERE tenant_id = ? AND source = ?")
            .bind(tenant.as_str())
            .bind(source)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(config_from_row).transpose()
    }

    async fn list(&self, tenant: &TenantId) -> Result<Vec<SourceConfig>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM source_configs WHERE tenant_id = ? ORDER BY source ASC")
            .bind(tenant.as_str())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(config_from_row).collect()
    }

    async fn list_enabled(&self, scope: Option<&TenantId>) -> Result<Vec<SourceConfig>, RepositoryError> {
        let rows = match scope {
            Some(tenant) => {
                sqlx::query(
                    "SELECT * FROM source_configs WHERE is_enabled = 1 AND tenant_id = ? ORDER BY created_at ASC, id ASC",
                )
                .bind(tenant.as_str())
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM source_configs WHERE is_enabled = 1 ORDER BY tenant_id ASC, created_at ASC, id ASC",
                )
                .fetch_all(&self.pool.reader)
                .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(config_from_row).collect()
    }

    async fn delete(&self, tenant: &TenantId, source: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM source_configs WHERE tenant_id = ? AND source = ?")
            .bind(tenant.as_str())
            .bind(source)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_sync(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE source_configs SET last_sync_at = ? WHERE id = ?")
            .bind(format_datetime(&at))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
