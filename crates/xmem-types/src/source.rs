//! External content source configuration and sync results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenant::TenantId;

/// Persisted settings for one external source of one tenant.
///
/// At most one row exists per `(tenant_id, source)`; writes are upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub source: String,
    /// Credential material. Never serialized into API responses.
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    #[serde(skip_serializing, default)]
    pub api_secret: Option<String>,
    pub webhook_url: Option<String>,
    /// Minimum seconds between periodic syncs.
    pub sync_interval_secs: u64,
    pub is_enabled: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceConfig {
    /// Whether a periodic sync is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_enabled {
            return false;
        }
        match self.last_sync_at {
            None => true,
            Some(last) => {
                let elapsed = now.signed_duration_since(last).num_seconds();
                elapsed >= self.sync_interval_secs as i64
            }
        }
    }
}

/// Upsert payload for a source config.
///
/// Creating a config enables it; updating leaves `is_enabled` as stored
/// unless `is_enabled` is given explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertSourceConfig {
    pub source: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
}

/// Outcome of one attempted source sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    pub source: String,
    pub tenant_id: TenantId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_synced: Option<u64>,
}

/// One item pulled from an external source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncedItem {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}
