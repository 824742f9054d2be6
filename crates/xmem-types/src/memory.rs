//! Memory types for xmem.
//!
//! A memory is an arbitrary piece of tenant-owned text plus tags and open
//! metadata. The relational store holds the canonical record; vector
//! backends only ever hold a projection of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::tenant::TenantId;

/// Kind of content a memory carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    #[default]
    Text,
    Code,
    Image,
    Audio,
    Video,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryType::Text => write!(f, "text"),
            MemoryType::Code => write!(f, "code"),
            MemoryType::Image => write!(f, "image"),
            MemoryType::Audio => write!(f, "audio"),
            MemoryType::Video => write!(f, "video"),
        }
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(MemoryType::Text),
            "code" => Ok(MemoryType::Code),
            "image" => Ok(MemoryType::Image),
            "audio" => Ok(MemoryType::Audio),
            "video" => Ok(MemoryType::Video),
            other => Err(format!("invalid memory type: '{other}'")),
        }
    }
}

/// Canonical memory record.
///
/// `tenant_id` never changes after creation. `version` starts at 1 and is
/// bumped by exactly one on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub content: String,
    pub memory_type: MemoryType,
    /// Ordered set: insertion order kept, duplicates removed.
    pub tags: Vec<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub project_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub version: i64,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMemoryRequest {
    pub content: String,
    #[serde(default)]
    pub memory_type: MemoryType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl CreateMemoryRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Partial update. `None` leaves a field untouched; `Some` replaces it
/// wholesale (metadata objects are replaced, not merged).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMemoryRequest {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Filter for listing memories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryListFilter {
    pub project_id: Option<Uuid>,
    pub memory_type: Option<MemoryType>,
    pub tag: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Search surface input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query_text: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SearchRequest {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            top_k: None,
            project_id: None,
            tags: Vec::new(),
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// One ranked search hit. Similarity is normalized into `[0, 1]`,
/// higher meaning more relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: Uuid,
    pub content: String,
    pub similarity: f32,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl SearchResult {
    pub fn from_memory(memory: &Memory, similarity: f32) -> Self {
        Self {
            id: memory.id,
            content: memory.content.clone(),
            similarity,
            metadata: memory.metadata.clone(),
            created_at: memory.created_at,
        }
    }
}
