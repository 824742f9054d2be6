//! Query parameter extractors for list endpoints.

use serde::Deserialize;
use uuid::Uuid;

use xmem_types::memory::{MemoryListFilter, MemoryType};

use crate::http::error::AppError;

/// Query parameters for the memory list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct MemoryListQuery {
    pub project_id: Option<Uuid>,
    /// One of text, code, image, audio, video.
    #[serde(rename = "type")]
    pub memory_type: Option<String>,
    pub tag: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl MemoryListQuery {
    pub fn into_filter(self) -> Result<MemoryListFilter, AppError> {
        let memory_type = match &self.memory_type {
            Some(t) => Some(t.parse::<MemoryType>().map_err(AppError::Validation)?),
            None => None,
        };
        Ok(MemoryListFilter {
            project_id: self.project_id,
            memory_type,
            tag: self.tag,
            include_archived: self.include_archived,
            limit: self.limit,
            offset: self.offset,
        })
    }
}
