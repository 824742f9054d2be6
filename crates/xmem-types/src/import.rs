//! Bulk import result types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub message: String,
}

/// Aggregate outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Number of memories created.
    pub imported: usize,
    pub total_records: usize,
    /// Whether any row carried at least one metadata column.
    pub has_metadata: bool,
    /// Distinct `category` values, sorted.
    pub unique_categories: Vec<String>,
    /// Distinct tags across all rows, sorted.
    pub unique_tags: Vec<String>,
    pub memory_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<RowFailure>,
}
