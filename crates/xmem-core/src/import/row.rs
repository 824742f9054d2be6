//! Row partitioning: tabular row to memory content plus metadata.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use xmem_types::config::ImportConfig;

/// Import provenance written into every imported memory's metadata.
pub const IMPORT_SOURCE: &str = "csv";

/// A row split into what becomes the memory.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRow {
    pub content: String,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
    pub category: Option<String>,
    /// Whether at least one configured metadata column carried a value.
    pub has_metadata: bool,
}

/// Partition one row into metadata and content.
///
/// Columns named in `metadata_fields` (case-sensitive) become metadata;
/// `list_fields` among them are split on the delimiter, trimmed and
/// deduplicated. Every other non-empty column becomes a `key: value` content
/// line. Returns `None` when the row yields neither content nor a summary.
pub fn prepare_row(
    headers: &[String],
    values: &[String],
    config: &ImportConfig,
    imported_at: DateTime<Utc>,
) -> Option<PreparedRow> {
    let mut metadata = Map::new();
    let mut content_pairs: Vec<(&str, &str)> = Vec::new();

    for (header, value) in headers.iter().zip(values.iter()) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if config.metadata_fields.iter().any(|f| f == header) {
            let parsed = if config.list_fields.iter().any(|f| f == header) {
                Value::Array(
                    split_list(value, &config.list_delimiter)
                        .into_iter()
                        .map(Value::String)
                        .collect(),
                )
            } else {
                Value::String(value.to_string())
            };
            metadata.insert(header.clone(), parsed);
        } else {
            content_pairs.push((header.as_str(), value));
        }
    }
    let has_metadata = !metadata.is_empty();

    let summary = string_field(&metadata, "description")
        .or_else(|| string_field(&metadata, "title"))
        .or_else(|| {
            (!content_pairs.is_empty()).then(|| {
                content_pairs
                    .iter()
                    .take(2)
                    .map(|(_, v)| *v)
                    .collect::<Vec<_>>()
                    .join(" - ")
            })
        });

    let content = if content_pairs.is_empty() {
        summary.clone()?
    } else {
        content_pairs
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let tags: Vec<String> = match metadata.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(tag)) => vec![tag.clone()],
        _ => Vec::new(),
    };
    let category = string_field(&metadata, "category");

    metadata.insert("import_source".to_string(), Value::from(IMPORT_SOURCE));
    metadata.insert(
        "imported_at".to_string(),
        Value::String(imported_at.to_rfc3339()),
    );
    metadata.insert(
        "original_fields".to_string(),
        Value::Array(headers.iter().cloned().map(Value::String).collect()),
    );
    metadata.insert(
        "content_field_count".to_string(),
        Value::from(content_pairs.len()),
    );
    if let Some(summary) = summary {
        metadata.insert("summary".to_string(), Value::String(summary));
    }

    Some(PreparedRow {
        content,
        tags,
        metadata,
        category,
        has_metadata,
    })
}

/// Split on `delimiter`, trim, drop empties and duplicates (first wins).
pub fn split_list(value: &str, delimiter: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let parts: Vec<&str> = if delimiter.is_empty() {
        vec![value]
    } else {
        value.split(delimiter).collect()
    };
    for part in parts.into_iter().map(str::trim).filter(|p| !p.is_empty()) {
        if !out.iter().any(|existing| existing == part) {
            out.push(part.to_string());
        }
    }
    out
}

fn string_field(metadata: &Map<String, Value>, key: &str) -> Option<String> {
    metadata.get(key).and_then(Value::as_str).map(str::to_string)
}
