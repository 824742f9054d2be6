//! Vector store wire-neutral types: points, matches, filters, stats.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use std::fmt;

/// A vector plus its payload, as written to a backend collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// How a backend reports closeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Lower is closer (cosine distance and friends).
    Distance,
    /// Higher is closer (cosine similarity, dot product on unit vectors).
    Similarity,
}

/// One match returned by a backend query, in backend-native units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub kind: ScoreKind,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl VectorMatch {
    /// Normalized similarity in `[0, 1]`.
    ///
    /// Distances become `1 - distance`; similarities pass through. Both are
    /// clamped so that ranking stays comparable across backends.
    pub fn similarity(&self) -> f32 {
        let raw = match self.kind {
            ScoreKind::Distance => 1.0 - self.score,
            ScoreKind::Similarity => self.score,
        };
        if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
    }
}

/// The closed set of fields a filter may reference.
///
/// Filters are compiled from these variants only; caller-supplied strings
/// are always values, never field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    TenantId,
    ProjectId,
    MemoryType,
    Tag,
    Category,
    Source,
}

impl FilterField {
    /// Key used for this field in vector payloads.
    pub fn payload_key(&self) -> &'static str {
        match self {
            FilterField::TenantId => "tenant_id",
            FilterField::ProjectId => "project_id",
            FilterField::MemoryType => "memory_type",
            FilterField::Tag => "tags",
            FilterField::Category => "category",
            FilterField::Source => "source",
        }
    }

    /// Whether the field holds a list of values rather than a scalar.
    pub fn is_list(&self) -> bool {
        matches!(self, FilterField::Tag)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payload_key())
    }
}

/// A single parameterized predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterPredicate {
    Eq { field: FilterField, value: String },
    Contains { field: FilterField, value: String },
}

impl FilterPredicate {
    pub fn eq(field: FilterField, value: impl Into<String>) -> Self {
        FilterPredicate::Eq {
            field,
            value: value.into(),
        }
    }

    pub fn contains(field: FilterField, value: impl Into<String>) -> Self {
        FilterPredicate::Contains {
            field,
            value: value.into(),
        }
    }

    pub fn field(&self) -> FilterField {
        match self {
            FilterPredicate::Eq { field, .. } | FilterPredicate::Contains { field, .. } => *field,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            FilterPredicate::Eq { value, .. } | FilterPredicate::Contains { value, .. } => value,
        }
    }

    /// Evaluate against a payload map.
    ///
    /// `Contains` on a list field checks membership; on a scalar field it
    /// degrades to equality. `Eq` on a list field matches a list holding
    /// exactly that one value.
    pub fn matches(&self, payload: &Map<String, Value>) -> bool {
        let Some(actual) = payload.get(self.field().payload_key()) else {
            return false;
        };
        match (self, actual) {
            (FilterPredicate::Contains { value, .. }, Value::Array(items)) => {
                items.iter().any(|item| item.as_str() == Some(value.as_str()))
            }
            (FilterPredicate::Eq { value, .. }, Value::Array(items)) => {
                items.len() == 1 && items[0].as_str() == Some(value.as_str())
            }
            (_, Value::String(s)) => s == self.value(),
            _ => false,
        }
    }
}

/// Conjunction of predicates. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorFilter(pub Vec<FilterPredicate>);

impl VectorFilter {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn and(mut self, predicate: FilterPredicate) -> Self {
        self.0.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[FilterPredicate] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, payload: &Map<String, Value>) -> bool {
        self.0.iter().all(|p| p.matches(payload))
    }
}

/// Where a stats figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsSource {
    /// Counted on the requested collection.
    Collection,
    /// The collection was not found; summed over every collection.
    Aggregate,
    /// The backend cannot report counts.
    Unimplemented,
    /// The backend was unreachable; figures are zero.
    Unavailable,
}

/// Point counts for observability only. Never used for correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub collection: String,
    pub vector_count: u64,
    pub source: StatsSource,
}

impl CollectionStats {
    pub fn counted(collection: impl Into<String>, vector_count: u64) -> Self {
        Self {
            collection: collection.into(),
            vector_count,
            source: StatsSource::Collection,
        }
    }

    pub fn aggregate(collection: impl Into<String>, vector_count: u64) -> Self {
        Self {
            collection: collection.into(),
            vector_count,
            source: StatsSource::Aggregate,
        }
    }

    pub fn unimplemented(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            vector_count: 0,
            source: StatsSource::Unimplemented,
        }
    }

    pub fn unavailable(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            vector_count: 0,
            source: StatsSource::Unavailable,
        }
    }
}
