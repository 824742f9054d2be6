//! Compile a [`VectorFilter`] into a parameterized SQL clause.
//!
//! Field names come from the closed [`FilterField`] enum and map to fixed
//! SQL fragments; caller-supplied values only ever reach the database as
//! bound parameters.

use xmem_types::vector::{FilterField, FilterPredicate, VectorFilter};

/// A WHERE fragment (possibly empty) plus its bind values, in order.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct SqlFilter {
    pub clause: String,
    pub binds: Vec<String>,
}

/// Fragment for one predicate. Every fragment has exactly one `?`.
fn fragment(predicate: &FilterPredicate) -> &'static str {
    match (predicate, predicate.field()) {
        (_, FilterField::TenantId) => "m.tenant_id = ?",
        (_, FilterField::ProjectId) => "m.project_id = ?",
        (_, FilterField::MemoryType) => "m.memory_type = ?",
        (FilterPredicate::Contains { .. }, FilterField::Tag) => {
            "EXISTS (SELECT 1 FROM json_each(m.tags) WHERE json_each.value = ?)"
        }
        (FilterPredicate::Eq { .. }, FilterField::Tag) => {
            "(json_array_length(m.tags) = 1 AND json_extract(m.tags, '$[0]') = ?)"
        }
        (_, FilterField::Category) => "json_extract(m.metadata, '$.category') = ?",
        (_, FilterField::Source) => "json_extract(m.metadata, '$.source') = ?",
    }
}

/// Compile the conjunction into ` AND `-joined fragments.
pub(crate) fn compile(filter: &VectorFilter) -> SqlFilter {
    let mut clauses = Vec::with_capacity(filter.predicates().len());
    let mut binds = Vec::with_capacity(filter.predicates().len());
    for predicate in filter.predicates() {
        clauses.push(fragment(predicate));
        binds.push(predicate.value().to_string());
    }
    SqlFilter {
        clause: clauses.join(" AND "),
        binds,
    }
}
