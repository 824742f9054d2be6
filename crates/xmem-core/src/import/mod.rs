//! Bulk import: tabular input to memories.

pub mod pipeline;
pub mod row;
