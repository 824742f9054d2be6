//! HTTP request handlers for the REST API.

pub mod import;
pub mod memory;
pub mod project;
pub mod source;
pub mod stats;
