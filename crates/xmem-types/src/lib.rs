//! Shared domain types for xmem.
//!
//! Memories, projects, source configs, vector points and filters, provider
//! roles, configuration, and the error taxonomy used across the workspace.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, sha2.

pub mod config;
pub mod error;
pub mod import;
pub mod memory;
pub mod project;
pub mod provider;
pub mod source;
pub mod tenant;
pub mod vector;
