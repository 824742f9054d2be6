//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

mod filter;
pub mod memory;
pub mod pool;
pub mod project;
pub mod source_config;
