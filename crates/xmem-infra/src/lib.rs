//! Infrastructure layer for xmem.
//!
//! Contains implementations of the traits defined in `xmem-core`: SQLite
//! repositories, the vector-store adapters, embedding providers, the HTTP
//! source connector, and config loading plus the provider factory.

pub mod config;
pub mod connector;
pub mod factory;
mod http;
pub mod llm;
pub mod sqlite;
pub mod vector;
