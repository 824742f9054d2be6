//! Retrieval core and port definitions for xmem.
//!
//! This crate defines the "ports" (repository, vector-store and LLM traits)
//! that the infrastructure layer implements, plus the retrieval engine,
//! import pipeline and sync scheduler built on top of them. It depends only
//! on `xmem-types` -- never on `xmem-infra` or any database/IO crate.

pub mod embedding;
pub mod import;
pub mod llm;
pub mod registry;
pub mod repository;
pub mod service;
pub mod similarity;
pub mod sync;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_support;
