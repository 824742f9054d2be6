//! Vector-store adapter contract.
//!
//! - `VectorStore`: RPITIT trait every backend adapter implements
//! - `BoxVectorStore`: object-safe wrapper for the provider registry

pub mod box_store;
pub mod store;
