//! Vector store trait.
//!
//! The contract every vector backend adapter satisfies. Concrete adapters
//! (point-oriented, document/listing, managed index, document store) live in
//! xmem-infra.

use xmem_types::error::AdapterError;
use xmem_types::vector::{CollectionStats, VectorFilter, VectorMatch, VectorPoint};

/// Trait for vector-store backends.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Collections are named by the caller; adapters that require explicit
/// collections provision them on first write.
pub trait VectorStore: Send + Sync {
    /// Backend family name (e.g. "qdrant", "chroma").
    fn name(&self) -> &str;

    /// Insert or replace points. Provisions the collection if the backend
    /// requires it.
    fn upsert(
        &self,
        collection: &str,
        points: &[VectorPoint],
    ) -> impl std::future::Future<Output = Result<(), AdapterError>> + Send;

    /// Nearest neighbours of `vector`, best first, in backend-native units.
    ///
    /// `filter` is pushed down when the backend supports it. Adapters without
    /// native filtering apply it themselves after retrieval.
    fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> impl std::future::Future<Output = Result<Vec<VectorMatch>, AdapterError>> + Send;

    /// Remove points by id. Absent ids and absent collections are not errors.
    fn delete_ids(
        &self,
        collection: &str,
        ids: &[String],
    ) -> impl std::future::Future<Output = Result<(), AdapterError>> + Send;

    /// Point counts for observability.
    fn collection_stats(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<CollectionStats, AdapterError>> + Send;
}
