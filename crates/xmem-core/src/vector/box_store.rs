//! BoxVectorStore -- object-safe dynamic dispatch wrapper for VectorStore.
//!
//! Same blanket-impl pattern as BoxLlmProvider:
//! 1. Define an object-safe `VectorStoreDyn` trait with boxed futures
//! 2. Blanket-impl `VectorStoreDyn` for all `T: VectorStore`
//! 3. `BoxVectorStore` wraps `Box<dyn VectorStoreDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use xmem_types::error::AdapterError;
use xmem_types::vector::{CollectionStats, VectorFilter, VectorMatch, VectorPoint};

use super::store::VectorStore;

/// Object-safe version of [`VectorStore`] with boxed futures.
pub trait VectorStoreDyn: Send + Sync {
    fn name(&self) -> &str;

    fn upsert_boxed<'a>(
        &'a self,
        collection: &'a str,
        points: &'a [VectorPoint],
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>>;

    fn query_boxed<'a>(
        &'a self,
        collection: &'a str,
        vector: &'a [f32],
        top_k: usize,
        filter: &'a VectorFilter,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VectorMatch>, AdapterError>> + Send + 'a>>;

    fn delete_ids_boxed<'a>(
        &'a self,
        collection: &'a str,
        ids: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>>;

    fn collection_stats_boxed<'a>(
        &'a self,
        collection: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CollectionStats, AdapterError>> + Send + 'a>>;
}

/// Blanket implementation: any `VectorStore` automatically implements `VectorStoreDyn`.
impl<T: VectorStore> VectorStoreDyn for T {
    fn name(&self) -> &str {
        VectorStore::name(self)
    }

    fn upsert_boxed<'a>(
        &'a self,
        collection: &'a str,
        points: &'a [VectorPoint],
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>> {
        Box::pin(self.upsert(collection, points))
    }

    fn query_boxed<'a>(
        &'a self,
        collection: &'a str,
        vector: &'a [f32],
        top_k: usize,
        filter: &'a VectorFilter,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VectorMatch>, AdapterError>> + Send + 'a>> {
        Box::pin(self.query(collection, vector, top_k, filter))
    }

    fn delete_ids_boxed<'a>(
        &'a self,
        collection: &'a str,
        ids: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>> {
        Box::pin(self.delete_ids(collection, ids))
    }

    fn collection_stats_boxed<'a>(
        &'a self,
        collection: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CollectionStats, AdapterError>> + Send + 'a>> {
        Box::pin(self.collection_stats(collection))
    }
}

/// Type-erased vector store for runtime backend selection.
///
/// Since `VectorStore` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxVectorStore` provides equivalent methods that delegate
/// to the inner `VectorStoreDyn` trait object.
pub struct BoxVectorStore {
    inner: Box<dyn VectorStoreDyn + Send + Sync>,
}

impl BoxVectorStore {
    /// Wrap a concrete `VectorStore` in a type-erased box.
    pub fn new<T: VectorStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn upsert(
        &self,
        collection: &str,
        points: &[VectorPoint],
    ) -> Result<(), AdapterError> {
        self.inner.upsert_boxed(collection, points).await
    }

    pub async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorMatch>, AdapterError> {
        self.inner.query_boxed(collection, vector, top_k, filter).await
    }

    pub async fn delete_ids(&self, collection: &str, ids: &[String]) -> Result<(), AdapterError> {
        self.inner.delete_ids_boxed(collection, ids).await
    }

    pub async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        self.inner.collection_stats_boxed(collection).await
    }
}
