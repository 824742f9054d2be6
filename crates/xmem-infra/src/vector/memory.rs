//! In-process vector store.
//!
//! Keeps every collection in a concurrent map and answers queries by brute
//! force cosine distance. Filters are applied natively against payloads.
//! Intended for tests and single-process deployments; nothing is persisted.

use std::collections::HashMap;

use dashmap::DashMap;

use xmem_core::similarity::cosine_distance;
use xmem_core::vector::store::VectorStore;
use xmem_types::error::AdapterError;
use xmem_types::vector::{CollectionStats, ScoreKind, VectorFilter, VectorMatch, VectorPoint};

#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: DashMap<String, HashMap<String, VectorPoint>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), AdapterError> {
        let mut entry = self.collections.entry(collection.to_string()).or_default();
        for point in points {
            entry.insert(point.id.clone(), point.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorMatch>, AdapterError> {
        let Some(points) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut matches: Vec<VectorMatch> = points
            .values()
            .filter(|p| p.vector.len() == vector.len() && filter.matches(&p.payload))
            .map(|p| VectorMatch {
                id: p.id.clone(),
                score: cosine_distance(vector, &p.vector),
                kind: ScoreKind::Distance,
                payload: p.payload.clone(),
            })
            .collect();
        drop(points);

        matches.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_ids(&self, collection: &str, ids: &[String]) -> Result<(), AdapterError> {
        if let Some(mut points) = self.collections.get_mut(collection) {
            for id in ids {
                points.remove(id);
            }
        }
        Ok(())
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        let count = self
            .collections
            .get(collection)
            .map(|points| points.len() as u64)
            .unwrap_or(0);
        Ok(CollectionStats::counted(collection, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};
    use xmem_types::vector::{FilterField, FilterPredicate};

    fn point(id: &str, vector: Vec<f32>, tag: &str) -> VectorPoint {
        let mut payload = Map::new();
        payload.insert("tags".into(), json!([tag]));
        VectorPoint {
            id: id.to_string(),
            vector,
            payload,
        }
    }

    #[tokio::test]
    async fn test_query_orders_by_distance_and_filters() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(
                "c",
                &[
                    point("a", vec![1.0, 0.0], "x"),
                    point("b", vec![0.7, 0.7], "x"),
                    point("c", vec![1.0, 0.1], "y"),
                ],
            )
            .await
            .unwrap();

        let all = store.query("c", &[1.0, 0.0], 10, &VectorFilter::new()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert!(all[0].similarity() > 0.99);

        let filter = VectorFilter::new().and(FilterPredicate::contains(FilterField::Tag, "x"));
        let tagged = store.query("c", &[1.0, 0.0], 1, &filter).await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, "a");
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_delete_is_idempotent() {
        let store = InMemoryVectorStore::new();
        store.upsert("c", &[point("a", vec![1.0, 0.0], "x")]).await.unwrap();
        store.upsert("c", &[point("a", vec![0.0, 1.0], "x")]).await.unwrap();
        assert_eq!(store.collection_stats("c").await.unwrap().vector_count, 1);

        store.delete_ids("c", &["a".to_string(), "zzz".to_string()]).await.unwrap();
        store.delete_ids("missing", &["a".to_string()]).await.unwrap();
        assert_eq!(store.collection_stats("c").await.unwrap().vector_count, 0);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = InMemoryVectorStore::new();
        store.upsert("one", &[point("a", vec![1.0], "x")]).await.unwrap();
        assert!(store.query("two", &[1.0], 5, &VectorFilter::new()).await.unwrap().is_empty());
    }
}
