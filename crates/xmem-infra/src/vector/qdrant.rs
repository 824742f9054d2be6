//! Point-oriented backend with explicit, named collections.
//!
//! Collections are created on first write with cosine distance and the
//! width of the first vector written. Filters are pushed down natively as a
//! `must` clause. When the requested collection does not exist, stats fall
//! back to the sum over every collection on the server.

use std::time::Duration;

use dashmap::DashSet;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use xmem_core::vector::store::VectorStore;
use xmem_types::error::AdapterError;
use xmem_types::vector::{
    CollectionStats, FilterPredicate, ScoreKind, VectorFilter, VectorMatch, VectorPoint,
};

use crate::http::{base_url, build_client, check, check_found, read_json, send_error};

pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    provisioned: DashSet<String>,
}

impl QdrantStore {
    pub fn new(url: &str, api_key: Option<SecretString>, timeout: Duration) -> Result<Self, AdapterError> {
        if url.trim().is_empty() {
            return Err(AdapterError::InvalidConfig("qdrant url is required".to_string()));
        }
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url(url),
            api_key,
            provisioned: DashSet::new(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("api-key", key.expose_secret()),
            None => builder,
        }
    }

    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<(), AdapterError> {
        if self.provisioned.contains(collection) {
            return Ok(());
        }
        let existing = self
            .request(reqwest::Method::GET, &format!("/collections/{collection}"))
            .send()
            .await
            .map_err(send_error)?;
        if check_found(existing).await?.is_none() {
            let response = self
                .request(reqwest::Method::PUT, &format!("/collections/{collection}"))
                .json(&json!({ "vectors": { "size": dimension, "distance": "Cosine" } }))
                .send()
                .await
                .map_err(send_error)?;
            check(response).await?;
            tracing::info!(collection, dimension, "created qdrant collection");
        }
        self.provisioned.insert(collection.to_string());
        Ok(())
    }

    async fn sum_all_collections(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        let response = self
            .request(reqwest::Method::GET, "/collections")
            .send()
            .await
            .map_err(send_error)?;
        let listing: QdrantEnvelope<QdrantCollectionList> = read_json(check(response).await?).await?;

        let mut total = 0u64;
        for entry in listing.result.collections {
            let response = self
                .request(reqwest::Method::GET, &format!("/collections/{}", entry.name))
                .send()
                .await
                .map_err(send_error)?;
            if let Some(found) = check_found(response).await? {
                let info: QdrantEnvelope<QdrantCollectionInfo> = read_json(found).await?;
                total += info.result.count();
            }
        }
        Ok(CollectionStats::aggregate(collection, total))
    }
}

#[derive(Deserialize)]
struct QdrantEnvelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct QdrantCollectionList {
    #[serde(default)]
    collections: Vec<QdrantCollectionName>,
}

#[derive(Deserialize)]
struct QdrantCollectionName {
    name: String,
}

#[derive(Deserialize)]
struct QdrantCollectionInfo {
    #[serde(default)]
    points_count: Option<u64>,
    #[serde(default)]
    vectors_count: Option<u64>,
}

impl QdrantCollectionInfo {
    fn count(&self) -> u64 {
        self.points_count.or(self.vectors_count).unwrap_or(0)
    }
}

#[derive(Deserialize)]
struct QdrantScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

/// Qdrant filter JSON for a conjunction of predicates.
fn compile_filter(filter: &VectorFilter) -> Value {
    let mut must = Vec::new();
    for predicate in filter.predicates() {
        let key = predicate.field().payload_key();
        must.push(json!({ "key": key, "match": { "value": predicate.value() } }));
        if matches!(predicate, FilterPredicate::Eq { .. }) && predicate.field().is_list() {
            must.push(json!({ "key": key, "values_count": { "lte": 1 } }));
        }
    }
    json!({ "must": must })
}

/// Point ids come back as either strings (uuid) or integers.
fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl VectorStore for QdrantStore {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), AdapterError> {
        let Some(first) = points.first() else {
            return Ok(());
        };
        self.ensure_collection(collection, first.vector.len()).await?;

        let body: Vec<Value> = points
            .iter()
            .map(|p| json!({ "id": p.id, "vector": p.vector, "payload": p.payload }))
            .collect();
        let response = self
            .request(reqwest::Method::PUT, &format!("/collections/{collection}/points?wait=true"))
            .json(&json!({ "points": body }))
            .send()
            .await
            .map_err(send_error)?;
        check(response).await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorMatch>, AdapterError> {
        let mut body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
            "with_vector": false,
        });
        if !filter.is_empty() {
            body["filter"] = compile_filter(filter);
        }
        let response = self
            .request(reqwest::Method::POST, &format!("/collections/{collection}/points/search"))
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        // Nothing has been written to this collection yet.
        let Some(found) = check_found(response).await? else {
            return Ok(Vec::new());
        };
        let hits: QdrantEnvelope<Vec<QdrantScoredPoint>> = read_json(found).await?;

        Ok(hits
            .result
            .into_iter()
            .map(|hit| VectorMatch {
                id: id_string(&hit.id),
                score: hit.score,
                kind: ScoreKind::Similarity,
                payload: hit.payload.unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_ids(&self, collection: &str, ids: &[String]) -> Result<(), AdapterError> {
        if ids.is_empty() {
            return Ok(());
        }
        let response = self
            .request(reqwest::Method::POST, &format!("/collections/{collection}/points/delete?wait=true"))
            .json(&json!({ "points": ids }))
            .send()
            .await
            .map_err(send_error)?;
        check_found(response).await?;
        Ok(())
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/collections/{collection}"))
            .send()
            .await
            .map_err(send_error)?;
        match check_found(response).await? {
            Some(found) => {
                let info: QdrantEnvelope<QdrantCollectionInfo> = read_json(found).await?;
                Ok(CollectionStats::counted(collection, info.result.count()))
            }
            None => self.sum_all_collections(collection).await,
        }
    }
}
