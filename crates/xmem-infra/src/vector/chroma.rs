//! Document/listing backend (Chroma REST API).
//!
//! Collections are provisioned implicitly with `get_or_create`. Metadata
//! values must be scalars, so payloads are flattened on write: each tag
//! becomes a `tag:<value> = true` key alongside `tag_count`, which keeps tag
//! predicates expressible as native `where` clauses. Nested values are
//! stored as JSON strings.

use std::time::Duration;

use dashmap::DashMap;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use xmem_core::vector::store::VectorStore;
use xmem_types::error::AdapterError;
use xmem_types::vector::{
    CollectionStats, FilterPredicate, ScoreKind, VectorFilter, VectorMatch, VectorPoint,
};

use crate::http::{base_url, build_client, check, check_found, read_json, send_error};

const TAG_PREFIX: &str = "tag:";
const TAG_COUNT_KEY: &str = "tag_count";

pub struct ChromaStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    /// Collection name to server-assigned id.
    ids: DashMap<String, String>,
}

impl ChromaStore {
    pub fn new(url: &str, api_key: Option<SecretString>, timeout: Duration) -> Result<Self, AdapterError> {
        if url.trim().is_empty() {
            return Err(AdapterError::InvalidConfig("chroma url is required".to_string()));
        }
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url(url),
            api_key,
            ids: DashMap::new(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}/api/v1{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    async fn get_or_create(&self, collection: &str) -> Result<String, AdapterError> {
        if let Some(id) = self.ids.get(collection) {
            return Ok(id.value().clone());
        }
        let response = self
            .request(Method::POST, "/collections")
            .json(&json!({
                "name": collection,
                "metadata": { "hnsw:space": "cosine" },
                "get_or_create": true,
            }))
            .send()
            .await
            .map_err(send_error)?;
        let created: ChromaCollection = read_json(check(response).await?).await?;
        self.ids.insert(collection.to_string(), created.id.clone());
        Ok(created.id)
    }

    /// Id of an existing collection, without creating it.
    async fn lookup(&self, collection: &str) -> Result<Option<String>, AdapterError> {
        if let Some(id) = self.ids.get(collection) {
            return Ok(Some(id.value().clone()));
        }
        let response = self
            .request(Method::GET, &format!("/collections/{collection}"))
            .send()
            .await
            .map_err(send_error)?;
        let Some(found) = check_found(response).await? else {
            return Ok(None);
        };
        let existing: ChromaCollection = read_json(found).await?;
        self.ids.insert(collection.to_string(), existing.id.clone());
        Ok(Some(existing.id))
    }

    async fn sum_listed(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        let response = self
            .request(Method::GET, "/collections")
            .send()
            .await
            .map_err(send_error)?;
        let listed: Vec<ChromaCollection> = read_json(check(response).await?).await?;
        let total = listed.iter().filter_map(|c| c.size).sum();
        Ok(CollectionStats::aggregate(collection, total))
    }
}

#[derive(Deserialize)]
struct ChromaCollection {
    id: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
struct ChromaQueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
}

/// Flatten a payload into scalar-only metadata.
fn flatten_payload(payload: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for (key, value) in payload {
        match (key.as_str(), value) {
            ("tags", Value::Array(tags)) => {
                let mut count = 0u64;
                for tag in tags.iter().filter_map(Value::as_str) {
                    flat.insert(format!("{TAG_PREFIX}{tag}"), Value::Bool(true));
                    count += 1;
                }
                flat.insert(TAG_COUNT_KEY.to_string(), json!(count));
            }
            (_, Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
                flat.insert(key.clone(), value.clone());
            }
            (_, Value::Null) => {}
            (_, nested) => {
                flat.insert(key.clone(), Value::String(nested.to_string()));
            }
        }
    }
    flat
}

/// Chroma `where` clause, or `None` for an empty filter.
fn compile_where(filter: &VectorFilter) -> Option<Value> {
    let mut clauses = Vec::new();
    for predicate in filter.predicates() {
        let field = predicate.field();
        if field.is_list() {
            clauses.push(json!({ format!("{TAG_PREFIX}{}", predicate.value()): { "$eq": true } }));
            if matches!(predicate, FilterPredicate::Eq { .. }) {
                clauses.push(json!({ TAG_COUNT_KEY: { "$eq": 1 } }));
            }
        } else {
            clauses.push(json!({ field.payload_key(): { "$eq": predicate.value() } }));
        }
    }
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "$and": clauses })),
    }
}

impl VectorStore for ChromaStore {
    fn name(&self) -> &str {
        "chroma"
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), AdapterError> {
        if points.is_empty() {
            return Ok(());
        }
        let id = self.get_or_create(collection).await?;
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        let embeddings: Vec<&[f32]> = points.iter().map(|p| p.vector.as_slice()).collect();
        let metadatas: Vec<Map<String, Value>> = points.iter().map(|p| flatten_payload(&p.payload)).collect();

        let response = self
            .request(Method::POST, &format!("/collections/{id}/upsert"))
            .json(&json!({ "ids": ids, "embeddings": embeddings, "metadatas": metadatas }))
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
        let Some(id) = self.lookup(collection).await? else {
            return Ok(Vec::new());
        };
        let mut body = json!({
            "query_embeddings": [vector],
            "n_results": top_k,
            "include": ["metadatas", "distances"],
        });
        if let Some(clause) = compile_where(filter) {
            body["where"] = clause;
        }
        let response = self
            .request(Method::POST, &format!("/collections/{id}/query"))
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let result: ChromaQueryResponse = read_json(check(response).await?).await?;

        let ids = result.ids.into_iter().next().unwrap_or_default();
        let distances = result
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        if distances.len() != ids.len() {
            return Err(AdapterError::InvalidResponse(
                "chroma returned mismatched ids and distances".to_string(),
            ));
        }
        let mut metadatas = result
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default()
            .into_iter();

        Ok(ids
            .into_iter()
            .zip(distances)
            .map(|(id, distance)| VectorMatch {
                id,
                score: distance,
                kind: ScoreKind::Distance,
                payload: metadatas.next().flatten().unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_ids(&self, collection: &str, ids: &[String]) -> Result<(), AdapterError> {
        if ids.is_empty() {
            return Ok(());
        }
        let Some(id) = self.lookup(collection).await? else {
            return Ok(());
        };
        let response = self
            .request(Method::POST, &format!("/collections/{id}/delete"))
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .map_err(send_error)?;
        check(response).await?;
        Ok(())
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        let Some(id) = self.lookup(collection).await? else {
            return self.sum_listed(collection).await;
        };
        let response = self
            .request(Method::GET, &format!("/collections/{id}/count"))
            .send()
            .await
            .map_err(send_error)?;
        let count: u64 = read_json(check(response).await?).await?;
        Ok(CollectionStats::counted(collection, count))
    }
}
