//! Managed-index backend (Pinecone data plane).
//!
//! The index is created outside xmem; each collection maps to a namespace
//! inside it. An API key is mandatory. Metadata only holds scalars and
//! string lists, so nested payload values are dropped on write.

use std::time::Duration;

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use xmem_core::vector::store::VectorStore;
use xmem_types::error::AdapterError;
use xmem_types::vector::{CollectionStats, ScoreKind, VectorFilter, VectorMatch, VectorPoint};

use crate::http::{base_url, build_client, check, read_json, send_error};

pub struct PineconeStore {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl PineconeStore {
    /// `url` overrides the host derived from `index` and `environment`.
    pub fn new(
        url: &str,
        index: &str,
        environment: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, AdapterError> {
        let api_key = api_key
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| AdapterError::InvalidConfig("pinecone requires an api key".to_string()))?;
        let host = if !url.trim().is_empty() {
            base_url(url)
        } else if !index.is_empty() && !environment.is_empty() {
            format!("https://{index}-{environment}.svc.{environment}.pinecone.io")
        } else {
            return Err(AdapterError::InvalidConfig(
                "pinecone needs either a url or an index and environment".to_string(),
            ));
        };
        Ok(Self {
            client: build_client(timeout)?,
            base_url: host,
            api_key,
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("Api-Key", self.api_key.expose_secret())
    }
}

#[derive(Deserialize)]
struct PineconeQueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Deserialize)]
struct PineconeMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PineconeIndexStats {
    #[serde(default)]
    namespaces: std::collections::HashMap<String, PineconeNamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PineconeNamespaceStats {
    #[serde(default)]
    vector_count: u64,
}

/// Keep only values Pinecone metadata accepts.
fn metadata_for(payload: &Map<String, Value>) -> Map<String, Value> {
    payload
        .iter()
        .filter(|(_, value)| match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => true,
            Value::Array(items) => items.iter().all(Value::is_string),
            _ => false,
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Pinecone metadata filter. List fields use `$in`, which matches on any
/// element; exact single-tag equality is left to the caller's re-check.
fn compile_filter(filter: &VectorFilter) -> Option<Value> {
    let clauses: Vec<Value> = filter
        .predicates()
        .iter()
        .map(|predicate| {
            let field = predicate.field();
            if field.is_list() {
                json!({ field.payload_key(): { "$in": [predicate.value()] } })
            } else {
                json!({ field.payload_key(): { "$eq": predicate.value() } })
            }
        })
        .collect();
    match clauses.len() {
        0 => None,
        _ => Some(json!({ "$and": clauses })),
    }
}

impl VectorStore for PineconeStore {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), AdapterError> {
        if points.is_empty() {
            return Ok(());
        }
        let vectors: Vec<Value> = points
            .iter()
            .map(|p| json!({ "id": p.id, "values": p.vector, "metadata": metadata_for(&p.payload) }))
            .collect();
        let response = self
            .post("/vectors/upsert")
            .json(&json!({ "vectors": vectors, "namespace": collection }))
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
            "topK": top_k,
            "includeMetadata": true,
            "namespace": collection,
        });
        if let Some(clause) = compile_filter(filter) {
            body["filter"] = clause;
        }
        let response = self
            .post("/query")
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let result: PineconeQueryResponse = read_json(check(response).await?).await?;

        Ok(result
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                kind: ScoreKind::Similarity,
                payload: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_ids(&self, collection: &str, ids: &[String]) -> Result<(), AdapterError> {
        if ids.is_empty() {
            return Ok(());
        }
        let response = self
            .post("/vectors/delete")
            .json(&json!({ "ids": ids, "namespace": collection }))
            .send()
            .await
            .map_err(send_error)?;
        check(response).await?;
        Ok(())
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        let response = self
            .post("/describe_index_stats")
            .json(&json!({}))
            .send()
            .await
            .map_err(send_error)?;
        let stats: PineconeIndexStats = read_json(check(response).await?).await?;
        let count = stats
            .namespaces
            .get(collection)
            .map(|ns| ns.vector_count)
            .unwrap_or(0);
        Ok(CollectionStats::counted(collection, count))
    }
}
