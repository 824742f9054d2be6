//! Document-store backend without a native vector index.
//!
//! Talks to a JSON command API (`{url}/api/json/v1/{keyspace}/{collection}`)
//! where each point is stored as a plain document. Collections are created
//! if absent. Queries page through every document and rank them with cosine
//! similarity in process; the filter is applied to payloads during that
//! scan rather than pushed to the server. Stats are not implemented and
//! always report zero.

use std::time::Duration;

use dashmap::DashSet;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use xmem_core::similarity::cosine_similarity;
use xmem_core::vector::store::VectorStore;
use xmem_types::error::AdapterError;
use xmem_types::vector::{CollectionStats, ScoreKind, VectorFilter, VectorMatch, VectorPoint};

use crate::http::{base_url, build_client, check, read_json, send_error};

/// Upper bound on documents scanned by one query.
const MAX_SCAN: usize = 50_000;

const COLLECTION_MISSING: &str = "COLLECTION_NOT_EXIST";

pub struct DocumentStore {
    client: reqwest::Client,
    base_url: String,
    keyspace: String,
    token: Option<SecretString>,
    provisioned: DashSet<String>,
}

impl DocumentStore {
    pub fn new(
        url: &str,
        keyspace: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, AdapterError> {
        if url.trim().is_empty() {
            return Err(AdapterError::InvalidConfig("document store url is required".to_string()));
        }
        let keyspace = if keyspace.is_empty() { "default_keyspace" } else { keyspace };
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url(url),
            keyspace: keyspace.to_string(),
            token,
            provisioned: DashSet::new(),
        })
    }

    /// Run one command. `Ok(None)` means the collection does not exist.
    async fn command(&self, path: &str, body: Value) -> Result<Option<CommandResponse>, AdapterError> {
        let mut request = self
            .client
            .post(format!("{}/api/json/v1/{}", self.base_url, path))
            .json(&body);
        if let Some(token) = &self.token {
            request = request.header("Token", token.expose_secret());
        }
        let response = request.send().await.map_err(send_error)?;
        let parsed: CommandResponse = read_json(check(response).await?).await?;

        if let Some(error) = parsed.errors.first() {
            if error.error_code.as_deref() == Some(COLLECTION_MISSING) {
                return Ok(None);
            }
            return Err(AdapterError::Rejected {
                status: 200,
                message: error.message.clone().unwrap_or_default(),
            });
        }
        Ok(Some(parsed))
    }

    fn collection_path(&self, collection: &str) -> String {
        format!("{}/{}", self.keyspace, collection)
    }

    async fn ensure_collection(&self, collection: &str) -> Result<(), AdapterError> {
        if self.provisioned.contains(collection) {
            return Ok(());
        }
        self.command(&self.keyspace, json!({ "createCollection": { "name": collection } }))
            .await?;
        self.provisioned.insert(collection.to_string());
        Ok(())
    }
}

#[derive(Deserialize, Default)]
struct CommandResponse {
    #[serde(default)]
    data: Option<CommandData>,
    #[serde(default)]
    errors: Vec<CommandError>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CommandData {
    #[serde(default)]
    documents: Vec<StoredPoint>,
    #[serde(default)]
    next_page_state: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Deserialize)]
struct StoredPoint {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    embedding: Vec<f32>,
    #[serde(default)]
    payload: Map<String, Value>,
}

impl VectorStore for DocumentStore {
    fn name(&self) -> &str {
        "document"
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), AdapterError> {
        if points.is_empty() {
            return Ok(());
        }
        self.ensure_collection(collection).await?;
        let path = self.collection_path(collection);
        for point in points {
            let body = json!({
                "findOneAndReplace": {
                    "filter": { "_id": point.id },
                    "replacement": {
                        "_id": point.id,
                        "embedding": point.vector,
                        "payload": point.payload,
                    },
                    "options": { "upsert": true },
                }
            });
            if self.command(&path, body).await?.is_none() {
                // Dropped between provisioning and write.
                self.provisioned.remove(collection);
                return Err(AdapterError::Rejected {
                    status: 404,
                    message: format!("collection {collection} disappeared"),
                });
            }
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
        let path = self.collection_path(collection);
        let mut scored: Vec<VectorMatch> = Vec::new();
        let mut scanned = 0usize;
        let mut page_state: Option<String> = None;

        loop {
            let mut options = json!({});
            if let Some(state) = &page_state {
                options["pageState"] = json!(state);
            }
            let body = json!({ "find": { "filter": {}, "options": options } });
            let Some(response) = self.command(&path, body).await? else {
                return Ok(Vec::new());
            };
            let data = response.data.unwrap_or_default();
            scanned += data.documents.len();

            for doc in data.documents {
                if doc.embedding.len() != vector.len() || !filter.matches(&doc.payload) {
                    continue;
                }
                scored.push(VectorMatch {
                    score: cosine_similarity(vector, &doc.embedding),
                    id: doc.id,
                    kind: ScoreKind::Similarity,
                    payload: doc.payload,
                });
            }

            match data.next_page_state {
                Some(next) if scanned < MAX_SCAN => page_state = Some(next),
                Some(_) => {
                    tracing::warn!(collection, scanned, "document store scan truncated");
                    break;
                }
                None => break,
            }
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_ids(&self, collection: &str, ids: &[String]) -> Result<(), AdapterError> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = json!({ "deleteMany": { "filter": { "_id": { "$in": ids } } } });
        self.command(&self.collection_path(collection), body).await?;
        Ok(())
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        Ok(CollectionStats::unimplemented(collection))
    }
}
