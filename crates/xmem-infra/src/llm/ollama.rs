//! Ollama embedding and completion provider.
//!
//! Local server, no credential: `POST /api/embeddings` for vectors and
//! `POST /api/generate` (non-streaming) for completions.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use xmem_core::llm::provider::LlmProvider;
use xmem_types::error::AdapterError;

use crate::http::{base_url, build_client, check, read_json, send_error};

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base: &str, model: &str, timeout: Duration) -> Result<Self, AdapterError> {
        let base = if base.trim().is_empty() { "http://localhost:11434" } else { base };
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url(base),
            model: model.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct OllamaEmbedding {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct OllamaGenerate {
    response: String,
}

impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await
            .map_err(send_error)?;
        let body: OllamaEmbedding = read_json(check(response).await?).await?;
        if body.embedding.is_empty() {
            return Err(AdapterError::InvalidResponse("empty embedding".to_string()));
        }
        Ok(body.embedding)
    }

    async fn complete(&self, prompt: &str) -> Result<String, AdapterError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&json!({ "model": self.model, "prompt": prompt, "stream": false }))
            .send()
            .await
            .map_err(send_error)?;
        let body: OllamaGenerate = read_json(check(response).await?).await?;
        Ok(body.response)
    }
}
