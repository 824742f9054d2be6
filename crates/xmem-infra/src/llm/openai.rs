//! OpenAI-compatible embedding and completion provider.
//!
//! Serves any API that speaks `POST {base}/embeddings` and
//! `POST {base}/chat/completions` (OpenAI, Mistral, local proxies) by
//! swapping the base URL.
//!
//! The API key is wrapped in [`SecretString`] and only exposed when building
//! the `Authorization` header.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use xmem_core::llm::provider::LlmProvider;
use xmem_types::error::AdapterError;

use crate::http::{base_url, build_client, check, read_json, send_error};

const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Does not derive Debug so the key never reaches log output.
pub struct OpenAiProvider {
    client: reqwest::Client,
    provider_name: String,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    chat_model: String,
}

impl OpenAiProvider {
    pub fn new(
        base: &str,
        api_key: Option<SecretString>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, AdapterError> {
        if base.trim().is_empty() {
            return Err(AdapterError::InvalidConfig("embedding base_url is required".to_string()));
        }
        Ok(Self {
            client: build_client(timeout)?,
            provider_name: "openai".to_string(),
            base_url: base_url(base),
            api_key,
            model: model.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        })
    }

    /// Report a different provider name (e.g. for a compatible proxy).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        let response = self
            .post("/embeddings")
            .json(&json!({ "model": self.model, "input": text }))
            .send()
            .await
            .map_err(send_error)?;
        let body: EmbeddingResponse = read_json(check(response).await?).await?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AdapterError::InvalidResponse("no embedding in response".to_string()))
    }

    async fn complete(&self, prompt: &str) -> Result<String, AdapterError> {
        let response = self
            .post("/chat/completions")
            .json(&json!({
                "model": self.chat_model,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await
            .map_err(send_error)?;
        let body: ChatResponse = read_json(check(response).await?).await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AdapterError::InvalidResponse("no completion in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn provider(url: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            url,
            Some(SecretString::from("sk-test")),
            "text-embedding-3-small",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_embed_sends_model_and_bearer() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "text-embedding-3-small", "input": "hello"})))
            .with_status(200)
            .with_body(r#"{"data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}], "model": "text-embedding-3-small"}"#)
            .create_async()
            .await;

        let vector = provider(&server.url()).embed("hello").await.unwrap();
        m.assert_async().await;
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_auth_failure_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/embeddings")
            .with_status(401)
            .with_body(r#"{"error": {"message": "bad key"}}"#)
            .create_async()
            .await;
        let err = provider(&server.url()).embed("hello").await.unwrap_err();
        assert!(matches!(err, AdapterError::Rejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_embed_empty_data_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;
        let err = provider(&server.url()).embed("hello").await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_reads_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini"})))
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "hi there"}}]}"#)
            .create_async()
            .await;
        let text = provider(&server.url()).complete("hi").await.unwrap();
        assert_eq!(text, "hi there");
    }

    #[test]
    fn test_names() {
        let p = provider("http://localhost").with_name("mistral");
        assert_eq!(p.name(), "mistral");
        assert_eq!(p.model_name(), "text-embedding-3-small");
    }
}
