//! Default HTTP source connector.
//!
//! Polls `GET {webhook_url}?since=<rfc3339>` with the config's API key as a
//! bearer token and expects `{"items": [{content, tags?, metadata?}]}`.
//! `since` is omitted on the first sync.

use std::time::Duration;

use chrono::SecondsFormat;
use serde::Deserialize;

use xmem_core::sync::connector::SourceConnector;
use xmem_types::error::SyncError;
use xmem_types::source::{SourceConfig, SyncedItem};

pub struct HttpSourceConnector {
    client: reqwest::Client,
}

impl HttpSourceConnector {
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[derive(Deserialize)]
struct FeedResponse {
    #[serde(default)]
    items: Vec<SyncedItem>,
}

impl SourceConnector for HttpSourceConnector {
    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<SyncedItem>, SyncError> {
        let url = config
            .webhook_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SyncError::InvalidConfig(format!("source '{}' has no webhook_url", config.source)))?;

        let mut request = self.client.get(url);
        if let Some(since) = config.last_sync_at {
            request = request.query(&[("since", since.to_rfc3339_opts(SecondsFormat::Secs, true))]);
        }
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        let status = response.status();
        match status.as_u16() {
            401 | 403 => return Err(SyncError::InvalidCredential(config.source.clone())),
            _ if !status.is_success() => {
                return Err(SyncError::Network(format!("source responded with HTTP {status}")));
            }
            _ => {}
        }

        let feed: FeedResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Network(format!("invalid feed body: {e}")))?;
        tracing::debug!(source = %config.source, items = feed.items.len(), "fetched source feed");
        Ok(feed.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use uuid::Uuid;
    use xmem_types::tenant::TenantId;

    fn config(url: Option<String>, last_sync: bool) -> SourceConfig {
        SourceConfig {
            id: Uuid::now_v7(),
            tenant_id: TenantId::new("t1"),
            source: "notion".to_string(),
            api_key: Some("src-key".to_string()),
            api_secret: None,
            webhook_url: url,
            sync_interval_secs: 3600,
            is_enabled: true,
            last_sync_at: last_sync.then(|| Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn connector() -> HttpSourceConnector {
        HttpSourceConnector::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_passes_since_and_bearer() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/feed")
            .match_query(Matcher::UrlEncoded("since".into(), "2026-01-02T03:04:05Z".into()))
            .match_header("authorization", "Bearer src-key")
            .with_status(200)
            .with_body(r#"{"items": [{"content": "page one", "tags": ["wiki"]}, {"content": "page two"}]}"#)
            .create_async()
            .await;

        let items = connector()
            .fetch(&config(Some(format!("{}/feed", server.url())), true))
            .await
            .unwrap();
        m.assert_async().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].tags, vec!["wiki"]);
        assert!(items[1].tags.is_empty());
    }

    #[tokio::test]
    async fn test_first_sync_succeeds_without_since() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/feed")
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;
        connector()
            .fetch(&config(Some(format!("{}/feed", server.url())), false))
            .await
            .unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_failure_is_invalid_credential() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/feed").with_status(401).create_async().await;
        let err = connector()
            .fetch(&config(Some(format!("{}/feed", server.url())), false))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidCredential(ref s) if s == "notion"));
    }

    #[tokio::test]
    async fn test_missing_url_is_invalid_config() {
        let err = connector().fetch(&config(None, false)).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }
}
