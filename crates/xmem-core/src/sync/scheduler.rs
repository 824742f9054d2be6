//! Source synchronization scheduler.
//!
//! Syncs every enabled source config, each in isolation: a failing or slow
//! source becomes a failed [`SyncResult`] and never aborts the batch.
//! Attempts run concurrently and results come back in input order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use xmem_types::error::{MemoryError, SyncError};
use xmem_types::memory::CreateMemoryRequest;
use xmem_types::source::{SourceConfig, SyncResult};
use xmem_types::tenant::TenantId;

use super::connector::BoxSourceConnector;
use crate::repository::memory::MemoryRepository;
use crate::repository::project::ProjectRepository;
use crate::repository::source::SourceConfigRepository;
use crate::service::memory::MemoryService;

pub struct SyncScheduler<S, M, P>
where
    S: SourceConfigRepository,
    M: MemoryRepository,
    P: ProjectRepository,
{
    sources: S,
    memories: Arc<MemoryService<M, P>>,
    connectors: HashMap<String, BoxSourceConnector>,
    fallback: Option<BoxSourceConnector>,
    source_timeout: Duration,
}

impl<S, M, P> SyncScheduler<S, M, P>
where
    S: SourceConfigRepository,
    M: MemoryRepository,
    P: ProjectRepository,
{
    pub fn new(sources: S, memories: Arc<MemoryService<M, P>>, source_timeout: Duration) -> Self {
        Self {
            sources,
            memories,
            connectors: HashMap::new(),
            fallback: None,
            source_timeout,
        }
    }

    /// Route configs named `source` to `connector`.
    pub fn with_connector(mut self, source: impl Into<String>, connector: BoxSourceConnector) -> Self {
        self.connectors.insert(source.into(), connector);
        self
    }

    /// Connector for sources without a dedicated one.
    pub fn with_fallback(mut self, connector: BoxSourceConnector) -> Self {
        self.fallback = Some(connector);
        self
    }

    /// Sync every enabled config, optionally for one tenant only.
    ///
    /// Fails only if the configs themselves cannot be listed.
    pub async fn sync_enabled(
        &self,
        scope: Option<&TenantId>,
    ) -> Result<Vec<SyncResult>, MemoryError> {
        let configs = self.sources.list_enabled(scope).await?;
        Ok(self.sync_all(&configs).await)
    }

    /// Sync enabled configs whose interval has elapsed at `now`.
    pub async fn sync_due(&self, now: DateTime<Utc>) -> Result<Vec<SyncResult>, MemoryError> {
        let configs: Vec<SourceConfig> = self
            .sources
            .list_enabled(None)
            .await?
            .into_iter()
            .filter(|c| c.is_due(now))
            .collect();
        Ok(self.sync_all(&configs).await)
    }

    /// One result per config, in the same order.
    pub async fn sync_all(&self, configs: &[SourceConfig]) -> Vec<SyncResult> {
        join_all(configs.iter().map(|config| self.sync_one(config))).await
    }

    /// Sync a single config. Never fails; errors become `success: false`.
    pub async fn sync_one(&self, config: &SourceConfig) -> SyncResult {
        let started = Utc::now();
        let attempt = tokio::time::timeout(self.source_timeout, self.pull(config)).await;
        let outcome = match attempt {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.source_timeout.as_secs())),
        };

        match outcome {
            Ok(count) => {
                if let Err(e) = self.sources.record_sync(&config.id, started).await {
                    tracing::warn!(source = %config.source, tenant_id = %config.tenant_id, error = %e, "failed to record sync time");
                }
                tracing::info!(source = %config.source, tenant_id = %config.tenant_id, items = count, "source synced");
                SyncResult {
                    success: true,
                    message: format!("synced {count} items from {}", config.source),
                    source: config.source.clone(),
                    tenant_id: config.tenant_id.clone(),
                    items_synced: Some(count),
                }
            }
            Err(e) => {
                tracing::warn!(source = %config.source, tenant_id = %config.tenant_id, error = %e, "source sync failed");
                SyncResult {
                    success: false,
                    message: format!("failed to sync data from {}: {}", config.source, public_reason(&e)),
                    source: config.source.clone(),
                    tenant_id: config.tenant_id.clone(),
                    items_synced: None,
                }
            }
        }
    }

    /// Run [`sync_due`](Self::sync_due) every `interval` until `cancel` fires.
    pub fn spawn_periodic(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()>
    where
        S: 'static,
        M: 'static,
        P: 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("sync scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.sync_due(Utc::now()).await {
                            Ok(results) if !results.is_empty() => {
                                let failed = results.iter().filter(|r| !r.success).count();
                                tracing::info!(attempted = results.len(), failed, "periodic sync finished");
                            }
                            Ok(_) => {}
                            Err(e) => tracing::warn!(error = %e, "periodic sync could not list sources"),
                        }
                    }
                }
            }
        })
    }

    /// Fetch from the connector and store each item as a memory.
    async fn pull(&self, config: &SourceConfig) -> Result<u64, SyncError> {
        let connector = self
            .connectors
            .get(&config.source)
            .or(self.fallback.as_ref())
            .ok_or_else(|| SyncError::NoConnector(config.source.clone()))?;
        let items = connector.fetch(config).await?;

        let mut stored = 0u64;
        for item in items {
            let mut metadata = item.metadata.unwrap_or_default();
            metadata.insert("source".to_string(), config.source.clone().into());
            metadata.insert("synced_at".to_string(), Utc::now().to_rfc3339().into());
            let request = CreateMemoryRequest::new(item.content)
                .with_tags(item.tags)
                .with_metadata(metadata);
            match self.memories.create(&config.tenant_id, request).await {
                Ok(_) => stored += 1,
                Err(MemoryError::Validation(msg)) => {
                    tracing::debug!(source = %config.source, reason = %msg, "skipping invalid synced item");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(stored)
    }
}

/// Failure reason safe to hand back to a tenant: no URLs or credentials.
fn public_reason(err: &SyncError) -> String {
    match err {
        SyncError::Network(_) => "network error".to_string(),
        SyncError::InvalidCredential(_) => "invalid credential".to_string(),
        SyncError::InvalidConfig(_) => "invalid source configuration".to_string(),
        SyncError::NoConnector(_) => "source not supported".to_string(),
        SyncError::Timeout(secs) => format!("timed out after {secs}s"),
        SyncError::Memory(e) => e.public_message(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeConnector, InMemorySourceRepository, in_process_service};
    use xmem_types::source::{SyncedItem, UpsertSourceConfig};

    fn item(content: &str) -> SyncedItem {
        SyncedItem {
            content: content.to_string(),
            tags: vec!["synced".to_string()],
            metadata: None,
        }
    }

    async fn seeded(sources: &[&str]) -> Arc<InMemorySourceRepository> {
        let repo = Arc::new(InMemorySourceRepository::default());
        for source in sources {
            repo.upsert(
                &TenantId::new("t1"),
                &UpsertSourceConfig {
                    source: source.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let repo = seeded(&["notion", "github", "slack"]).await;
        let (service, memories) = in_process_service();
        let scheduler = SyncScheduler::new(Arc::clone(&repo), service, Duration::from_secs(5))
            .with_fallback(BoxSourceConnector::new(FakeConnector {
                items: vec![item("weekly notes")],
                failing_sources: vec!["github".to_string()],
                delay: None,
            }));

        let results = scheduler.sync_enabled(None).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
        assert_eq!(results[1].source, "github");
        assert_eq!(results[1].message, "failed to sync data from github: network error");
        assert!(!results[1].message.contains("peer"));

        assert!(repo.last_sync("notion").is_some());
        assert!(repo.last_sync("github").is_none());
        assert_eq!(memories.all().len(), 2);
        assert!(memories.all().iter().all(|m| m.metadata.contains_key("source")));
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let repo = seeded(&["slow"]).await;
        let (service, _) = in_process_service();
        let scheduler = SyncScheduler::new(Arc::clone(&repo), service, Duration::from_millis(20))
            .with_connector(
                "slow",
                BoxSourceConnector::new(FakeConnector {
                    items: vec![],
                    failing_sources: vec![],
                    delay: Some(Duration::from_millis(200)),
                }),
            );

        let results = scheduler.sync_enabled(None).await.unwrap();
        assert!(!results[0].success);
        assert!(results[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_connector_reported() {
        let repo = seeded(&["unknown"]).await;
        let (service, _) = in_process_service();
        let scheduler = SyncScheduler::new(repo, service, Duration::from_secs(1));
        let results = scheduler.sync_enabled(None).await.unwrap();
        assert!(!results[0].success);
        assert!(results[0].message.contains("not supported"));
    }

    #[tokio::test]
    async fn test_scope_and_disabled_configs() {
        let repo = seeded(&["notion"]).await;
        repo.upsert(
            &TenantId::new("t1"),
            &UpsertSourceConfig {
                source: "paused".to_string(),
                is_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        repo.upsert(
            &TenantId::new("t2"),
            &UpsertSourceConfig {
                source: "notion".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let (service, _) = in_process_service();
        let scheduler = SyncScheduler::new(repo, service, Duration::from_secs(1)).with_fallback(
            BoxSourceConnector::new(FakeConnector {
                items: vec![],
                failing_sources: vec![],
                delay: None,
            }),
        );

        let scoped = scheduler.sync_enabled(Some(&TenantId::new("t2"))).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].tenant_id, TenantId::new("t2"));

        let all = scheduler.sync_enabled(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_sync_due_skips_recent() {
        let repo = seeded(&["notion"]).await;
        let (service, _) = in_process_service();
        let scheduler = SyncScheduler::new(Arc::clone(&repo), service, Duration::from_secs(1))
            .with_fallback(BoxSourceConnector::new(FakeConnector {
                items: vec![],
                failing_sources: vec![],
                delay: None,
            }));

        assert_eq!(scheduler.sync_due(Utc::now()).await.unwrap().len(), 1);
        assert!(scheduler.sync_due(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_periodic_stops_on_cancel() {
        let repo = seeded(&["notion"]).await;
        let (service, _) = in_process_service();
        let scheduler = Arc::new(
            SyncScheduler::new(Arc::clone(&repo), service, Duration::from_secs(1)).with_fallback(
                BoxSourceConnector::new(FakeConnector {
                    items: vec![],
                    failing_sources: vec![],
                    delay: None,
                }),
            ),
        );
        let cancel = CancellationToken::new();
        let handle = scheduler.spawn_periodic(Duration::from_millis(10), cancel.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert!(repo.last_sync("notion").is_some());
    }
}
