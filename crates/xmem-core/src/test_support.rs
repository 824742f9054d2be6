//! In-crate fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use xmem_types::config::RetrievalConfig;
use xmem_types::error::{AdapterError, RepositoryError, SyncError};
use xmem_types::memory::{Memory, MemoryListFilter};
use xmem_types::project::Project;
use xmem_types::provider::ProviderRole;
use xmem_types::source::{SourceConfig, SyncedItem, UpsertSourceConfig};
use xmem_types::tenant::TenantId;
use xmem_types::vector::{CollectionStats, ScoreKind, VectorFilter, VectorMatch, VectorPoint};

use crate::embedding::cache::EmbeddingCache;
use crate::embedding::service::EmbeddingService;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::provider::LlmProvider;
use crate::registry::{ProviderHandle, ProviderRegistry};
use crate::repository::memory::MemoryRepository;
use crate::repository::project::ProjectRepository;
use crate::repository::source::SourceConfigRepository;
use crate::service::memory::{MemoryService, memory_payload};
use crate::similarity::cosine_distance;
use crate::sync::connector::SourceConnector;
use crate::vector::store::VectorStore;

// --- Embedder ---

/// Deterministic bag-of-words embedder: each lowercase word bumps one bucket.
pub struct FakeEmbedder {
    dimension: usize,
    delay: Option<Duration>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            delay: None,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(16)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn vector_for(dimension: usize, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; dimension];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            v[hash as usize % dimension] += 1.0;
        }
        v
    }
}

impl LlmProvider for FakeEmbedder {
    fn name(&self) -> &str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-bow"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AdapterError::Unavailable("connection refused".to_string()));
        }
        Ok(Self::vector_for(self.dimension, text))
    }
}

// --- Vector store ---

/// In-memory vector store reporting cosine distance.
pub struct FakeVectorStore {
    name: String,
    collections: Mutex<HashMap<String, HashMap<String, VectorPoint>>>,
    fail: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FakeVectorStore {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_failing_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn point_count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    fn check(&self) -> Result<(), AdapterError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(AdapterError::Unavailable("fake backend down".to_string()))
        } else {
            Ok(())
        }
    }
}

impl VectorStore for Arc<FakeVectorStore> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), AdapterError> {
        self.check()?;
        let mut collections = self.collections.lock().unwrap();
        let entries = collections.entry(collection.to_string()).or_default();
        for point in points {
            entries.insert(point.id.clone(), point.clone());
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
        self.check()?;
        let collections = self.collections.lock().unwrap();
        let Some(entries) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut matches: Vec<VectorMatch> = entries
            .values()
            .filter(|p| filter.matches(&p.payload))
            .map(|p| VectorMatch {
                id: p.id.clone(),
                score: cosine_distance(vector, &p.vector),
                kind: ScoreKind::Distance,
                payload: p.payload.clone(),
            })
            .collect();
        matches.sort_by(|a, b| a.score.total_cmp(&b.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_ids(&self, collection: &str, ids: &[String]) -> Result<(), AdapterError> {
        self.check()?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AdapterError::Unavailable("delete failed".to_string()));
        }
        if let Some(entries) = self.collections.lock().unwrap().get_mut(collection) {
            for id in ids {
                entries.remove(id);
            }
        }
        Ok(())
    }

    /// Like the point-oriented backends: a missing collection reports the
    /// total across every collection.
    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        self.check()?;
        let collections = self.collections.lock().unwrap();
        match collections.get(collection) {
            Some(entries) => Ok(CollectionStats::counted(collection, entries.len() as u64)),
            None => {
                let total: usize = collections.values().map(|c| c.len()).sum();
                Ok(CollectionStats::aggregate(collection, total as u64))
            }
        }
    }
}

impl VectorStore for FakeVectorStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, _collection: &str, _points: &[VectorPoint]) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn query(
        &self,
        _collection: &str,
        _vector: &[f32],
        _top_k: usize,
        _filter: &VectorFilter,
    ) -> Result<Vec<VectorMatch>, AdapterError> {
        Ok(Vec::new())
    }

    async fn delete_ids(&self, _collection: &str, _ids: &[String]) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, AdapterError> {
        Ok(CollectionStats::counted(collection, 0))
    }
}

// --- Repositories ---

#[derive(Default)]
pub struct InMemoryMemoryRepository {
    rows: Mutex<Vec<Memory>>,
}

impl MemoryRepository for Arc<InMemoryMemoryRepository> {
    async fn create(&self, memory: &Memory) -> Result<Memory, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|m| m.id == memory.id) {
            return Err(RepositoryError::Conflict("duplicate id".to_string()));
        }
        rows.push(memory.clone());
        Ok(memory.clone())
    }

    async fn get(&self, tenant: &TenantId, id: &Uuid) -> Result<Option<Memory>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|m| &m.id == id && &m.tenant_id == tenant)
            .cloned())
    }

    async fn get_many(&self, tenant: &TenantId, ids: &[Uuid]) -> Result<Vec<Memory>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.tenant_id == tenant && ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn update(&self, memory: &Memory) -> Result<Memory, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|m| m.id == memory.id && m.tenant_id == memory.tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        *row = memory.clone();
        Ok(memory.clone())
    }

    async fn delete(&self, tenant: &TenantId, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|m| !(&m.id == id && &m.tenant_id == tenant));
        Ok(rows.len() != before)
    }

    async fn list(
        &self,
        tenant: &TenantId,
        filter: &MemoryListFilter,
    ) -> Result<Vec<Memory>, RepositoryError> {
        let mut rows: Vec<Memory> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.tenant_id == tenant)
            .filter(|m| filter.include_archived || !m.is_archived)
            .filter(|m| filter.project_id.is_none() || m.project_id == filter.project_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn scan_candidates(
        &self,
        tenant: &TenantId,
        filter: &VectorFilter,
    ) -> Result<Vec<Memory>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.tenant_id == tenant && !m.is_archived && m.embedding.is_some())
            .filter(|m| filter.matches(&memory_payload(m)))
            .cloned()
            .collect())
    }

    async fn count(&self, tenant: &TenantId) -> Result<u64, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.tenant_id == tenant && !m.is_archived)
            .count() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryProjectRepository {
    rows: Mutex<Vec<Project>>,
}

impl ProjectRepository for Arc<InMemoryProjectRepository> {
    async fn create(&self, project: &Project) -> Result<Project, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|p| p.tenant_id == project.tenant_id && p.name == project.name)
        {
            return Err(RepositoryError::Conflict(format!(
                "project '{}' already exists",
                project.name
            )));
        }
        rows.push(project.clone());
        Ok(project.clone())
    }

    async fn get(&self, tenant: &TenantId, id: &Uuid) -> Result<Option<Project>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| &p.id == id && &p.tenant_id == tenant)
            .cloned())
    }

    async fn list(&self, tenant: &TenantId) -> Result<Vec<Project>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|p| &p.tenant_id == tenant)
            .cloned()
            .collect())
    }

    async fn delete(&self, tenant: &TenantId, id: &Uuid) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|p| !(&p.id == id && &p.tenant_id == tenant));
        if rows.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(0)
    }
}

#[derive(Default)]
pub struct InMemorySourceRepository {
    rows: Mutex<Vec<SourceConfig>>,
}

impl InMemorySourceRepository {
    pub fn last_sync(&self, source: &str) -> Option<DateTime<Utc>> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.source == source)
            .and_then(|c| c.last_sync_at)
    }
}

impl SourceConfigRepository for Arc<InMemorySourceRepository> {
    async fn upsert(
        &self,
        tenant: &TenantId,
        config: &UpsertSourceConfig,
    ) -> Result<SourceConfig, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        if let Some(row) = rows
            .iter_mut()
            .find(|c| &c.tenant_id == tenant && c.source == config.source)
        {
            row.api_key = config.api_key.clone();
            row.api_secret = config.api_secret.clone();
            row.webhook_url = config.webhook_url.clone();
            if let Some(interval) = config.sync_interval_secs {
                row.sync_interval_secs = interval;
            }
            if let Some(enabled) = config.is_enabled {
                row.is_enabled = enabled;
            }
            row.updated_at = now;
            return Ok(row.clone());
        }
        let row = SourceConfig {
            id: Uuid::now_v7(),
            tenant_id: tenant.clone(),
            source: config.source.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            webhook_url: config.webhook_url.clone(),
            sync_interval_secs: config.sync_interval_secs.unwrap_or(3600),
            is_enabled: config.is_enabled.unwrap_or(true),
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn get(&self, tenant: &TenantId, source: &str) -> Result<Option<SourceConfig>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| &c.tenant_id == tenant && c.source == source)
            .cloned())
    }

    async fn list(&self, tenant: &TenantId) -> Result<Vec<SourceConfig>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| &c.tenant_id == tenant)
            .cloned()
            .collect())
    }

    async fn list_enabled(&self, scope: Option<&TenantId>) -> Result<Vec<SourceConfig>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.is_enabled && scope.is_none_or(|t| &c.tenant_id == t))
            .cloned()
            .collect())
    }

    async fn delete(&self, tenant: &TenantId, source: &str) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| !(&c.tenant_id == tenant && c.source == source));
        Ok(rows.len() != before)
    }

    async fn record_sync(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.last_sync_at = Some(at);
        Ok(())
    }
}

// --- Source connector ---

/// Connector returning canned items, or failing for chosen sources.
pub struct FakeConnector {
    pub items: Vec<SyncedItem>,
    pub failing_sources: Vec<String>,
    pub delay: Option<Duration>,
}

impl SourceConnector for FakeConnector {
    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<SyncedItem>, SyncError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_sources.contains(&config.source) {
            return Err(SyncError::Network("connection reset by peer".to_string()));
        }
        Ok(self.items.clone())
    }
}

// --- Engine harness ---

pub type TestMemoryService =
    MemoryService<Arc<InMemoryMemoryRepository>, Arc<InMemoryProjectRepository>>;

/// In-process engine over in-memory repositories and a 64-wide fake embedder.
pub fn in_process_service() -> (Arc<TestMemoryService>, Arc<InMemoryMemoryRepository>) {
    let registry = Arc::new(ProviderRegistry::new());
    registry
        .register_provider(
            ProviderRole::Llm,
            "fake",
            ProviderHandle::llm(BoxLlmProvider::new(FakeEmbedder::new(64))),
        )
        .unwrap();
    let embeddings = Arc::new(EmbeddingService::new(
        Arc::clone(&registry),
        EmbeddingCache::new(Duration::from_secs(60), 100),
        Duration::from_secs(5),
        Some(64),
    ));
    let memories = Arc::new(InMemoryMemoryRepository::default());
    let service = MemoryService::new(
        Arc::clone(&memories),
        Arc::new(InMemoryProjectRepository::default()),
        registry,
        embeddings,
        RetrievalConfig::default(),
    );
    (Arc::new(service), memories)
}

impl InMemoryMemoryRepository {
    pub fn all(&self) -> Vec<Memory> {
        self.rows.lock().unwrap().clone()
    }
}
