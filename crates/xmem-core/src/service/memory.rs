//! Memory retrieval engine.
//!
//! Tenant-scoped CRUD and semantic search over the canonical relational
//! store, optionally mirrored into a vector backend. The tenant is always an
//! explicit argument; nothing here infers it from content.
//!
//! Search takes one of two paths, picked per call from configuration and the
//! registry state:
//! - **delegated**: embed the query, ask the default vector adapter for the
//!   nearest points in the tenant's collection, then hydrate hits from the
//!   canonical store
//! - **in-process**: embed the query and score every non-archived tenant
//!   memory with cosine similarity
//!
//! Both paths return the same `SearchResult` shape and ordering rules.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use xmem_types::config::{RetrievalConfig, RetrievalStrategy};
use xmem_types::error::{MemoryError, RegistryError, RepositoryError};
use xmem_types::memory::{
    CreateMemoryRequest, Memory, MemoryListFilter, SearchRequest, SearchResult, UpdateMemoryRequest,
};
use xmem_types::tenant::TenantId;
use xmem_types::vector::{
    CollectionStats, FilterField, FilterPredicate, StatsSource, VectorFilter, VectorPoint,
};

use crate::embedding::service::EmbeddingService;
use crate::registry::ProviderRegistry;
use crate::repository::memory::MemoryRepository;
use crate::repository::project::ProjectRepository;
use crate::similarity::cosine_similarity;
use crate::vector::box_store::BoxVectorStore;

/// Extra matches requested from the backend beyond `2 * top_k`.
const OVERFETCH_SLACK: usize = 8;

/// Largest page a delegated search asks for while refilling.
const MAX_DELEGATED_FETCH: usize = 1_000;

/// Which retrieval substrate a call uses.
enum RetrievalPath {
    Delegated(Arc<BoxVectorStore>),
    InProcess,
}

/// Service orchestrating memory persistence, embedding and search.
///
/// Generic over repository traits -- xmem-core never depends on xmem-infra.
pub struct MemoryService<M: MemoryRepository, P: ProjectRepository> {
    memories: M,
    projects: P,
    registry: Arc<ProviderRegistry>,
    embeddings: Arc<EmbeddingService>,
    config: RetrievalConfig,
}

impl<M: MemoryRepository, P: ProjectRepository> MemoryService<M, P> {
    pub fn new(
        memories: M,
        projects: P,
        registry: Arc<ProviderRegistry>,
        embeddings: Arc<EmbeddingService>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            memories,
            projects,
            registry,
            embeddings,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn embeddings(&self) -> &EmbeddingService {
        &self.embeddings
    }

    /// Create a memory.
    ///
    /// Validates content and tags, embeds the content, mirrors the point into
    /// the tenant collection when delegation is active, then writes the
    /// canonical record. A vector-side failure fails the call before anything
    /// canonical is written.
    pub async fn create(
        &self,
        tenant: &TenantId,
        request: CreateMemoryRequest,
    ) -> Result<Memory, MemoryError> {
        let content = self.validate_content(&request.content)?;
        let tags = self.normalize_tags(request.tags)?;
        if let Some(project_id) = request.project_id {
            self.check_project(tenant, &project_id).await?;
        }

        let embedding = self.embed_for_write(&content).await?;
        let now = Utc::now();
        let memory = Memory {
            id: Uuid::now_v7(),
            tenant_id: tenant.clone(),
            content,
            memory_type: request.memory_type,
            tags,
            metadata: request.metadata.unwrap_or_default(),
            project_id: request.project_id,
            embedding: Some(embedding),
            version: 1,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };

        let path = self.retrieval_path()?;
        if let RetrievalPath::Delegated(store) = &path {
            self.upsert_point(store, &memory).await?;
        }

        match self.memories.create(&memory).await {
            Ok(created) => {
                tracing::debug!(tenant_id = %tenant, memory_id = %created.id, "memory created");
                Ok(created)
            }
            Err(e) => {
                if let RetrievalPath::Delegated(store) = &path {
                    self.remove_point(store, tenant, &memory.id).await;
                }
                Err(e.into())
            }
        }
    }

    /// Fetch one memory. Another tenant's id is `NotFound`.
    pub async fn get(&self, tenant: &TenantId, id: &Uuid) -> Result<Memory, MemoryError> {
        self.memories
            .get(tenant, id)
            .await?
            .ok_or(MemoryError::NotFound)
    }

    pub async fn list(
        &self,
        tenant: &TenantId,
        filter: &MemoryListFilter,
    ) -> Result<Vec<Memory>, MemoryError> {
        Ok(self.memories.list(tenant, filter).await?)
    }

    /// Update content, tags or metadata.
    ///
    /// Ownership is checked before anything is embedded or written. Content
    /// changes re-embed; every successful update bumps `version` by one.
    pub async fn update(
        &self,
        tenant: &TenantId,
        id: &Uuid,
        request: UpdateMemoryRequest,
    ) -> Result<Memory, MemoryError> {
        let mut memory = self.get(tenant, id).await?;

        if let Some(content) = request.content {
            let content = self.validate_content(&content)?;
            if content != memory.content || memory.embedding.is_none() {
                memory.embedding = Some(self.embed_for_write(&content).await?);
            }
            memory.content = content;
        }
        if let Some(tags) = request.tags {
            memory.tags = self.normalize_tags(tags)?;
        }
        if let Some(metadata) = request.metadata {
            memory.metadata = metadata;
        }
        memory.version += 1;
        memory.updated_at = Utc::now();

        let mut mirrored = None;
        if !memory.is_archived {
            if let RetrievalPath::Delegated(store) = self.retrieval_path()? {
                self.upsert_point(&store, &memory).await?;
                mirrored = Some(store);
            }
        }

        match self.memories.update(&memory).await {
            Ok(updated) => Ok(updated),
            Err(RepositoryError::NotFound) => {
                // Deleted concurrently; take back the point just written.
                if let Some(store) = mirrored {
                    self.remove_point(&store, tenant, id).await;
                }
                Err(MemoryError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Archive or restore a memory. Archived memories are never returned by
    /// search; their vector is removed while archived and restored after.
    pub async fn set_archived(
        &self,
        tenant: &TenantId,
        id: &Uuid,
        archived: bool,
    ) -> Result<Memory, MemoryError> {
        let mut memory = self.get(tenant, id).await?;
        if memory.is_archived == archived {
            return Ok(memory);
        }
        memory.is_archived = archived;
        memory.version += 1;
        memory.updated_at = Utc::now();

        if let RetrievalPath::Delegated(store) = self.retrieval_path()? {
            if archived {
                self.remove_point(&store, tenant, id).await;
            } else {
                if memory.embedding.is_none() {
                    memory.embedding = Some(self.embed_for_write(&memory.content).await?);
                }
                self.upsert_point(&store, &memory).await?;
            }
        }

        Ok(self.memories.update(&memory).await?)
    }

    /// Delete a memory. Vector-side cleanup is best effort: the canonical
    /// store is authoritative and stale points are dropped at search time.
    pub async fn delete(&self, tenant: &TenantId, id: &Uuid) -> Result<(), MemoryError> {
        self.get(tenant, id).await?;
        if !self.memories.delete(tenant, id).await? {
            return Err(MemoryError::NotFound);
        }

        if let RetrievalPath::Delegated(store) = self.retrieval_path()? {
            self.remove_point(&store, tenant, id).await;
        }
        tracing::debug!(tenant_id = %tenant, memory_id = %id, "memory deleted");
        Ok(())
    }

    /// Semantic search, most similar first.
    ///
    /// `top_k` defaults to the configured default and is clamped to the
    /// configured maximum; `0` yields an empty list. Ties on similarity are
    /// broken by `created_at`, newest first.
    pub async fn search(
        &self,
        tenant: &TenantId,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>, MemoryError> {
        let top_k = request
            .top_k
            .unwrap_or(self.config.default_top_k)
            .min(self.config.max_top_k);
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let query_text = request.query_text.trim();
        if query_text.is_empty() {
            return Err(MemoryError::Validation("query text cannot be empty".to_string()));
        }

        let filter = search_filter(tenant, request);
        let query_vector = self.embeddings.embed(query_text).await?;

        let mut results = match self.retrieval_path()? {
            RetrievalPath::Delegated(store) => {
                self.search_delegated(&store, tenant, &query_vector, top_k, &filter)
                    .await?
            }
            RetrievalPath::InProcess => {
                self.search_in_process(tenant, &query_vector, &filter).await?
            }
        };

        rank(&mut results);
        results.truncate(top_k);
        Ok(results)
    }

    /// Counts for the tenant's collection, safe to show that tenant.
    ///
    /// A backend that falls back to summing every collection (because this
    /// tenant's does not exist yet) reports counts belonging to other
    /// tenants; those are replaced by an empty count for this collection.
    pub async fn collection_stats(&self, tenant: &TenantId) -> Result<CollectionStats, MemoryError> {
        let stats = self.operator_collection_stats(tenant).await?;
        if stats.source == StatsSource::Aggregate {
            return Ok(CollectionStats::counted(stats.collection, 0));
        }
        Ok(stats)
    }

    /// Counts as the backend reports them, including cross-collection
    /// aggregates. For operator tooling only.
    ///
    /// Never fails on backend trouble: an unreachable backend reports
    /// `Unavailable` with zero counts.
    pub async fn operator_collection_stats(
        &self,
        tenant: &TenantId,
    ) -> Result<CollectionStats, MemoryError> {
        let collection = tenant.collection_name();
        match self.retrieval_path()? {
            RetrievalPath::Delegated(store) => {
                let call = store.collection_stats(&collection);
                match tokio::time::timeout(self.adapter_timeout(), call).await {
                    Ok(Ok(stats)) => Ok(stats),
                    Ok(Err(e)) => {
                        tracing::warn!(provider = store.name(), error = %e, "collection stats failed");
                        Ok(CollectionStats::unavailable(collection))
                    }
                    Err(_) => {
                        tracing::warn!(provider = store.name(), "collection stats timed out");
                        Ok(CollectionStats::unavailable(collection))
                    }
                }
            }
            RetrievalPath::InProcess => {
                let count = self.memories.count(tenant).await?;
                Ok(CollectionStats::counted(collection, count))
            }
        }
    }

    /// Name of the active path, for diagnostics.
    pub fn active_path(&self) -> Result<&'static str, MemoryError> {
        Ok(match self.retrieval_path()? {
            RetrievalPath::Delegated(_) => "delegated",
            RetrievalPath::InProcess => "in_process",
        })
    }

    /// Ask the backend for more than `top_k` and hydrate the hits from the
    /// canonical store. Hits the canonical store rejects (stale points,
    /// archived memories, filter misses) leave gaps, so while too few survive
    /// and the backend filled the whole page, query again with a larger page.
    async fn search_delegated(
        &self,
        store: &BoxVectorStore,
        tenant: &TenantId,
        query_vector: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<SearchResult>, MemoryError> {
        let collection = tenant.collection_name();
        let ceiling = top_k.max(MAX_DELEGATED_FETCH);
        let mut limit = (top_k * 2 + OVERFETCH_SLACK).min(ceiling);

        loop {
            let call = store.query(&collection, query_vector, limit, filter);
            let matches = match tokio::time::timeout(self.adapter_timeout(), call).await {
                Ok(result) => result.map_err(|e| {
                    tracing::warn!(provider = store.name(), error = %e, "vector query failed");
                    MemoryError::from(e)
                })?,
                Err(_) => {
                    tracing::warn!(provider = store.name(), "vector query timed out");
                    return Err(MemoryError::BackendUnavailable(
                        "vector query timed out".to_string(),
                    ));
                }
            };
            let page_full = matches.len() >= limit;

            let mut similarities: HashMap<Uuid, f32> = HashMap::with_capacity(matches.len());
            for m in &matches {
                match Uuid::parse_str(&m.id) {
                    Ok(id) => {
                        similarities.entry(id).or_insert_with(|| m.similarity());
                    }
                    Err(_) => tracing::warn!(provider = store.name(), point_id = %m.id, "ignoring non-uuid point id"),
                }
            }
            let ids: Vec<Uuid> = similarities.keys().copied().collect();
            let canonical = self.memories.get_many(tenant, &ids).await?;

            // Canonical records decide what survives.
            let survivors: Vec<SearchResult> = canonical
                .iter()
                .filter(|m| !m.is_archived && filter.matches(&memory_payload(m)))
                .filter_map(|m| {
                    similarities
                        .get(&m.id)
                        .map(|similarity| SearchResult::from_memory(m, *similarity))
                })
                .collect();

            if survivors.len() >= top_k || !page_full || limit >= ceiling {
                return Ok(survivors);
            }
            tracing::debug!(
                tenant_id = %tenant,
                limit,
                dropped = matches.len().saturating_sub(survivors.len()),
                "refilling delegated search after stale hits"
            );
            limit = (limit * 2).min(ceiling);
        }
    }

    async fn search_in_process(
        &self,
        tenant: &TenantId,
        query_vector: &[f32],
        filter: &VectorFilter,
    ) -> Result<Vec<SearchResult>, MemoryError> {
        let candidates = self.memories.scan_candidates(tenant, filter).await?;
        Ok(candidates
            .iter()
            .filter_map(|m| {
                let embedding = m.embedding.as_deref()?;
                let similarity = cosine_similarity(query_vector, embedding).clamp(0.0, 1.0);
                Some(SearchResult::from_memory(m, similarity))
            })
            .collect())
    }

    fn retrieval_path(&self) -> Result<RetrievalPath, MemoryError> {
        match self.config.strategy {
            RetrievalStrategy::InProcess => Ok(RetrievalPath::InProcess),
            RetrievalStrategy::Delegated => {
                Ok(RetrievalPath::Delegated(self.registry.resolve_vector(None)?))
            }
            RetrievalStrategy::Auto => match self.registry.resolve_vector(None) {
                Ok(store) => Ok(RetrievalPath::Delegated(store)),
                Err(RegistryError::NoDefaultProvider(_)) => Ok(RetrievalPath::InProcess),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.config.adapter_timeout_secs)
    }

    async fn embed_for_write(&self, content: &str) -> Result<Vec<f32>, MemoryError> {
        let embedding = self.embeddings.embed(content).await?;
        self.embeddings.check_dimension(&embedding)?;
        Ok(embedding)
    }

    async fn upsert_point(&self, store: &BoxVectorStore, memory: &Memory) -> Result<(), MemoryError> {
        let Some(vector) = memory.embedding.clone() else {
            return Ok(());
        };
        let collection = memory.tenant_id.collection_name();
        let points = [VectorPoint {
            id: memory.id.to_string(),
            vector,
            payload: memory_payload(memory),
        }];
        match tokio::time::timeout(self.adapter_timeout(), store.upsert(&collection, &points)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!(provider = store.name(), memory_id = %memory.id, error = %e, "vector upsert failed");
                Err(e.into())
            }
            Err(_) => {
                tracing::warn!(provider = store.name(), memory_id = %memory.id, "vector upsert timed out");
                Err(MemoryError::BackendUnavailable(
                    "vector upsert timed out".to_string(),
                ))
            }
        }
    }

    /// Best-effort point removal; failures are logged and swallowed.
    async fn remove_point(&self, store: &BoxVectorStore, tenant: &TenantId, id: &Uuid) {
        let collection = tenant.collection_name();
        let ids = [id.to_string()];
        match tokio::time::timeout(self.adapter_timeout(), store.delete_ids(&collection, &ids)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(provider = store.name(), memory_id = %id, error = %e, "vector delete failed");
            }
            Err(_) => {
                tracing::warn!(provider = store.name(), memory_id = %id, "vector delete timed out");
            }
        }
    }

    async fn check_project(&self, tenant: &TenantId, project_id: &Uuid) -> Result<(), MemoryError> {
        match self.projects.get(tenant, project_id).await? {
            Some(_) => Ok(()),
            None => Err(MemoryError::Validation(format!(
                "project {project_id} does not exist"
            ))),
        }
    }

    fn validate_content(&self, content: &str) -> Result<String, MemoryError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MemoryError::Validation("content cannot be empty".to_string()));
        }
        let len = content.chars().count();
        if len > self.config.max_content_length {
            return Err(MemoryError::Validation(format!(
                "content is {len} characters, maximum is {}",
                self.config.max_content_length
            )));
        }
        Ok(content.to_string())
    }

    /// Trim, reject empties and overlong tags, drop duplicates keeping the
    /// first occurrence.
    fn normalize_tags(&self, tags: Vec<String>) -> Result<Vec<String>, MemoryError> {
        let mut out: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(MemoryError::Validation("tags cannot be empty".to_string()));
            }
            if tag.chars().count() > self.config.max_tag_length {
                return Err(MemoryError::Validation(format!(
                    "tag '{tag}' exceeds {} characters",
                    self.config.max_tag_length
                )));
            }
            if !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        if out.len() > self.config.max_tags {
            return Err(MemoryError::Validation(format!(
                "at most {} tags are allowed",
                self.config.max_tags
            )));
        }
        Ok(out)
    }
}

/// Payload stored alongside a memory's vector and used to evaluate filters
/// against canonical records.
pub fn memory_payload(memory: &Memory) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert(
        FilterField::TenantId.payload_key().to_string(),
        Value::String(memory.tenant_id.to_string()),
    );
    if let Some(project_id) = memory.project_id {
        payload.insert(
            FilterField::ProjectId.payload_key().to_string(),
            Value::String(project_id.to_string()),
        );
    }
    payload.insert(
        FilterField::MemoryType.payload_key().to_string(),
        Value::String(memory.memory_type.to_string()),
    );
    payload.insert(
        FilterField::Tag.payload_key().to_string(),
        Value::Array(memory.tags.iter().cloned().map(Value::String).collect()),
    );
    for field in [FilterField::Category, FilterField::Source] {
        if let Some(Value::String(value)) = memory.metadata.get(field.payload_key()) {
            payload.insert(field.payload_key().to_string(), Value::String(value.clone()));
        }
    }
    payload.insert("metadata".to_string(), Value::Object(memory.metadata.clone()));
    payload.insert(
        "created_at".to_string(),
        Value::String(memory.created_at.to_rfc3339()),
    );
    payload
}

fn search_filter(tenant: &TenantId, request: &SearchRequest) -> VectorFilter {
    let mut filter =
        VectorFilter::new().and(FilterPredicate::eq(FilterField::TenantId, tenant.as_str()));
    if let Some(project_id) = request.project_id {
        filter = filter.and(FilterPredicate::eq(
            FilterField::ProjectId,
            project_id.to_string(),
        ));
    }
    for tag in request.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        filter = filter.and(FilterPredicate::contains(FilterField::Tag, tag));
    }
    filter
}

/// Similarity descending, then newest first, then id for full determinism.
fn rank(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cache::EmbeddingCache;
    use crate::llm::box_provider::BoxLlmProvider;
    use crate::registry::ProviderHandle;
    use crate::test_support::{
        FakeEmbedder, FakeVectorStore, InMemoryMemoryRepository, InMemoryProjectRepository,
    };
    use xmem_types::project::{Project, Visibility};
    use xmem_types::provider::ProviderRole;

    const DIM: usize = 64;

    type TestService =
        MemoryService<Arc<InMemoryMemoryRepository>, Arc<InMemoryProjectRepository>>;

    struct Harness {
        service: TestService,
        memories: Arc<InMemoryMemoryRepository>,
        projects: Arc<InMemoryProjectRepository>,
        store: Option<Arc<FakeVectorStore>>,
    }

    fn harness(delegated: bool) -> Harness {
        let registry = Arc::new(ProviderRegistry::new());
        registry
            .register_provider(
                ProviderRole::Llm,
                "fake",
                ProviderHandle::llm(BoxLlmProvider::new(FakeEmbedder::new(DIM))),
            )
            .unwrap();
        let store = delegated.then(|| Arc::new(FakeVectorStore::named("fake-vector")));
        if let Some(store) = &store {
            registry
                .register_provider(
                    ProviderRole::Vector,
                    "fake-vector",
                    ProviderHandle::vector(BoxVectorStore::new(Arc::clone(store))),
                )
                .unwrap();
        }
        let embeddings = Arc::new(EmbeddingService::new(
            Arc::clone(&registry),
            EmbeddingCache::new(Duration::from_secs(60), 100),
            Duration::from_secs(5),
            Some(DIM),
        ));
        let memories = Arc::new(InMemoryMemoryRepository::default());
        let projects = Arc::new(InMemoryProjectRepository::default());
        let service = MemoryService::new(
            Arc::clone(&memories),
            Arc::clone(&projects),
            registry,
            embeddings,
            RetrievalConfig::default(),
        );
        Harness {
            service,
            memories,
            projects,
            store,
        }
    }

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id)
    }

    async fn seed(h: &Harness, t: &TenantId) -> Vec<Memory> {
        let mut out = Vec::new();
        for (content, tags) in [
            ("rust ownership and borrowing rules", vec!["rust"]),
            ("sourdough bread hydration ratios", vec!["cooking"]),
            ("tokio runtime and async rust tasks", vec!["rust", "async"]),
            ("garden tomato watering schedule", vec!["garden"]),
        ] {
            let req = CreateMemoryRequest::new(content).with_tags(tags);
            out.push(h.service.create(t, req).await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_create_rejects_empty_content() {
        let h = harness(false);
        let err = h
            .service
            .create(&tenant("t1"), CreateMemoryRequest::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_enforces_bounds() {
        let h = harness(false);
        let t = tenant("t1");
        let long = "x".repeat(10_001);
        assert!(matches!(
            h.service.create(&t, CreateMemoryRequest::new(long)).await,
            Err(MemoryError::Validation(_))
        ));

        let many: Vec<String> = (0..33).map(|i| format!("tag{i}")).collect();
        assert!(matches!(
            h.service.create(&t, CreateMemoryRequest::new("ok").with_tags(many)).await,
            Err(MemoryError::Validation(_))
        ));

        let long_tag = "t".repeat(65);
        assert!(matches!(
            h.service
                .create(&t, CreateMemoryRequest::new("ok").with_tags([long_tag]))
                .await,
            Err(MemoryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_dedupes_tags_in_order() {
        let h = harness(false);
        let memory = h
            .service
            .create(
                &tenant("t1"),
                CreateMemoryRequest::new("note").with_tags(["b", " a", "b", "a "]),
            )
            .await
            .unwrap();
        assert_eq!(memory.tags, vec!["b", "a"]);
        assert_eq!(memory.version, 1);
        assert_eq!(memory.embedding.as_ref().map(|e| e.len()), Some(DIM));
    }

    #[tokio::test]
    async fn test_create_with_foreign_project_rejected() {
        let h = harness(false);
        let project = Project {
            id: Uuid::now_v7(),
            tenant_id: tenant("t2"),
            name: "theirs".to_string(),
            description: String::new(),
            visibility: Visibility::Private,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        h.projects.create(&project).await.unwrap();

        let err = h
            .service
            .create(
                &tenant("t1"),
                CreateMemoryRequest::new("note").with_project(project.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cross_tenant_access_is_not_found() {
        for delegated in [false, true] {
            let h = harness(delegated);
            let t1 = tenant("t1");
            let t2 = tenant("t2");
            let memory = h
                .service
                .create(&t1, CreateMemoryRequest::new("private thought"))
                .await
                .unwrap();

            assert!(matches!(h.service.get(&t2, &memory.id).await, Err(MemoryError::NotFound)));
            let update = UpdateMemoryRequest {
                content: Some("hijacked".to_string()),
                ..Default::default()
            };
            assert!(matches!(
                h.service.update(&t2, &memory.id, update).await,
                Err(MemoryError::NotFound)
            ));
            assert!(matches!(
                h.service.set_archived(&t2, &memory.id, true).await,
                Err(MemoryError::NotFound)
            ));
            assert!(matches!(h.service.delete(&t2, &memory.id).await, Err(MemoryError::NotFound)));

            let hits = h
                .service
                .search(&t2, &SearchRequest::new("private thought"))
                .await
                .unwrap();
            assert!(hits.is_empty());

            let unchanged = h.service.get(&t1, &memory.id).await.unwrap();
            assert_eq!(unchanged.content, "private thought");
            assert_eq!(unchanged.version, 1);
        }
    }

    #[tokio::test]
    async fn test_search_finds_itself_on_both_paths() {
        for delegated in [false, true] {
            let h = harness(delegated);
            let t = tenant("t1");
            let seeded = seed(&h, &t).await;

            let hits = h
                .service
                .search(&t, &SearchRequest::new("tokio runtime and async rust tasks"))
                .await
                .unwrap();
            assert_eq!(hits[0].id, seeded[2].id, "delegated={delegated}");
            assert!((hits[0].similarity - 1.0).abs() < 1e-4);
            assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        }
    }

    #[tokio::test]
    async fn test_paths_agree_on_top_k_membership() {
        let t = tenant("t1");
        let mut memberships = Vec::new();
        for delegated in [false, true] {
            let h = harness(delegated);
            seed(&h, &t).await;
            let hits = h
                .service
                .search(&t, &SearchRequest::new("async rust").top_k(2))
                .await
                .unwrap();
            assert_eq!(hits.len(), 2);
            let mut contents: Vec<String> = hits.into_iter().map(|r| r.content).collect();
            contents.sort();
            memberships.push(contents);
        }
        assert_eq!(memberships[0], memberships[1]);
    }

    #[tokio::test]
    async fn test_search_filters_by_tag_and_project() {
        for delegated in [false, true] {
            let h = harness(delegated);
            let t = tenant("t1");
            seed(&h, &t).await;

            let mut req = SearchRequest::new("rust");
            req.tags = vec!["async".to_string()];
            let hits = h.service.search(&t, &req).await.unwrap();
            assert_eq!(hits.len(), 1);
            assert!(hits[0].content.contains("tokio"));

            req.tags.clear();
            req.project_id = Some(Uuid::now_v7());
            assert!(h.service.search(&t, &req).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_search_top_k_boundaries() {
        let h = harness(false);
        let t = tenant("t1");
        seed(&h, &t).await;

        let none = h
            .service
            .search(&t, &SearchRequest::new("rust").top_k(0))
            .await
            .unwrap();
        assert!(none.is_empty());

        let clamped = h
            .service
            .search(&t, &SearchRequest::new("rust").top_k(10_000))
            .await
            .unwrap();
        assert_eq!(clamped.len(), 4);
    }

    #[tokio::test]
    async fn test_search_ties_break_newest_first() {
        let h = harness(false);
        let t = tenant("t1");
        let first = h.service.create(&t, CreateMemoryRequest::new("same words")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = h.service.create(&t, CreateMemoryRequest::new("same words")).await.unwrap();

        let hits = h.service.search(&t, &SearchRequest::new("same words")).await.unwrap();
        assert_eq!(hits[0].id, second.id);
        assert_eq!(hits[1].id, first.id);
    }

    #[tokio::test]
    async fn test_update_roundtrip_bumps_version_once() {
        for delegated in [false, true] {
            let h = harness(delegated);
            let t = tenant("t1");
            let memory = h.service.create(&t, CreateMemoryRequest::new("draft")).await.unwrap();

            let updated = h
                .service
                .update(
                    &t,
                    &memory.id,
                    UpdateMemoryRequest {
                        content: Some("final wording".to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(updated.version, 2);

            let fetched = h.service.get(&t, &memory.id).await.unwrap();
            assert_eq!(fetched.content, "final wording");
            assert_eq!(fetched.version, memory.version + 1);
            assert_ne!(fetched.embedding, memory.embedding);

            let hits = h
                .service
                .search(&t, &SearchRequest::new("final wording"))
                .await
                .unwrap();
            assert_eq!(hits[0].id, memory.id);
        }
    }

    #[tokio::test]
    async fn test_update_replaces_metadata() {
        let h = harness(false);
        let t = tenant("t1");
        let mut first = Map::new();
        first.insert("a".to_string(), Value::from(1));
        first.insert("b".to_string(), Value::from(2));
        let memory = h
            .service
            .create(&t, CreateMemoryRequest::new("note").with_metadata(first))
            .await
            .unwrap();

        let mut second = Map::new();
        second.insert("c".to_string(), Value::from(3));
        let updated = h
            .service
            .update(
                &t,
                &memory.id,
                UpdateMemoryRequest {
                    metadata: Some(second.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.metadata, second);
    }

    #[tokio::test]
    async fn test_delete_swallows_vector_failure() {
        let h = harness(true);
        let t = tenant("t1");
        let memory = h.service.create(&t, CreateMemoryRequest::new("temp")).await.unwrap();
        let store = h.store.as_ref().unwrap();
        store.set_failing_deletes(true);

        h.service.delete(&t, &memory.id).await.unwrap();
        assert!(matches!(h.service.get(&t, &memory.id).await, Err(MemoryError::NotFound)));
        // The stale point is still there but never surfaces.
        assert_eq!(store.point_count(&t.collection_name()), 1);
        let hits = h.service.search(&t, &SearchRequest::new("temp")).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_stale_points_do_not_shrink_results() {
        for delegated in [false, true] {
            let h = harness(delegated);
            let t = tenant("t1");
            let scratch = h
                .service
                .create(&t, CreateMemoryRequest::new("temp scratch note"))
                .await
                .unwrap();
            let grocery = h
                .service
                .create(&t, CreateMemoryRequest::new("temp grocery list"))
                .await
                .unwrap();
            if let Some(store) = &h.store {
                store.set_failing_deletes(true);
            }
            h.service.delete(&t, &scratch.id).await.unwrap();

            let hits = h
                .service
                .search(&t, &SearchRequest::new("temp scratch note").top_k(1))
                .await
                .unwrap();
            assert_eq!(hits.len(), 1, "delegated={delegated}");
            assert_eq!(hits[0].id, grocery.id, "delegated={delegated}");
        }
    }

    #[tokio::test]
    async fn test_delegated_search_refills_past_a_page_of_stale_points() {
        let h = harness(true);
        let t = tenant("t1");
        let store = h.store.as_ref().unwrap();
        let mut stale = Vec::new();
        for _ in 0..12 {
            stale.push(
                h.service
                    .create(&t, CreateMemoryRequest::new("temp scratch note"))
                    .await
                    .unwrap(),
            );
        }
        let survivor = h
            .service
            .create(&t, CreateMemoryRequest::new("temp grocery list"))
            .await
            .unwrap();
        store.set_failing_deletes(true);
        for memory in &stale {
            h.service.delete(&t, &memory.id).await.unwrap();
        }
        assert_eq!(store.point_count(&t.collection_name()), 13);

        // The first page (2 * 1 + slack) holds only stale points.
        let hits = h
            .service
            .search(&t, &SearchRequest::new("temp scratch note").top_k(1))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, survivor.id);
    }

    #[tokio::test]
    async fn test_tenant_stats_hide_other_collections() {
        let h = harness(true);
        let writer = tenant("t1");
        let newcomer = tenant("t2");
        h.service.create(&writer, CreateMemoryRequest::new("one")).await.unwrap();
        h.service.create(&writer, CreateMemoryRequest::new("two")).await.unwrap();

        let stats = h.service.collection_stats(&newcomer).await.unwrap();
        assert_eq!(stats.vector_count, 0);
        assert_eq!(stats.source, StatsSource::Collection);
        assert_eq!(stats.collection, newcomer.collection_name());

        let operator = h.service.operator_collection_stats(&newcomer).await.unwrap();
        assert_eq!(operator.source, StatsSource::Aggregate);
        assert_eq!(operator.vector_count, 2);

        let own = h.service.collection_stats(&writer).await.unwrap();
        assert_eq!(own.vector_count, 2);
    }

    #[tokio::test]
    async fn test_create_fails_when_backend_down() {
        let h = harness(true);
        let t = tenant("t1");
        h.store.as_ref().unwrap().set_failing(true);
        let err = h
            .service
            .create(&t, CreateMemoryRequest::new("note"))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::BackendUnavailable(_)));
        assert_eq!(h.memories.count(&t).await.unwrap(), 0);

        let err = h.service.search(&t, &SearchRequest::new("note")).await.unwrap_err();
        assert!(matches!(err, MemoryError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_archived_memories_excluded_from_search() {
        for delegated in [false, true] {
            let h = harness(delegated);
            let t = tenant("t1");
            let memory = h.service.create(&t, CreateMemoryRequest::new("hidden gem")).await.unwrap();

            let archived = h.service.set_archived(&t, &memory.id, true).await.unwrap();
            assert!(archived.is_archived);
            assert_eq!(archived.version, 2);
            assert!(h.service.search(&t, &SearchRequest::new("hidden gem")).await.unwrap().is_empty());

            h.service.set_archived(&t, &memory.id, false).await.unwrap();
            let hits = h.service.search(&t, &SearchRequest::new("hidden gem")).await.unwrap();
            assert_eq!(hits.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_collection_stats_unavailable_backend_is_not_an_error() {
        let h = harness(true);
        let t = tenant("t1");
        h.service.create(&t, CreateMemoryRequest::new("note")).await.unwrap();
        let stats = h.service.collection_stats(&t).await.unwrap();
        assert_eq!(stats.vector_count, 1);

        h.store.as_ref().unwrap().set_failing(true);
        let stats = h.service.collection_stats(&t).await.unwrap();
        assert_eq!(stats.vector_count, 0);
        assert_eq!(stats.source, StatsSource::Unavailable);
    }

    #[tokio::test]
    async fn test_delegated_strategy_without_vector_provider_fails() {
        let mut h = harness(false);
        h.service.config.strategy = RetrievalStrategy::Delegated;
        let err = h
            .service
            .search(&tenant("t1"), &SearchRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::NoDefaultProvider(ProviderRole::Vector)));
        assert_eq!(h.service.active_path().ok(), None);
    }

    #[test]
    fn test_memory_payload_shape() {
        let mut metadata = Map::new();
        metadata.insert("category".to_string(), Value::from("guide"));
        metadata.insert("source".to_string(), Value::from(42));
        let memory = Memory {
            id: Uuid::now_v7(),
            tenant_id: tenant("t1"),
            content: "c".to_string(),
            memory_type: Default::default(),
            tags: vec!["a".to_string()],
            metadata,
            project_id: None,
            embedding: None,
            version: 1,
            is_archived: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let payload = memory_payload(&memory);
        assert_eq!(payload["tenant_id"], "t1");
        assert_eq!(payload["category"], "guide");
        assert!(payload.get("source").is_none());
        assert!(payload.get("project_id").is_none());
        assert_eq!(payload["tags"], serde_json::json!(["a"]));
    }
}
