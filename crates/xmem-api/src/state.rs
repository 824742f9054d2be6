//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository traits, but AppState pins them to the
//! SQLite implementations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use xmem_core::embedding::service::EmbeddingService;
use xmem_core::import::pipeline::CsvImporter;
use xmem_core::registry::ProviderRegistry;
use xmem_core::service::memory::MemoryService;
use xmem_core::service::project::ProjectService;
use xmem_core::service::source::SourceConfigService;
use xmem_core::sync::connector::BoxSourceConnector;
use xmem_core::sync::scheduler::SyncScheduler;
use xmem_infra::config::load_global_config;
use xmem_infra::connector::HttpSourceConnector;
use xmem_infra::factory::build_registry;
use xmem_infra::sqlite::memory::SqliteMemoryRepository;
use xmem_infra::sqlite::pool::DatabasePool;
use xmem_infra::sqlite::project::SqliteProjectRepository;
use xmem_infra::sqlite::source_config::SqliteSourceConfigRepository;
use xmem_types::config::GlobalConfig;
use xmem_types::tenant::TenantId;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteMemoryService = MemoryService<SqliteMemoryRepository, SqliteProjectRepository>;

pub type ConcreteProjectService = ProjectService<SqliteProjectRepository>;

pub type ConcreteSourceService = SourceConfigService<SqliteSourceConfigRepository>;

pub type ConcreteImporter = CsvImporter<SqliteMemoryRepository, SqliteProjectRepository>;

pub type ConcreteScheduler =
    SyncScheduler<SqliteSourceConfigRepository, SqliteMemoryRepository, SqliteProjectRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub memory_service: Arc<ConcreteMemoryService>,
    pub project_service: Arc<ConcreteProjectService>,
    pub source_service: Arc<ConcreteSourceService>,
    pub importer: Arc<ConcreteImporter>,
    pub scheduler: Arc<ConcreteScheduler>,
    pub registry: Arc<ProviderRegistry>,
    pub config: Arc<GlobalConfig>,
    /// SHA-256 of an API key -> the tenant it authenticates.
    pub api_keys: Arc<HashMap<String, TenantId>>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, build
    /// the provider registry, wire services.
    pub async fn init(data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;
        let db_pool = DatabasePool::open_in(&data_dir).await?;
        let registry = build_registry(&config)?;

        Self::from_parts(db_pool, config, registry, data_dir)
    }

    /// Wire services over an already opened pool and populated registry.
    pub fn from_parts(
        db_pool: DatabasePool,
        config: GlobalConfig,
        registry: ProviderRegistry,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let registry = Arc::new(registry);
        let embeddings = Arc::new(EmbeddingService::from_config(
            Arc::clone(&registry),
            &config.embedding,
        ));

        let memory_service = Arc::new(MemoryService::new(
            SqliteMemoryRepository::new(db_pool.clone()),
            SqliteProjectRepository::new(db_pool.clone()),
            Arc::clone(&registry),
            embeddings,
            config.retrieval.clone(),
        ));

        let project_service = ProjectService::new(SqliteProjectRepository::new(db_pool.clone()));
        let source_service =
            SourceConfigService::new(SqliteSourceConfigRepository::new(db_pool.clone()));
        let importer = CsvImporter::new(Arc::clone(&memory_service), config.import.clone());

        // Sources without a dedicated connector are pulled over HTTP from
        // their webhook url.
        let source_timeout = Duration::from_secs(config.sync.source_timeout_secs);
        let http_connector = HttpSourceConnector::new(source_timeout)?;
        let scheduler = SyncScheduler::new(
            SqliteSourceConfigRepository::new(db_pool.clone()),
            Arc::clone(&memory_service),
            source_timeout,
        )
        .with_fallback(BoxSourceConnector::new(http_connector));

        let api_keys = config
            .api_keys
            .iter()
            .map(|binding| {
                (
                    binding.key_sha256.to_lowercase(),
                    TenantId::new(binding.tenant_id.clone()),
                )
            })
            .collect::<HashMap<_, _>>();
        if api_keys.is_empty() {
            tracing::warn!("no api keys configured, the REST surface will reject every request");
        }

        Ok(Self {
            memory_service,
            project_service: Arc::new(project_service),
            source_service: Arc::new(source_service),
            importer: Arc::new(importer),
            scheduler: Arc::new(scheduler),
            registry,
            config: Arc::new(config),
            api_keys: Arc::new(api_keys),
            data_dir,
        })
    }

    /// Resolve the tenant a CLI invocation acts for.
    pub fn cli_tenant(&self, tenant: &str) -> anyhow::Result<TenantId> {
        let tenant = tenant.trim();
        anyhow::ensure!(!tenant.is_empty(), "tenant id cannot be empty");
        Ok(TenantId::new(tenant))
    }
}

#[cfg(test)]
pub(crate) mod test_state {
    //! Shared fixtures for CLI and HTTP tests.

    use super::*;

    use xmem_core::llm::box_provider::BoxLlmProvider;
    use xmem_core::llm::provider::LlmProvider;
    use xmem_core::registry::ProviderHandle;
    use xmem_core::vector::box_store::BoxVectorStore;
    use xmem_infra::vector::memory::InMemoryVectorStore;
    use xmem_types::config::ApiKeyBinding;
    use xmem_types::error::AdapterError;
    use xmem_types::provider::ProviderRole;

    use crate::http::extractors::auth::hash_api_key;

    pub const DIMENSION: usize = 16;
    pub const KEY_A: &str = "xmem_test_key_a";
    pub const KEY_B: &str = "xmem_test_key_b";

    /// Bag-of-words embedder: each lowercase word lights up one bucket.
    pub struct WordEmbedder;

    impl LlmProvider for WordEmbedder {
        fn name(&self) -> &str {
            "words"
        }

        fn model_name(&self) -> &str {
            "words-v1"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
            let mut vector = vec![0.0f32; DIMENSION];
            for word in text.split_whitespace() {
                let bucket = word
                    .to_lowercase()
                    .bytes()
                    .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
                    % DIMENSION;
                vector[bucket] += 1.0;
            }
            if vector.iter().all(|v| *v == 0.0) {
                vector[0] = 1.0;
            }
            Ok(vector)
        }
    }

    /// State over a temp database, a word embedder and (optionally) the
    /// in-memory vector store. Tenants `tenant-a` and `tenant-b` are bound
    /// to [`KEY_A`] and [`KEY_B`].
    pub async fn test_state(with_vector_store: bool) -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let db_pool = DatabasePool::open_in(dir.path()).await.unwrap();
        let data_dir = dir.path().to_path_buf();
        std::mem::forget(dir);

        let registry = ProviderRegistry::new();
        registry
            .register_provider(
                ProviderRole::Llm,
                "words",
                ProviderHandle::llm(BoxLlmProvider::new(WordEmbedder)),
            )
            .unwrap();
        if with_vector_store {
            registry
                .register_provider(
                    ProviderRole::Vector,
                    "memory",
                    ProviderHandle::vector(BoxVectorStore::new(InMemoryVectorStore::new())),
                )
                .unwrap();
        }

        let mut config = GlobalConfig::default();
        config.embedding.dimension = DIMENSION;
        config.api_keys = vec![
            ApiKeyBinding {
                key_sha256: hash_api_key(KEY_A),
                tenant_id: "tenant-a".to_string(),
            },
            ApiKeyBinding {
                key_sha256: hash_api_key(KEY_B),
                tenant_id: "tenant-b".to_string(),
            },
        ];

        AppState::from_parts(db_pool, config, registry, data_dir).unwrap()
    }
}
