//! Provider registry for runtime adapter lookup.
//!
//! Named adapters keyed by role, with exactly one default per role once
//! anything is registered for it. Adapters are stored as `Arc` handles, so
//! re-registering a name swaps the entry while in-flight calls keep using
//! the instance they already resolved.

use std::sync::Arc;

use dashmap::DashMap;

use xmem_types::error::RegistryError;
use xmem_types::provider::{ProviderInfo, ProviderRole};

use crate::llm::box_provider::BoxLlmProvider;
use crate::vector::box_store::BoxVectorStore;

/// Opaque adapter handle stored in the registry.
#[derive(Clone)]
pub enum ProviderHandle {
    Vector(Arc<BoxVectorStore>),
    Llm(Arc<BoxLlmProvider>),
}

impl ProviderHandle {
    pub fn vector(store: BoxVectorStore) -> Self {
        ProviderHandle::Vector(Arc::new(store))
    }

    pub fn llm(provider: BoxLlmProvider) -> Self {
        ProviderHandle::Llm(Arc::new(provider))
    }

    pub fn role(&self) -> ProviderRole {
        match self {
            ProviderHandle::Vector(_) => ProviderRole::Vector,
            ProviderHandle::Llm(_) => ProviderRole::Llm,
        }
    }
}

/// Registry of vector and LLM adapters.
///
/// The per-role default pointer is the only shared mutable state; it is a
/// single map entry replaced atomically, and readers never take a lock that
/// writers to other roles contend on.
pub struct ProviderRegistry {
    providers: DashMap<(ProviderRole, String), ProviderHandle>,
    defaults: DashMap<ProviderRole, String>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
            defaults: DashMap::new(),
        }
    }

    /// Register an adapter under `name` for `role`.
    ///
    /// Idempotent: registering an existing name replaces the adapter. The
    /// first adapter registered for a role becomes its default.
    pub fn register_provider(
        &self,
        role: ProviderRole,
        name: impl Into<String>,
        handle: ProviderHandle,
    ) -> Result<(), RegistryError> {
        if handle.role() != role {
            return Err(RegistryError::RoleMismatch {
                expected: role,
                actual: handle.role(),
            });
        }
        let name = name.into();
        self.providers.insert((role, name.clone()), handle);
        self.defaults.entry(role).or_insert_with(|| name.clone());
        tracing::info!(%role, provider = %name, "registered provider");
        Ok(())
    }

    /// Make `name` the default for `role`. Last call wins.
    pub fn set_default_provider(&self, role: ProviderRole, name: &str) -> Result<(), RegistryError> {
        if !self.providers.contains_key(&(role, name.to_string())) {
            return Err(RegistryError::UnknownProvider {
                role,
                name: name.to_string(),
            });
        }
        self.defaults.insert(role, name.to_string());
        tracing::info!(%role, provider = %name, "default provider changed");
        Ok(())
    }

    /// Resolve the named provider, or the role's default when `name` is `None`.
    pub fn resolve(
        &self,
        role: ProviderRole,
        name: Option<&str>,
    ) -> Result<ProviderHandle, RegistryError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self
                .defaults
                .get(&role)
                .map(|entry| entry.value().clone())
                .ok_or(RegistryError::NoDefaultProvider(role))?,
        };
        self.providers
            .get(&(role, name.clone()))
            .map(|entry| entry.value().clone())
            .ok_or(RegistryError::UnknownProvider { role, name })
    }

    /// Typed [`resolve`](Self::resolve) for the vector role.
    pub fn resolve_vector(&self, name: Option<&str>) -> Result<Arc<BoxVectorStore>, RegistryError> {
        match self.resolve(ProviderRole::Vector, name)? {
            ProviderHandle::Vector(store) => Ok(store),
            other => Err(RegistryError::RoleMismatch {
                expected: ProviderRole::Vector,
                actual: other.role(),
            }),
        }
    }

    /// Typed [`resolve`](Self::resolve) for the llm role.
    pub fn resolve_llm(&self, name: Option<&str>) -> Result<Arc<BoxLlmProvider>, RegistryError> {
        match self.resolve(ProviderRole::Llm, name)? {
            ProviderHandle::Llm(provider) => Ok(provider),
            other => Err(RegistryError::RoleMismatch {
                expected: ProviderRole::Llm,
                actual: other.role(),
            }),
        }
    }

    pub fn default_name(&self, role: ProviderRole) -> Option<String> {
        self.defaults.get(&role).map(|entry| entry.value().clone())
    }

    /// All registrations for `role`, sorted by name.
    pub fn list(&self, role: ProviderRole) -> Vec<ProviderInfo> {
        let default = self.default_name(role);
        let mut infos: Vec<ProviderInfo> = self
            .providers
            .iter()
            .filter(|entry| entry.key().0 == role)
            .map(|entry| {
                let name = entry.key().1.clone();
                ProviderInfo {
                    role,
                    is_default: default.as_deref() == Some(name.as_str()),
                    name,
                }
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
