//! Bounded TTL cache for embeddings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

struct CacheEntry {
    vector: Arc<[f32]>,
    inserted_at: Instant,
}

/// Thread-safe embedding cache with a TTL and a maximum entry count.
///
/// When full, expired entries are purged first, then the oldest entry is
/// evicted. Backed by a sharded map, so evicting one key never blocks reads
/// of keys in other shards.
pub struct EmbeddingCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl EmbeddingCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        {
            let entry = self.entries.get(key)?;
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.vector.to_vec());
            }
        }
        self.entries
            .remove_if(key, |_, entry| entry.inserted_at.elapsed() >= self.ttl);
        None
    }

    pub fn insert(&self, key: String, vector: &[f32]) {
        if self.max_entries == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict();
        }
        self.entries.insert(
            key,
            CacheEntry {
                vector: Arc::from(vector),
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn evict(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        if self.entries.len() < self.max_entries {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().inserted_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

/// Collapse runs of whitespace and trim, so cosmetic differences share a key.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cache key for `text` embedded by `provider`/`model`.
///
/// SHA-256 over the provider, model and normalized text, so switching the
/// active model never serves vectors of the wrong width.
pub fn cache_key(provider: &str, model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update([0u8]);
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(normalize_text(text).as_bytes());
    format!("{:x}", hasher.finalize())
}
