//! Content-addressed response cache with TTL
//!
//! Concurrent misses on the same key both recompute and both write; the last
//! writer wins. Values are JSON strings so any backend can store them.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

/// Key/value cache collaborator
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a live (non-expired) value
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value for `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

/// Typed read through any cache; undecodable entries count as misses
pub async fn cache_get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let raw = cache.get(key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Discarding undecodable cache entry {}: {}", key, e);
            None
        }
    }
}

/// Typed write through any cache
pub async fn cache_set_json<T: Serialize>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration) {
    match serde_json::to_string(value) {
        Ok(json) => cache.set(key, json, ttl).await,
        Err(e) => tracing::warn!("Skipping cache write for {}: {}", key, e),
    }
}

/// Cache entry with TTL
#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: SystemTime,
}

/// In-memory cache
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn get_sync(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if SystemTime::now() < entry.expires_at {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn set_sync(&self, key: &str, value: String, ttl: Duration) {
        let expires_at = SystemTime::now() + ttl;
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), CacheEntry { value, expires_at });
        }
    }

    /// Clear expired entries
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            let now = SystemTime::now();
            entries.retain(|_, entry| now < entry.expires_at);
        }
    }

    /// Clear all entries
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.read() {
            let now = SystemTime::now();
            let total = entries.len();
            let expired = entries.values().filter(|e| now >= e.expires_at).count();

            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
            }
        } else {
            CacheStats::default()
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.get_sync(key)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.set_sync(key, value, ttl)
    }
}

/// Cache statistics
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}
