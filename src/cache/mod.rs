//! Cache capability for derived read models
//!
//! The core treats caching as an injected capability: a `get`/`set`/
//! `invalidate` seam the scoring engine consults for credit profile reads.
//! Correctness never depends on it. [`NoopCache`] satisfies the trait, and
//! every mutation path invalidates after commit, so a cold or absent cache
//! only costs recomputation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Key/value cache seam consumed by the core
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a cached value, if present and unexpired
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value under `key` for `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Drop entries matching `pattern`. A trailing `*` matches by prefix;
    /// anything else is an exact key.
    async fn invalidate(&self, pattern: &str);
}

/// Cache implementation that stores nothing
#[derive(Debug, Default, Clone)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) {}

    async fn invalidate(&self, _pattern: &str) {}
}

/// In-process cache with per-entry TTL
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            _ => None,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
    }

    async fn invalidate(&self, pattern: &str) {
        let mut entries = self.entries.write().await;
        match pattern.strip_suffix('*') {
            Some(prefix) => entries.retain(|key, _| !key.starts_with(prefix)),
            None => {
                entries.remove(pattern);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        cache
            .set("credit:profile:1", "{}".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("credit:profile:1").await, Some("{}".to_string()));
        assert_eq!(cache.get("credit:profile:2").await, None);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_memory_cache_invalidate_exact_and_prefix() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("credit:profile:1", "a".to_string(), ttl).await;
        cache.set("credit:profile:2", "b".to_string(), ttl).await;
        cache.set("other", "c".to_string(), ttl).await;

        cache.invalidate("credit:profile:1").await;
        assert_eq!(cache.get("credit:profile:1").await, None);
        assert!(cache.get("credit:profile:2").await.is_some());

        cache.invalidate("credit:profile:*").await;
        assert_eq!(cache.get("credit:profile:2").await, None);
        assert!(cache.get("other").await.is_some());
    }

    #[tokio::test]
    async fn test_noop_cache_stores_nothing() {
        let cache = NoopCache;
        cache
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("k").await, None);
    }
}
