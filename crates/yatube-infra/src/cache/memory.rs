//! In-memory cache implementation - used as fallback when Redis is unavailable.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use yatube_core::ports::{Cache, CacheError};

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() >= exp)
            .unwrap_or(false)
    }
}

/// Entries held before a write sweeps out expired ones and, if still full,
/// culls a third of the rest.
pub const DEFAULT_MAX_ENTRIES: usize = 300;

/// In-memory cache using a HashMap behind an async RwLock.
///
/// Entries are lost on process restart and are not shared between workers.
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries, expired ones included.
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

/// Make room for one more entry.
fn make_room(store: &mut HashMap<String, CacheEntry>, max_entries: usize) {
    if store.len() < max_entries {
        return;
    }

    store.retain(|_, entry| !entry.is_expired());
    if store.len() < max_entries {
        return;
    }

    let cull = (store.len() / 3).max(1);
    let victims: Vec<String> = store.keys().take(cull).cloned().collect();
    for key in &victims {
        store.remove(key);
    }
    tracing::debug!(culled = victims.len(), "In-memory cache full, culled entries");
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let store = self.store.read().await;
        let Some(entry) = store.get(key) else {
            return Ok(None);
        };

        if entry.is_expired() {
            drop(store);
            let mut store = self.store.write().await;
            if store.get(key).is_some_and(CacheEntry::is_expired) {
                store.remove(key);
            }
            return Ok(None);
        }

        Ok(Some(entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self.store.write().await;

        if !store.contains_key(key) {
            make_room(&mut store, self.max_entries);
        }

        let expires_at = ttl.map(|d| Instant::now() + d);

        store.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        store.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|key, _| !key.starts_with(prefix));
        Ok((before - store.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();
        cache.set("key1", "value1", None).await.unwrap();
        assert_eq!(cache.get("key1").await.unwrap(), Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();
        cache.set("key1", "value1", None).await.unwrap();
        cache.delete("key1").await.unwrap();
        assert_eq!(cache.get("key1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set("key1", "value1", Some(Duration::from_secs(20)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(19)).await;
        assert_eq!(cache.get("key1").await.unwrap(), Some("value1".to_string()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let cache = InMemoryCache::new();
        cache.set("index_page:/", "a", None).await.unwrap();
        cache.set("index_page:/?page=2", "b", None).await.unwrap();
        cache.set("other:/", "c", None).await.unwrap();

        assert_eq!(cache.delete_prefix("index_page:").await.unwrap(), 2);
        assert_eq!(cache.get("index_page:/").await.unwrap(), None);
        assert_eq!(cache.get("other:/").await.unwrap(), Some("c".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_swept_on_write() {
        let cache = InMemoryCache::with_max_entries(100);
        let ttl = Some(Duration::from_secs(20));
        for page in 0..100 {
            cache
                .set(&format!("index_page:/?page={page}"), "body", ttl)
                .await
                .unwrap();
        }
        assert_eq!(cache.len().await, 100);

        tokio::time::advance(Duration::from_secs(3600)).await;
        cache.set("index_page:/", "fresh", ttl).await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert_eq!(
            cache.get("index_page:/").await.unwrap(),
            Some("fresh".to_string())
        );
    }

    #[tokio::test]
    async fn test_distinct_keys_stay_bounded() {
        let cache = InMemoryCache::new();
        for page in 0..10_000 {
            cache
                .set(&format!("index_page:/?page={page}"), "body", None)
                .await
                .unwrap();
        }
        assert!(cache.len().await <= DEFAULT_MAX_ENTRIES);
    }

    #[tokio::test]
    async fn test_full_cache_culls_live_entries() {
        let cache = InMemoryCache::with_max_entries(3);
        for key in ["a", "b", "c"] {
            cache.set(key, "v", None).await.unwrap();
        }

        cache.set("d", "v", None).await.unwrap();

        assert!(cache.len().await <= 3);
        assert_eq!(cache.get("d").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_overwriting_a_key_does_not_cull() {
        let cache = InMemoryCache::with_max_entries(2);
        cache.set("a", "1", None).await.unwrap();
        cache.set("b", "1", None).await.unwrap();

        cache.set("a", "2", None).await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("b").await.unwrap(), Some("1".to_string()));
    }
}
