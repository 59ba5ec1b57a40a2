//! Whole-page cache for anonymous listing pages.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::ports::{Cache, CacheError};
use crate::settings::{INDEX_CACHE_PREFIX, INDEX_CACHE_TTL};

/// Caches rendered page bodies under `<prefix>:<path>` for a fixed TTL.
///
/// There is no single-flight: concurrent misses each render and the last
/// write wins.
pub struct PageCache {
    cache: Arc<dyn Cache>,
    prefix: String,
    ttl: Duration,
}

impl PageCache {
    pub fn new(cache: Arc<dyn Cache>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            ttl,
        }
    }

    /// Cache for the index route.
    pub fn index(cache: Arc<dyn Cache>) -> Self {
        Self::new(cache, INDEX_CACHE_PREFIX, INDEX_CACHE_TTL)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(&self, path: &str) -> String {
        format!("{}:{}", self.prefix, path)
    }

    /// Stored body for `path`, if still fresh. Backend failures read as a miss.
    pub async fn get(&self, path: &str) -> Option<String> {
        match self.cache.get(&self.key(path)).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Page cache read failed");
                None
            }
        }
    }

    /// Store a freshly rendered body. Failures are logged and swallowed.
    pub async fn put(&self, path: &str, body: &str) {
        if let Err(e) = self.cache.set(&self.key(path), body, Some(self.ttl)).await {
            tracing::warn!(path = %path, error = %e, "Page cache write failed");
        }
    }

    /// Return the cached body for `path`, rendering and storing it on a miss.
    pub async fn get_or_render<F, Fut, E>(&self, path: &str, render: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(body) = self.get(path).await {
            tracing::debug!(path = %path, "Page cache hit");
            return Ok(body);
        }

        tracing::debug!(path = %path, "Page cache miss");
        let body = render().await?;
        self.put(path, &body).await;
        Ok(body)
    }

    /// Drop every cached page under this cache's prefix.
    pub async fn clear(&self) -> Result<u64, CacheError> {
        let removed = self.cache.delete_prefix(&format!("{}:", self.prefix)).await?;
        tracing::debug!(prefix = %self.prefix, removed, "Page cache cleared");
        Ok(removed)
    }
}
