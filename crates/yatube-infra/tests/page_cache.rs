//! Index page caching over the in-memory cache.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use yatube_core::ports::{Cache, CacheError};
use yatube_core::services::PageCache;
use yatube_core::settings::INDEX_CACHE_TTL;
use yatube_infra::InMemoryCache;

async fn render(counter: &AtomicUsize) -> Result<String, Infallible> {
    let n = counter.fetch_add(1, Ordering::SeqCst);
    Ok(format!("render #{n}"))
}

#[tokio::test(start_paused = true)]
async fn body_is_reused_until_ttl_expires() {
    let cache = PageCache::index(Arc::new(InMemoryCache::new()));
    let renders = AtomicUsize::new(0);

    let first = cache.get_or_render("/", || render(&renders)).await.unwrap();
    tokio::time::advance(INDEX_CACHE_TTL - Duration::from_secs(1)).await;
    let second = cache.get_or_render("/", || render(&renders)).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(renders.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    let third = cache.get_or_render("/", || render(&renders)).await.unwrap();
    assert_ne!(first, third);
    assert_eq!(renders.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn clear_forces_a_fresh_render() {
    let cache = PageCache::index(Arc::new(InMemoryCache::new()));
    let renders = AtomicUsize::new(0);

    let first = cache.get_or_render("/", || render(&renders)).await.unwrap();
    cache.get_or_render("/?page=2", || render(&renders)).await.unwrap();

    assert_eq!(cache.clear().await.unwrap(), 2);

    let again = cache.get_or_render("/", || render(&renders)).await.unwrap();
    assert_ne!(first, again);
}

#[tokio::test]
async fn query_strings_are_cached_separately() {
    let cache = PageCache::index(Arc::new(InMemoryCache::new()));
    let renders = AtomicUsize::new(0);

    let page1 = cache.get_or_render("/", || render(&renders)).await.unwrap();
    let page2 = cache.get_or_render("/?page=2", || render(&renders)).await.unwrap();

    assert_ne!(page1, page2);
    assert_eq!(cache.get("/?page=2").await, Some(page2));
}

#[tokio::test]
async fn render_errors_are_not_cached() {
    let cache = PageCache::index(Arc::new(InMemoryCache::new()));

    let err: Result<String, &str> = cache.get_or_render("/", || async { Err("db down") }).await;
    assert_eq!(err, Err("db down"));
    assert_eq!(cache.get("/").await, None);
}

/// Backend whose reads or writes always fail.
struct BrokenCache {
    reads_fail: bool,
    writes_fail: bool,
}

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        if self.reads_fail {
            return Err(CacheError::Connection("connection reset".to_string()));
        }
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), CacheError> {
        if self.writes_fail {
            return Err(CacheError::Operation("OOM command not allowed".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        Ok(0)
    }
}

#[tokio::test]
async fn read_failure_counts_as_a_miss() {
    let cache = PageCache::index(Arc::new(BrokenCache {
        reads_fail: true,
        writes_fail: false,
    }));
    let renders = AtomicUsize::new(0);

    let body = cache.get_or_render("/", || render(&renders)).await.unwrap();

    assert_eq!(body, "render #0");
    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get("/").await, None);
}

#[tokio::test]
async fn write_failure_still_returns_the_page() {
    let cache = PageCache::index(Arc::new(BrokenCache {
        reads_fail: false,
        writes_fail: true,
    }));
    let renders = AtomicUsize::new(0);

    let first = cache.get_or_render("/", || render(&renders)).await.unwrap();
    let second = cache.get_or_render("/", || render(&renders)).await.unwrap();

    assert_eq!(first, "render #0");
    assert_eq!(second, "render #1");
}
