//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use yatube_core::settings::{INDEX_CACHE_TTL, POSTS_PER_PAGE};
use yatube_infra::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the blog on the in-memory database.
    pub database: Option<DatabaseConfig>,
    /// Directory uploaded images are written under.
    pub media_root: PathBuf,
    pub posts_per_page: usize,
    pub index_cache_ttl: Duration,
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: parsed("DB_MAX_CONNECTIONS").unwrap_or(100),
            min_connections: parsed("DB_MIN_CONNECTIONS").unwrap_or(10),
            fallback_to_memory: parsed("DB_FALLBACK_TO_MEMORY").unwrap_or(false),
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT").unwrap_or(8080),
            database,
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
            posts_per_page: parsed("POSTS_PER_PAGE").unwrap_or(POSTS_PER_PAGE),
            index_cache_ttl: parsed("INDEX_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(INDEX_CACHE_TTL),
        }
    }
}
