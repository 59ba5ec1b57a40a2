//! # Yatube Infrastructure
//!
//! Concrete implementations of the ports defined in `yatube-core`.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL repositories via SeaORM
//! - `redis` - Redis page cache
//! - `minimal` - in-memory database and cache only

pub mod auth;
pub mod cache;
pub mod database;
pub mod media;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use cache::InMemoryCache;
pub use database::{DatabaseConfig, InMemoryDatabase};
pub use media::LocalImageStore;

#[cfg(feature = "postgres")]
pub use database::{DatabaseConnections, postgres_repositories};

#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
