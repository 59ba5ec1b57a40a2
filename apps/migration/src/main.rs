//! Schema migration CLI. Reads `DATABASE_URL`; run `migration up` to create
//! the blog tables.

use sea_orm_migration::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sea_orm_migration=info")),
        )
        .init();

    cli::run_cli(migration::Migrator).await;
}
