//! Database connection pool

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use chat_shared::config::DatabaseSettings;

use crate::error::InfraError;

/// Create the pool once at startup and verify it with a round trip.
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, InfraError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(600))
        .connect(&settings.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    info!("Database pool ready (max {} connections)", settings.max_connections);

    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), InfraError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
