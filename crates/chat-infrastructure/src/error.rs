//! Startup errors of the adapters

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to create Redis pool: {0}")]
    RedisPool(#[from] deadpool_redis::CreatePoolError),
}
