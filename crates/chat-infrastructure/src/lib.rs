//! # Chat Infrastructure
//! 
//! PostgreSQL durable store and Redis / in-process cache adapters.

pub mod database;
pub mod cache;
pub mod error;

pub use database::{create_pool, run_migrations, PgConversationRepository};
pub use cache::{create_redis_pool, MemoryConversationCache, RedisConversationCache};
pub use error::InfraError;
