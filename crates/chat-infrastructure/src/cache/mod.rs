//! Cache adapters

mod memory;
mod redis_cache;

pub use memory::MemoryConversationCache;
pub use redis_cache::{create_redis_pool, RedisConversationCache};
