// ============================================================================
// Chat Infrastructure - Redis Conversation Cache
// File: crates/chat-infrastructure/src/cache/redis_cache.rs
// ============================================================================
//! Both entries are stored as JSON strings under the conversation key
//! layout, each with its own expiry.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use chat_core::domain::{Conversation, Message};
use chat_core::error::ChatError;
use chat_core::repositories::{conversation_key, messages_key, ConversationCache};

use crate::error::InfraError;

/// Build the connection pool. Connections are opened lazily, so this
/// succeeds even while Redis is down.
pub fn create_redis_pool(url: &str, max_connections: usize) -> Result<Pool, InfraError> {
    let mut config = Config::from_url(url);
    config.pool = Some(PoolConfig::new(max_connections));

    let pool = config.create_pool(Some(Runtime::Tokio1))?;
    info!("Redis pool created (max {} connections)", max_connections);
    Ok(pool)
}

#[derive(Clone)]
pub struct RedisConversationCache {
    pool: Pool,
}

impl RedisConversationCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<Connection, ChatError> {
        self.pool
            .get()
            .await
            .map_err(|e| ChatError::CacheUnavailable(format!("Failed to get Redis connection: {}", e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ChatError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| ChatError::CacheUnavailable(format!("Failed to get {}: {}", key, e)))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| ChatError::CacheUnavailable(format!("Undecodable entry {}: {}", key, e))),
            None => {
                debug!("Cache miss for key: {}", key);
                Ok(None)
            }
        }
    }

    async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), ChatError> {
        let json = serde_json::to_string(value)
            .map_err(|e| ChatError::CacheUnavailable(format!("Failed to encode {}: {}", key, e)))?;

        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs().max(1))
            .await
            .map_err(|e| ChatError::CacheUnavailable(format!("Failed to set {}: {}", key, e)))
    }
}

#[async_trait]
impl ConversationCache for RedisConversationCache {
    async fn get_conversation(&self, conversation_id: &Uuid) -> Result<Option<Conversation>, ChatError> {
        self.get_json(&conversation_key(conversation_id)).await
    }

    async fn set_conversation(&self, conversation: &Conversation, ttl: Duration) -> Result<(), ChatError> {
        self.set_json(&conversation_key(&conversation.id), conversation, ttl).await
    }

    async fn get_messages(&self, conversation_id: &Uuid) -> Result<Option<Vec<Message>>, ChatError> {
        self.get_json(&messages_key(conversation_id)).await
    }

    async fn set_messages(
        &self,
        conversation_id: &Uuid,
        messages: &[Message],
        ttl: Duration,
    ) -> Result<(), ChatError> {
        self.set_json(&messages_key(conversation_id), messages, ttl).await
    }

    async fn remove(&self, conversation_id: &Uuid) -> Result<(), ChatError> {
        let keys = [conversation_key(conversation_id), messages_key(conversation_id)];

        let mut conn = self.connection().await?;
        conn.del::<_, ()>(&keys[..])
            .await
            .map_err(|e| ChatError::CacheUnavailable(format!("Failed to delete keys of {}: {}", conversation_id, e)))
    }

    async fn ping(&self) -> Result<(), ChatError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| ChatError::CacheUnavailable(format!("Failed to ping Redis: {}", e)))?;
        Ok(())
    }
}
