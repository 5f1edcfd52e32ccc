// ============================================================================
// Chat Infrastructure - In-process Conversation Cache
// File: crates/chat-infrastructure/src/cache/memory.rs
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use chat_core::domain::{Conversation, Message};
use chat_core::error::ChatError;
use chat_core::repositories::{conversation_key, messages_key, ConversationCache};

#[derive(Debug, Clone)]
struct Entry {
    json: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe in-process cache with the same key layout and encoding as
/// the Redis adapter.
///
/// Used when no Redis URL is configured and as the cache in tests. Expiry
/// follows `tokio::time`, so a paused test clock drives it.
#[derive(Clone, Default)]
pub struct MemoryConversationCache {
    storage: Arc<DashMap<String, Entry>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryConversationCache {
    pub fn new() -> Self {
        info!("Initializing in-process conversation cache");
        Self::default()
    }

    /// Simulate an outage: every call fails until switched back on.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Whether a live (unexpired) entry exists under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.storage.len();
        self.storage.retain(|_, entry| !entry.is_expired(now));

        let count = before.saturating_sub(self.storage.len());
        if count > 0 {
            debug!("Purged {} expired cache entries", count);
        }
        count
    }

    fn check_available(&self) -> Result<(), ChatError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChatError::CacheUnavailable("In-process cache switched off".into()));
        }
        Ok(())
    }

    fn raw(&self, key: &str) -> Option<String> {
        let entry = self.storage.get(key)?;

        // Lazy expiry
        if entry.is_expired(Instant::now()) {
            drop(entry);
            self.storage.remove(key);
            debug!("Cache entry {} expired", key);
            return None;
        }

        Some(entry.json.clone())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ChatError> {
        self.check_available()?;
        match self.raw(key) {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| ChatError::CacheUnavailable(format!("Undecodable entry {}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn set_json<T: serde::Serialize + ?Sized>(&self, key: String, value: &T, ttl: Duration) -> Result<(), ChatError> {
        self.check_available()?;
        let json = serde_json::to_string(value)
            .map_err(|e| ChatError::CacheUnavailable(format!("Failed to encode {}: {}", key, e)))?;

        self.storage.insert(key, Entry { json, expires_at: Instant::now() + ttl });
        Ok(())
    }
}

#[async_trait]
impl ConversationCache for MemoryConversationCache {
    async fn get_conversation(&self, conversation_id: &Uuid) -> Result<Option<Conversation>, ChatError> {
        self.get_json(&conversation_key(conversation_id))
    }

    async fn set_conversation(&self, conversation: &Conversation, ttl: Duration) -> Result<(), ChatError> {
        self.set_json(conversation_key(&conversation.id), conversation, ttl)
    }

    async fn get_messages(&self, conversation_id: &Uuid) -> Result<Option<Vec<Message>>, ChatError> {
        self.get_json(&messages_key(conversation_id))
    }

    async fn set_messages(
        &self,
        conversation_id: &Uuid,
        messages: &[Message],
        ttl: Duration,
    ) -> Result<(), ChatError> {
        self.set_json(messages_key(conversation_id), messages, ttl)
    }

    async fn remove(&self, conversation_id: &Uuid) -> Result<(), ChatError> {
        self.check_available()?;
        self.storage.remove(&conversation_key(conversation_id));
        self.storage.remove(&messages_key(conversation_id));
        Ok(())
    }

    async fn ping(&self) -> Result<(), ChatError> {
        self.check_available()
    }
}
