//! Common test utilities: an in-memory durable store and misbehaving caches

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use prometheus::Registry;
use uuid::Uuid;

use chat_core::domain::{Conversation, Message};
use chat_core::error::ChatError;
use chat_core::repositories::{ConversationCache, ConversationRepository};
use chat_core::services::{CachePolicy, ConversationService, ServiceMetrics};
use chat_infrastructure::MemoryConversationCache;
use chat_shared::Pagination;

#[derive(Default)]
struct State {
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<Message>,
}

/// Durable store fake with the same ordering and counting rules as the
/// PostgreSQL repository.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
    failing: AtomicBool,
    message_reads: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// How many message-history queries reached the store.
    pub fn message_reads(&self) -> usize {
        self.message_reads.load(Ordering::SeqCst)
    }

    pub fn stored_messages(&self, conversation_id: &Uuid) -> usize {
        self.state
            .lock()
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .count()
    }

    fn check_read(&self) -> Result<(), ChatError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChatError::DurableReadFailure("connection refused".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), ChatError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChatError::DurableWriteFailure("connection refused".into()));
        }
        Ok(())
    }

    /// Messages of one conversation, oldest first.
    fn history(&self, conversation_id: &Uuid) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .state
            .lock()
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        messages
    }
}

fn newest(mut messages: Vec<Message>, limit: i64) -> Vec<Message> {
    let keep = usize::try_from(limit).unwrap_or(0);
    let skip = messages.len().saturating_sub(keep);
    messages.drain(..skip);
    messages
}

#[async_trait]
impl ConversationRepository for InMemoryRepository {
    async fn create(&self, conversation: &Conversation) -> Result<Conversation, ChatError> {
        self.check_write()?;
        self.state
            .lock()
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation.clone())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Conversation>, ChatError> {
        self.check_read()?;
        Ok(self.state.lock().conversations.get(id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> Result<Vec<Conversation>, ChatError> {
        self.check_read()?;
        let mut owned: Vec<Conversation> = self
            .state
            .lock()
            .conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));

        let offset = usize::try_from(pagination.offset()).unwrap_or(0);
        let limit = usize::try_from(pagination.limit()).unwrap_or(0);
        Ok(owned.into_iter().skip(offset).take(limit).collect())
    }

    async fn rename(&self, id: &Uuid, name: &str) -> Result<Option<Conversation>, ChatError> {
        self.check_write()?;
        let mut state = self.state.lock();
        Ok(state.conversations.get_mut(id).map(|c| {
            c.name = Some(name.to_string());
            c.clone()
        }))
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, ChatError> {
        self.check_write()?;
        let mut state = self.state.lock();
        state.messages.retain(|m| m.conversation_id != *id);
        Ok(state.conversations.remove(id).is_some())
    }

    async fn append_message(&self, message: &Message) -> Result<(Message, Conversation), ChatError> {
        self.check_write()?;
        let mut state = self.state.lock();
        let conversation = state
            .conversations
            .get_mut(&message.conversation_id)
            .ok_or(ChatError::ConversationNotFound(message.conversation_id))?;

        let created_at = conversation.next_activity(message.created_at);
        conversation.record_message(created_at);
        let conversation = conversation.clone();

        let mut stored = message.clone();
        stored.created_at = created_at;
        state.messages.push(stored.clone());

        Ok((stored, conversation))
    }

    async fn recent_messages(&self, conversation_id: &Uuid, limit: i64) -> Result<Vec<Message>, ChatError> {
        self.check_read()?;
        self.message_reads.fetch_add(1, Ordering::SeqCst);
        Ok(newest(self.history(conversation_id), limit))
    }

    async fn messages_before(
        &self,
        conversation_id: &Uuid,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Message>, ChatError> {
        self.check_read()?;
        self.message_reads.fetch_add(1, Ordering::SeqCst);
        let older = self
            .history(conversation_id)
            .into_iter()
            .filter(|m| m.created_at < before)
            .collect();
        Ok(newest(older, limit))
    }

    async fn has_messages_before(
        &self,
        conversation_id: &Uuid,
        before: DateTime<Utc>,
    ) -> Result<bool, ChatError> {
        self.check_read()?;
        Ok(self.history(conversation_id).iter().any(|m| m.created_at < before))
    }

    async fn find_message(&self, id: &Uuid) -> Result<Option<Message>, ChatError> {
        self.check_read()?;
        Ok(self.state.lock().messages.iter().find(|m| m.id == *id).cloned())
    }

    async fn ping(&self) -> Result<(), ChatError> {
        self.check_read()
    }
}

/// Cache whose every call fails immediately.
pub struct FailingCache;

#[async_trait]
impl ConversationCache for FailingCache {
    async fn get_conversation(&self, _: &Uuid) -> Result<Option<Conversation>, ChatError> {
        Err(ChatError::CacheUnavailable("connection refused".into()))
    }

    async fn set_conversation(&self, _: &Conversation, _: Duration) -> Result<(), ChatError> {
        Err(ChatError::CacheUnavailable("connection refused".into()))
    }

    async fn get_messages(&self, _: &Uuid) -> Result<Option<Vec<Message>>, ChatError> {
        Err(ChatError::CacheUnavailable("connection refused".into()))
    }

    async fn set_messages(&self, _: &Uuid, _: &[Message], _: Duration) -> Result<(), ChatError> {
        Err(ChatError::CacheUnavailable("connection refused".into()))
    }

    async fn remove(&self, _: &Uuid) -> Result<(), ChatError> {
        Err(ChatError::CacheUnavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), ChatError> {
        Err(ChatError::CacheUnavailable("connection refused".into()))
    }
}

/// Cache whose every call never completes.
pub struct HangingCache;

#[async_trait]
impl ConversationCache for HangingCache {
    async fn get_conversation(&self, _: &Uuid) -> Result<Option<Conversation>, ChatError> {
        std::future::pending().await
    }

    async fn set_conversation(&self, _: &Conversation, _: Duration) -> Result<(), ChatError> {
        std::future::pending().await
    }

    async fn get_messages(&self, _: &Uuid) -> Result<Option<Vec<Message>>, ChatError> {
        std::future::pending().await
    }

    async fn set_messages(&self, _: &Uuid, _: &[Message], _: Duration) -> Result<(), ChatError> {
        std::future::pending().await
    }

    async fn remove(&self, _: &Uuid) -> Result<(), ChatError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), ChatError> {
        std::future::pending().await
    }
}

pub type MemoryService = ConversationService<InMemoryRepository, MemoryConversationCache>;

pub struct Harness {
    pub service: Arc<MemoryService>,
    pub repository: Arc<InMemoryRepository>,
    pub cache: MemoryConversationCache,
}

pub fn harness() -> Harness {
    let repository = Arc::new(InMemoryRepository::new());
    let cache = MemoryConversationCache::new();
    let service = with_cache(repository.clone(), Arc::new(cache.clone()));

    Harness { service: Arc::new(service), repository, cache }
}

pub fn with_cache<C: ConversationCache>(
    repository: Arc<InMemoryRepository>,
    cache: Arc<C>,
) -> ConversationService<InMemoryRepository, C> {
    let metrics = ServiceMetrics::new(&Registry::new()).expect("metrics registration");
    ConversationService::new(repository, cache, CachePolicy::default(), metrics)
}

/// A conversation written straight to the durable store, bypassing the cache.
pub async fn seed_conversation(repository: &InMemoryRepository, user_id: &str) -> Conversation {
    let conversation = Conversation::new(user_id.to_string(), None).expect("valid conversation");
    repository.create(&conversation).await.expect("seeded conversation")
}
