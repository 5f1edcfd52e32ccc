// ============================================================================
// Chat Core - Conversation Service
// File: crates/chat-core/src/services/conversation_service.rs
// ============================================================================
//! Cache-aside reads and dual writes over the durable store and the cache.
//!
//! The durable store is the correctness boundary: its failures always reach
//! the caller. Cache failures and timeouts are absorbed here, turned into a
//! fallback (reads) or a logged, counted staleness event (writes).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chat_shared::config::CacheSettings;
use chat_shared::constants::{CACHE_TTL_SECS, DEFAULT_CACHE_OP_TIMEOUT_MS, MAX_CACHED_MESSAGES};
use chat_shared::Pagination;

use crate::domain::{Conversation, Message, MessageMetadata, MessagePage, SenderRole};
use crate::error::ChatError;
use crate::repositories::{ConversationCache, ConversationRepository};

use super::locks::ConversationLocks;
use super::metrics::{ServiceMetrics, ENTRY_CONVERSATION, ENTRY_MESSAGES};
use super::trimmer::{tail, Trimmer};

/// Cache behaviour knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub max_cached_messages: usize,
    /// Deadline for a single cache call.
    pub op_timeout: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(CACHE_TTL_SECS),
            max_cached_messages: MAX_CACHED_MESSAGES,
            op_timeout: Duration::from_millis(DEFAULT_CACHE_OP_TIMEOUT_MS),
        }
    }
}

impl From<&CacheSettings> for CachePolicy {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            ttl: settings.ttl(),
            max_cached_messages: settings.max_cached_messages.max(1),
            op_timeout: settings.op_timeout(),
        }
    }
}

/// Reachability of both stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    pub durable: bool,
    pub cache: bool,
}

impl HealthStatus {
    pub fn is_ready(&self) -> bool {
        self.durable && self.cache
    }
}

/// Entry point for every conversation and message operation
pub struct ConversationService<R, C>
where
    R: ConversationRepository + ?Sized,
    C: ConversationCache + ?Sized,
{
    repository: Arc<R>,
    cache: Arc<C>,
    trimmer: Trimmer,
    policy: CachePolicy,
    locks: ConversationLocks,
    metrics: ServiceMetrics,
}

impl<R, C> ConversationService<R, C>
where
    R: ConversationRepository + ?Sized,
    C: ConversationCache + ?Sized,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, policy: CachePolicy, metrics: ServiceMetrics) -> Self {
        Self {
            repository,
            cache,
            trimmer: Trimmer::new(policy.max_cached_messages),
            policy,
            locks: ConversationLocks::new(),
            metrics,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    /// Create a conversation owned by `user_id`
    pub async fn create_conversation(
        &self,
        user_id: &str,
        name: Option<String>,
    ) -> Result<Conversation, ChatError> {
        if user_id.trim().is_empty() {
            return Err(ChatError::ValidationError("user_id must not be empty".into()));
        }

        let conversation = Conversation::new(user_id.to_string(), name)?;
        let created = self.repository.create(&conversation).await?;
        info!("Conversation {} created for user {}", created.id, created.user_id);

        let (snapshot, window) = futures::join!(
            self.cache_call("set_conversation", created.id, self.cache.set_conversation(&created, self.policy.ttl)),
            self.cache_call("set_messages", created.id, self.cache.set_messages(&created.id, &[], self.policy.ttl)),
        );
        if snapshot.is_none() || window.is_none() {
            self.mark_stale(created.id).await;
        }

        Ok(created)
    }

    /// Persist a message, then mirror it into the cached window.
    ///
    /// Fails only when the durable insert fails, in which case the cache is
    /// not touched.
    pub async fn add_message(
        &self,
        conversation_id: &Uuid,
        sender_role: SenderRole,
        content: Option<String>,
        metadata: MessageMetadata,
    ) -> Result<Message, ChatError> {
        let message = Message::new(*conversation_id, sender_role, content, metadata);

        let _guard = self.locks.lock(*conversation_id).await;

        let (stored, conversation) = self.repository.append_message(&message).await?;
        debug!(
            "Message {} stored in conversation {} (count {})",
            stored.id, conversation_id, conversation.message_count
        );

        let window = match self
            .cache_call("get_messages", *conversation_id, self.cache.get_messages(conversation_id))
            .await
        {
            Some(cached) => cached.unwrap_or_default(),
            None => {
                // Current window unknown; appending to a guess could leave a
                // hole, so drop the entries instead.
                self.mark_stale(*conversation_id).await;
                return Ok(stored);
            }
        };
        let window = self.trimmer.append(window, stored.clone());

        let (messages_written, snapshot_written) = futures::join!(
            self.cache_call(
                "set_messages",
                *conversation_id,
                self.cache.set_messages(conversation_id, &window, self.policy.ttl),
            ),
            self.cache_call(
                "set_conversation",
                *conversation_id,
                self.cache.set_conversation(&conversation, self.policy.ttl),
            ),
        );
        if messages_written.is_none() || snapshot_written.is_none() {
            self.mark_stale(*conversation_id).await;
        }

        Ok(stored)
    }

    /// Conversation metadata, cache first
    pub async fn get_conversation(&self, conversation_id: &Uuid) -> Result<Conversation, ChatError> {
        if let Some(Some(conversation)) = self
            .cache_call("get_conversation", *conversation_id, self.cache.get_conversation(conversation_id))
            .await
        {
            self.metrics.hit(ENTRY_CONVERSATION);
            return Ok(conversation);
        }
        self.metrics.miss(ENTRY_CONVERSATION);

        let _guard = self.locks.lock(*conversation_id).await;
        let conversation = self
            .repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(ChatError::ConversationNotFound(*conversation_id))?;

        self.cache_call(
            "set_conversation",
            *conversation_id,
            self.cache.set_conversation(&conversation, self.policy.ttl),
        )
        .await;

        Ok(conversation)
    }

    /// Newest `limit` messages, oldest first.
    ///
    /// Served from the cache only when the cached window holds at least
    /// `limit` messages, or provably holds the whole conversation. Anything
    /// else is resolved against the durable store and re-cached.
    pub async fn get_recent_messages(
        &self,
        conversation_id: &Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, ChatError> {
        if let Some(messages) = self.cached_window(conversation_id, limit).await {
            self.metrics.hit(ENTRY_MESSAGES);
            return Ok(tail(&messages, limit).to_vec());
        }
        self.metrics.miss(ENTRY_MESSAGES);

        let _guard = self.locks.lock(*conversation_id).await;
        let conversation = self
            .repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(ChatError::ConversationNotFound(*conversation_id))?;

        let fetch = limit.max(self.policy.max_cached_messages);
        let messages = self
            .repository
            .recent_messages(conversation_id, i64::try_from(fetch).unwrap_or(i64::MAX))
            .await?;

        let window = self.trimmer.trim(messages.clone());
        let (messages_written, snapshot_written) = futures::join!(
            self.cache_call(
                "set_messages",
                *conversation_id,
                self.cache.set_messages(conversation_id, &window, self.policy.ttl),
            ),
            self.cache_call(
                "set_conversation",
                *conversation_id,
                self.cache.set_conversation(&conversation, self.policy.ttl),
            ),
        );
        if messages_written.is_none() || snapshot_written.is_none() {
            debug!("Warm-up of conversation {} incomplete", conversation_id);
        }

        Ok(tail(&messages, limit).to_vec())
    }

    /// Cursor pagination over the history, newest page first.
    ///
    /// Without a cursor the page is the cache-aside recent window; with one,
    /// it is always read from the durable store.
    pub async fn get_messages_page(
        &self,
        conversation_id: &Uuid,
        limit: usize,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<MessagePage, ChatError> {
        let messages = match cursor {
            None => self.get_recent_messages(conversation_id, limit).await?,
            Some(before) => {
                let messages = self
                    .repository
                    .messages_before(conversation_id, before, i64::try_from(limit).unwrap_or(i64::MAX))
                    .await?;
                if messages.is_empty() && self.repository.find_by_id(conversation_id).await?.is_none() {
                    return Err(ChatError::ConversationNotFound(*conversation_id));
                }
                messages
            }
        };

        let oldest = match messages.first() {
            Some(message) if messages.len() >= limit => message.created_at,
            _ => {
                return Ok(MessagePage { messages, has_more: false, next_cursor: None });
            }
        };

        let has_more = self.repository.has_messages_before(conversation_id, oldest).await?;
        Ok(MessagePage {
            messages,
            has_more,
            next_cursor: has_more.then_some(oldest),
        })
    }

    /// Always answered by the durable store.
    pub async fn list_conversations(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> Result<Vec<Conversation>, ChatError> {
        self.repository.list_by_user(user_id, pagination).await
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: &Uuid,
        name: &str,
    ) -> Result<Conversation, ChatError> {
        let _guard = self.locks.lock(*conversation_id).await;

        let mut conversation = self
            .repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(ChatError::ConversationNotFound(*conversation_id))?;
        conversation.rename(name)?;

        let renamed = self
            .repository
            .rename(conversation_id, conversation.title())
            .await?
            .ok_or(ChatError::ConversationNotFound(*conversation_id))?;

        if self
            .cache_call(
                "set_conversation",
                *conversation_id,
                self.cache.set_conversation(&renamed, self.policy.ttl),
            )
            .await
            .is_none()
        {
            self.mark_stale(*conversation_id).await;
        }

        info!("Conversation {} renamed", conversation_id);
        Ok(renamed)
    }

    /// Whether a real title was set. Read from the durable store, never
    /// the cache.
    pub async fn has_title(&self, conversation_id: &Uuid) -> Result<bool, ChatError> {
        let conversation = self
            .repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(ChatError::ConversationNotFound(*conversation_id))?;
        Ok(conversation.has_title())
    }

    pub async fn get_message(&self, message_id: &Uuid) -> Result<Message, ChatError> {
        self.repository
            .find_message(message_id)
            .await?
            .ok_or(ChatError::MessageNotFound(*message_id))
    }

    /// Remove the conversation everywhere. Deleting an unknown id is a no-op.
    pub async fn delete_conversation(&self, conversation_id: &Uuid) -> Result<(), ChatError> {
        let _guard = self.locks.lock(*conversation_id).await;

        let existed = self.repository.delete(conversation_id).await?;

        if self
            .cache_call("remove", *conversation_id, self.cache.remove(conversation_id))
            .await
            .is_none()
        {
            self.metrics.stale_write();
            warn!(
                "Conversation {} deleted but its cache entries could not be removed; they expire with their TTL",
                conversation_id
            );
        }

        if existed {
            info!("Conversation {} deleted", conversation_id);
        } else {
            debug!("Delete of unknown conversation {} ignored", conversation_id);
        }
        Ok(())
    }

    /// Probe both stores; the cache probe obeys the cache deadline.
    pub async fn check_health(&self) -> HealthStatus {
        let (durable, cache) = futures::join!(
            self.repository.ping(),
            tokio::time::timeout(self.policy.op_timeout, self.cache.ping()),
        );

        if let Err(e) = &durable {
            warn!("Durable store health check failed: {}", e);
        }

        HealthStatus {
            durable: durable.is_ok(),
            cache: matches!(cache, Ok(Ok(()))),
        }
    }

    /// Cached window when it can answer `limit` on its own.
    async fn cached_window(&self, conversation_id: &Uuid, limit: usize) -> Option<Vec<Message>> {
        let messages = self
            .cache_call("get_messages", *conversation_id, self.cache.get_messages(conversation_id))
            .await??;

        if messages.len() >= limit {
            return Some(messages);
        }

        // Short window: only complete if it matches the snapshot's count.
        // A disagreement (either side stale) is a miss.
        let snapshot = self
            .cache_call("get_conversation", *conversation_id, self.cache.get_conversation(conversation_id))
            .await??;
        let complete = usize::try_from(snapshot.message_count)
            .map(|count| count == messages.len())
            .unwrap_or(false);

        complete.then_some(messages)
    }

    /// Run one cache call under the cache deadline. `None` means the call
    /// failed or timed out; the failure is logged and counted.
    async fn cache_call<T, F>(&self, operation: &'static str, conversation_id: Uuid, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, ChatError>>,
    {
        match tokio::time::timeout(self.policy.op_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                self.metrics.cache_error(operation);
                warn!("Cache {} failed for conversation {}: {}", operation, conversation_id, e);
                None
            }
            Err(_) => {
                self.metrics.cache_error(operation);
                warn!(
                    "Cache {} timed out after {:?} for conversation {}",
                    operation, self.policy.op_timeout, conversation_id
                );
                None
            }
        }
    }

    /// A durable write went through but the cache could not follow. Drop the
    /// conversation's entries so the next read rebuilds them.
    async fn mark_stale(&self, conversation_id: Uuid) {
        self.metrics.stale_write();
        let removed = self
            .cache_call("remove", conversation_id, self.cache.remove(&conversation_id))
            .await
            .is_some();

        warn!(
            "Cache for conversation {} out of date after durable write (entries {})",
            conversation_id,
            if removed { "dropped" } else { "left until TTL" }
        );
    }
}
