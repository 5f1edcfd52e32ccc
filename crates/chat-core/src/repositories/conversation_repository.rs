//! Conversation repository trait (port)
//!
//! The durable store. Every acknowledged write lives here; the cache is
//! rebuilt from it on demand.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use chat_shared::Pagination;

use crate::domain::{Conversation, Message};
use crate::error::ChatError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create(&self, conversation: &Conversation) -> Result<Conversation, ChatError>;
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Conversation>, ChatError>;

    /// Most recently active first.
    async fn list_by_user(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> Result<Vec<Conversation>, ChatError>;

    async fn rename(&self, id: &Uuid, name: &str) -> Result<Option<Conversation>, ChatError>;

    /// Removes the conversation and all of its messages. Returns whether a
    /// conversation row existed.
    async fn delete(&self, id: &Uuid) -> Result<bool, ChatError>;

    /// Inserts the message and bumps `message_count`/`last_activity` in one
    /// transaction. Returns the message as stored (its `created_at` may have
    /// been moved forward) and the updated conversation.
    async fn append_message(&self, message: &Message) -> Result<(Message, Conversation), ChatError>;

    /// Newest `limit` messages, returned oldest first.
    async fn recent_messages(
        &self,
        conversation_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<Message>, ChatError>;

    /// Newest `limit` messages created strictly before `before`, oldest first.
    async fn messages_before(
        &self,
        conversation_id: &Uuid,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Message>, ChatError>;

    async fn has_messages_before(
        &self,
        conversation_id: &Uuid,
        before: DateTime<Utc>,
    ) -> Result<bool, ChatError>;

    async fn find_message(&self, id: &Uuid) -> Result<Option<Message>, ChatError>;

    async fn ping(&self) -> Result<(), ChatError>;
}
