//! Conversation cache trait (port)
//!
//! A disposable projection of the durable store. Every failure is reported
//! as `ChatError::CacheUnavailable`; callers treat it as a miss.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Conversation, Message};
use crate::error::ChatError;

/// `conversation:{id}` holds the serialized conversation snapshot.
pub fn conversation_key(conversation_id: &Uuid) -> String {
    format!("conversation:{}", conversation_id)
}

/// `conversation:{id}:messages` holds the recent message window, oldest first.
pub fn messages_key(conversation_id: &Uuid) -> String {
    format!("conversation:{}:messages", conversation_id)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationCache: Send + Sync {
    async fn get_conversation(&self, conversation_id: &Uuid) -> Result<Option<Conversation>, ChatError>;

    async fn set_conversation(&self, conversation: &Conversation, ttl: Duration) -> Result<(), ChatError>;

    async fn get_messages(&self, conversation_id: &Uuid) -> Result<Option<Vec<Message>>, ChatError>;

    /// Replaces the whole window; the expiry restarts at `ttl`.
    async fn set_messages(
        &self,
        conversation_id: &Uuid,
        messages: &[Message],
        ttl: Duration,
    ) -> Result<(), ChatError>;

    /// Drops both keys of the conversation. Missing keys are not an error.
    async fn remove(&self, conversation_id: &Uuid) -> Result<(), ChatError>;

    async fn ping(&self) -> Result<(), ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = Uuid::parse_str("7f1c1c8e-6f43-4d3b-9d55-0c1a1f0e2b6a").unwrap();
        assert_eq!(conversation_key(&id), "conversation:7f1c1c8e-6f43-4d3b-9d55-0c1a1f0e2b6a");
        assert_eq!(
            messages_key(&id),
            "conversation:7f1c1c8e-6f43-4d3b-9d55-0c1a1f0e2b6a:messages"
        );
    }
}
