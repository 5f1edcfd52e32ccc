//! Domain errors

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(Uuid),

    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),

    /// Insert/update against the durable store failed. Nothing was cached.
    #[error("Durable write failed: {0}")]
    DurableWriteFailure(String),

    /// Query against the durable store failed. The cache was left untouched.
    #[error("Durable read failed: {0}")]
    DurableReadFailure(String),

    /// Cache unreachable, timed out, or holding an undecodable entry.
    /// Never returned by `ConversationService`; absorbed into a fallback.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ChatError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChatError::ConversationNotFound(_) | ChatError::MessageNotFound(_))
    }

    /// True when the durable store itself could not be reached or written.
    pub fn is_durable_failure(&self) -> bool {
        matches!(self, ChatError::DurableWriteFailure(_) | ChatError::DurableReadFailure(_))
    }
}

impl From<validator::ValidationErrors> for ChatError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ChatError::ValidationError(errors.to_string())
    }
}
