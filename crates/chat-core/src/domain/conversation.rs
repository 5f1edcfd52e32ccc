// ============================================================================
// Chat Core - Conversation Entity
// File: crates/chat-core/src/domain/conversation.rs
// Description: Conversation metadata owned by a single user
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use chat_shared::constants::DEFAULT_CONVERSATION_TITLE;
use chat_shared::{new_id, now_utc};

/// Conversation entity
///
/// The durable row is the only authority for `message_count`; a cached
/// snapshot may lag behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: String,

    #[validate(length(min = 1, max = 255, message = "Conversation name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub message_count: i64,
}

impl Conversation {
    pub fn new(user_id: String, name: Option<String>) -> Result<Self, validator::ValidationErrors> {
        let now = now_utc();
        let conversation = Self {
            id: new_id(),
            user_id,
            name: name.and_then(normalize_name),
            created_at: now,
            last_activity: now,
            message_count: 0,
        };

        conversation.validate()?;
        Ok(conversation)
    }

    /// Name shown to users; unnamed conversations read as "New Chat".
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_CONVERSATION_TITLE)
    }

    /// A real title exists (not blank and not the placeholder).
    pub fn has_title(&self) -> bool {
        self.name
            .as_deref()
            .map(|n| !n.trim().is_empty() && n != DEFAULT_CONVERSATION_TITLE)
            .unwrap_or(false)
    }

    pub fn rename(&mut self, name: &str) -> Result<(), validator::ValidationErrors> {
        let mut renamed = self.clone();
        renamed.name = Some(name.trim().to_string());
        renamed.validate()?;

        *self = renamed;
        Ok(())
    }

    /// Activity time for the next message: `now`, pushed past the previous
    /// activity when the clock has not moved, so `created_at` stays strictly
    /// increasing within the conversation.
    pub fn next_activity(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = self.last_activity + chrono::Duration::microseconds(1);
        now.max(floor)
    }

    pub fn record_message(&mut self, at: DateTime<Utc>) {
        self.message_count += 1;
        self.last_activity = at;
    }
}

fn normalize_name(name: String) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
