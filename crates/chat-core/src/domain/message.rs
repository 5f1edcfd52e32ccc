// ============================================================================
// Chat Core - Message Entity
// File: crates/chat-core/src/domain/message.rs
// Description: Append-only chat message and its open metadata map
// ============================================================================

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use chat_shared::{new_id, now_utc};

use crate::error::ChatError;

/// Sender role enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    User,
    Assistant,
    System,
    Tool,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::User => "user",
            SenderRole::Assistant => "assistant",
            SenderRole::System => "system",
            SenderRole::Tool => "tool",
        }
    }
}

impl FromStr for SenderRole {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(SenderRole::User),
            "assistant" => Ok(SenderRole::Assistant),
            "system" => Ok(SenderRole::System),
            "tool" => Ok(SenderRole::Tool),
            other => Err(ChatError::ValidationError(format!("Unknown sender role: {}", other))),
        }
    }
}

/// Schema-less message metadata.
///
/// Always a JSON object. The same serde representation is written to the
/// `message_metadata` JSONB column and into the cached message list, so a
/// message read from either place compares equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageMetadata(Map<String, Value>);

impl MessageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for MessageMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for MessageMetadata {
    type Error = ChatError;

    /// `null` is read as empty metadata; any other non-object is rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ChatError::ValidationError(format!(
                "Message metadata must be a JSON object, got: {}",
                other
            ))),
        }
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_role: SenderRole,
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: MessageMetadata,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// New, not yet stored message. The durable store may move `created_at`
    /// forward to keep per-conversation ordering strict.
    pub fn new(
        conversation_id: Uuid,
        sender_role: SenderRole,
        content: Option<String>,
        metadata: MessageMetadata,
    ) -> Self {
        Self {
            id: new_id(),
            conversation_id,
            sender_role,
            content,
            metadata,
            created_at: now_utc(),
        }
    }
}

/// One page of history, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
    /// `created_at` of the oldest returned message, set only when `has_more`.
    pub next_cursor: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sender_role_parse() {
        assert_eq!("assistant".parse::<SenderRole>().unwrap(), SenderRole::Assistant);
        assert_eq!(SenderRole::Tool.as_str(), "tool");
        assert!("moderator".parse::<SenderRole>().is_err());
    }

    #[test]
    fn test_metadata_serializes_as_plain_object() {
        let metadata = MessageMetadata::new()
            .with("model", "gpt")
            .with("temperature", 0.1)
            .with("tokens", json!({ "prompt": 12, "completion": 40 }));

        let encoded = serde_json::to_value(&metadata).unwrap();
        assert_eq!(encoded["model"], "gpt");
        assert_eq!(encoded["tokens"]["completion"], 40);

        let decoded: MessageMetadata = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_metadata_from_json_value() {
        assert!(MessageMetadata::try_from(Value::Null).unwrap().is_empty());
        assert!(MessageMetadata::try_from(json!([1, 2])).is_err());
        let metadata = MessageMetadata::try_from(json!({ "source": "web" })).unwrap();
        assert_eq!(metadata.get("source"), Some(&json!("web")));
    }

    #[test]
    fn test_message_round_trips_through_cache_encoding() {
        let message = Message::new(
            Uuid::new_v4(),
            SenderRole::User,
            None,
            MessageMetadata::new().with("score", 0.30000000000000004),
        );

        let encoded = serde_json::to_string(&message).unwrap();
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, message);
    }
}
