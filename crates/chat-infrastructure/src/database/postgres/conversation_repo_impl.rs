// ============================================================================
// Chat Infrastructure - PostgreSQL Conversation Repository
// File: crates/chat-infrastructure/src/database/postgres/conversation_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error};
use uuid::Uuid;

use chat_core::domain::{Conversation, Message, MessageMetadata};
use chat_core::error::ChatError;
use chat_core::repositories::ConversationRepository;
use chat_shared::Pagination;

pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct ConversationRow {
    id: Uuid,
    user_id: String,
    name: Option<String>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    message_count: i64,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            created_at: row.created_at,
            last_activity: row.last_activity,
            message_count: row.message_count,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_role: String,
    content: Option<String>,
    message_metadata: Json<MessageMetadata>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = ChatError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_role: row.sender_role.parse().map_err(|e: ChatError| {
                ChatError::DurableReadFailure(format!("Corrupt message row {}: {}", row.id, e))
            })?,
            content: row.content,
            metadata: row.message_metadata.0,
            created_at: row.created_at,
        })
    }
}

fn into_messages(rows: Vec<MessageRow>) -> Result<Vec<Message>, ChatError> {
    rows.into_iter().map(Message::try_from).collect()
}

fn read_error(context: &str, e: sqlx::Error) -> ChatError {
    error!("Database error {}: {}", context, e);
    ChatError::DurableReadFailure(e.to_string())
}

fn write_error(context: &str, e: sqlx::Error) -> ChatError {
    error!("Database error {}: {}", context, e);
    ChatError::DurableWriteFailure(e.to_string())
}

const CONVERSATION_COLUMNS: &str = "id, user_id, name, created_at, last_activity, message_count";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_role, content, message_metadata, created_at";

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<Conversation, ChatError> {
        let row: ConversationRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO conversations (id, user_id, name, created_at, last_activity, message_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(conversation.id)
        .bind(&conversation.user_id)
        .bind(&conversation.name)
        .bind(conversation.created_at)
        .bind(conversation.last_activity)
        .bind(conversation.message_count)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error("creating conversation", e))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Conversation>, ChatError> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM conversations WHERE id = $1",
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| read_error("finding conversation by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> Result<Vec<Conversation>, ChatError> {
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM conversations
            WHERE user_id = $1
            ORDER BY last_activity DESC, id
            LIMIT $2 OFFSET $3
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error("listing conversations", e))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn rename(&self, id: &Uuid, name: &str) -> Result<Option<Conversation>, ChatError> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "UPDATE conversations SET name = $2 WHERE id = $1 RETURNING {}",
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error("renaming conversation", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, ChatError> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|e| write_error("starting delete transaction", e))?;

        let messages = sqlx::query("DELETE FROM messages WHERE conversation_id = $1")
            .bind(id)
            .execute(&mut *transaction)
            .await
            .map_err(|e| write_error("deleting messages", e))?;

        let conversations = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&mut *transaction)
            .await
            .map_err(|e| write_error("deleting conversation", e))?;

        transaction
            .commit()
            .await
            .map_err(|e| write_error("committing delete", e))?;

        debug!(
            "Deleted conversation {} ({} messages)",
            id,
            messages.rows_affected()
        );
        Ok(conversations.rows_affected() > 0)
    }

    async fn append_message(&self, message: &Message) -> Result<(Message, Conversation), ChatError> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|e| write_error("starting message transaction", e))?;

        // The row lock taken here serializes appends per conversation, and
        // GREATEST keeps created_at strictly increasing within it.
        let conversation: Option<ConversationRow> = sqlx::query_as(&format!(
            r#"
            UPDATE conversations
            SET message_count = message_count + 1,
                last_activity = GREATEST($2, last_activity + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(message.conversation_id)
        .bind(message.created_at)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|e| write_error("updating conversation activity", e))?;

        let conversation: Conversation = match conversation {
            Some(row) => row.into(),
            None => return Err(ChatError::ConversationNotFound(message.conversation_id)),
        };

        let row: MessageRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO messages (id, conversation_id, sender_role, content, message_metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_role.as_str())
        .bind(&message.content)
        .bind(Json(&message.metadata))
        .bind(conversation.last_activity)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|e| write_error("inserting message", e))?;

        transaction
            .commit()
            .await
            .map_err(|e| write_error("committing message", e))?;

        Ok((row.try_into()?, conversation))
    }

    async fn recent_messages(&self, conversation_id: &Uuid, limit: i64) -> Result<Vec<Message>, ChatError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error("reading recent messages", e))?;

        let mut messages = into_messages(rows)?;
        messages.reverse();
        Ok(messages)
    }

    async fn messages_before(
        &self,
        conversation_id: &Uuid,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Message>, ChatError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE conversation_id = $1 AND created_at < $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(conversation_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error("reading older messages", e))?;

        let mut messages = into_messages(rows)?;
        messages.reverse();
        Ok(messages)
    }

    async fn has_messages_before(
        &self,
        conversation_id: &Uuid,
        before: DateTime<Utc>,
    ) -> Result<bool, ChatError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM messages WHERE conversation_id = $1 AND created_at < $2)",
        )
        .bind(conversation_id)
        .bind(before)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| read_error("checking for older messages", e))
    }

    async fn find_message(&self, id: &Uuid) -> Result<Option<Message>, ChatError> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM messages WHERE id = $1",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| read_error("finding message by id", e))?;

        row.map(Message::try_from).transpose()
    }

    async fn ping(&self) -> Result<(), ChatError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| read_error("pinging database", e))?;
        Ok(())
    }
}
