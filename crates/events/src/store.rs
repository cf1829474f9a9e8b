//! Entity store queries for conversations and messages
//!
//! Every function takes a `PgExecutor` so the processor can run the
//! existence/status/write sequence on one transaction while read paths use
//! the pool directly.

use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use chatline_shared::{Conversation, Message};

/// Fetch a conversation by id
pub async fn get_conversation<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Conversation>> {
    sqlx::query_as(
        r#"
        SELECT id, status::text AS status, created_at, last_message_at
        FROM conversations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Fetch a conversation by id, row-locked for the current transaction
///
/// Serializes concurrent writers against the same conversation: a racing
/// NEW_MESSAGE / CLOSE_CONVERSATION pair cannot interleave between the
/// status check and the write.
pub async fn lock_conversation<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Conversation>> {
    sqlx::query_as(
        r#"
        SELECT id, status::text AS status, created_at, last_message_at
        FROM conversations
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Check whether a conversation exists
pub async fn conversation_exists<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM conversations WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await
}

/// Create a conversation with status OPEN
pub async fn create_conversation<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    created_at: OffsetDateTime,
) -> sqlx::Result<Conversation> {
    sqlx::query_as(
        r#"
        INSERT INTO conversations (id, status, created_at)
        VALUES ($1, 'OPEN', $2)
        RETURNING id, status::text AS status, created_at, last_message_at
        "#,
    )
    .bind(id)
    .bind(created_at)
    .fetch_one(executor)
    .await
}

/// Close a conversation, returning the updated row
///
/// Idempotent at the SQL level: closing an already-closed conversation
/// matches the row and leaves status CLOSED. Returns `None` when the
/// conversation does not exist.
pub async fn close_conversation<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Conversation>> {
    sqlx::query_as(
        r#"
        UPDATE conversations
        SET status = 'CLOSED'
        WHERE id = $1
        RETURNING id, status::text AS status, created_at, last_message_at
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Set `last_message_at` on a conversation
pub async fn touch_last_message<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    timestamp: OffsetDateTime,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
        .bind(id)
        .bind(timestamp)
        .execute(executor)
        .await?;

    Ok(())
}

/// Check whether a message exists
pub async fn message_exists<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM messages WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await
}

/// Insert a message
pub async fn insert_message<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    conversation_id: Uuid,
    direction: &str,
    content: &str,
    timestamp: OffsetDateTime,
) -> sqlx::Result<Message> {
    sqlx::query_as(
        r#"
        INSERT INTO messages (id, conversation_id, direction, content, "timestamp")
        VALUES ($1, $2, $3::message_direction, $4, $5)
        RETURNING id, conversation_id, direction::text AS direction, content, "timestamp"
        "#,
    )
    .bind(id)
    .bind(conversation_id)
    .bind(direction)
    .bind(content)
    .bind(timestamp)
    .fetch_one(executor)
    .await
}

/// Fetch a message by id
pub async fn get_message<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> sqlx::Result<Option<Message>> {
    sqlx::query_as(
        r#"
        SELECT id, conversation_id, direction::text AS direction, content, "timestamp"
        FROM messages
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// All messages of one conversation, ordered by timestamp
pub async fn get_messages<'e>(
    executor: impl PgExecutor<'e>,
    conversation_id: Uuid,
) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as(
        r#"
        SELECT id, conversation_id, direction::text AS direction, content, "timestamp"
        FROM messages
        WHERE conversation_id = $1
        ORDER BY "timestamp" ASC
        "#,
    )
    .bind(conversation_id)
    .fetch_all(executor)
    .await
}

/// All conversations, most recently active first
pub async fn list_conversations<'e>(
    executor: impl PgExecutor<'e>,
) -> sqlx::Result<Vec<Conversation>> {
    sqlx::query_as(
        r#"
        SELECT id, status::text AS status, created_at, last_message_at
        FROM conversations
        ORDER BY last_message_at DESC NULLS LAST, created_at DESC
        "#,
    )
    .fetch_all(executor)
    .await
}

/// All messages across conversations, ordered by timestamp
pub async fn list_messages<'e>(executor: impl PgExecutor<'e>) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as(
        r#"
        SELECT id, conversation_id, direction::text AS direction, content, "timestamp"
        FROM messages
        ORDER BY "timestamp" ASC
        "#,
    )
    .fetch_all(executor)
    .await
}
