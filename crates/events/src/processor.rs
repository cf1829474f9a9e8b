//! The webhook event processor
//!
//! Applies one validated event to the entity store, exactly once per event
//! id, and returns a typed outcome. The conversation status state machine
//! lives here: `[start] -> OPEN` on NEW_CONVERSATION, `OPEN -> CLOSED` on
//! CLOSE_CONVERSATION. CLOSED is terminal for writes; NEW_MESSAGE is a
//! guarded side effect available only while the conversation is OPEN.

use std::sync::Arc;

use serde_json::Value;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use chatline_shared::MessageDirection;

use crate::envelope::{EventKind, ValidatedEvent};
use crate::error::{EventError, EventResult};
use crate::fanout::{FanoutBroker, MessagePush};
use crate::outcome::EventOutcome;
use crate::store;

/// Applies validated webhook events to the store and notifies the broker
///
/// Constructed once at startup and shared behind the application state; the
/// broker reference is the same process-wide instance the live-view
/// sessions subscribe on.
pub struct EventProcessor {
    pool: PgPool,
    broker: Arc<FanoutBroker>,
}

impl EventProcessor {
    pub fn new(pool: PgPool, broker: Arc<FanoutBroker>) -> Self {
        Self { pool, broker }
    }

    /// Apply one validated event, returning the typed outcome
    ///
    /// All writes for one event happen inside a single transaction; fanout
    /// happens after commit so live viewers never see a message that was
    /// rolled back.
    pub async fn apply(&self, event: ValidatedEvent) -> EventResult<EventOutcome> {
        match event.kind {
            EventKind::NewConversation => {
                self.handle_new_conversation(&event.data, event.timestamp)
                    .await
            }
            EventKind::NewMessage => self.handle_new_message(&event.data, event.timestamp).await,
            EventKind::CloseConversation => self.handle_close_conversation(&event.data).await,
        }
    }

    async fn handle_new_conversation(
        &self,
        data: &Value,
        timestamp: OffsetDateTime,
    ) -> EventResult<EventOutcome> {
        let conversation_id = parse_uuid(data, "id")?;

        let mut tx = self.pool.begin().await?;

        if store::conversation_exists(&mut *tx, conversation_id).await? {
            return Err(EventError::Conflict("conversation"));
        }

        // A concurrent duplicate that slips past the pre-check loses on the
        // primary key and maps to Conflict via From<sqlx::Error>.
        store::create_conversation(&mut *tx, conversation_id, timestamp).await?;

        tx.commit().await?;

        info!(conversation_id = %conversation_id, "Conversation created");
        Ok(EventOutcome::ConversationCreated)
    }

    async fn handle_new_message(
        &self,
        data: &Value,
        timestamp: OffsetDateTime,
    ) -> EventResult<EventOutcome> {
        let payload = parse_new_message_payload(data)?;

        let mut tx = self.pool.begin().await?;

        // Row-lock the conversation so the status check and the writes
        // below are atomic against a racing CLOSE_CONVERSATION.
        let conversation = store::lock_conversation(&mut *tx, payload.conversation_id)
            .await?
            .ok_or(EventError::NotFound("conversation"))?;

        if conversation.is_closed() {
            return Err(EventError::ConversationClosed);
        }

        if store::message_exists(&mut *tx, payload.id).await? {
            return Err(EventError::Conflict("message"));
        }

        store::insert_message(
            &mut *tx,
            payload.id,
            payload.conversation_id,
            payload.direction.as_str(),
            &payload.content,
            timestamp,
        )
        .await?;
        store::touch_last_message(&mut *tx, payload.conversation_id, timestamp).await?;

        tx.commit().await?;

        // Fanout only after the message is durable. Delivery failures are
        // isolated inside the broker and never fail the accepted write.
        self.broker
            .publish(
                &payload.conversation_id,
                MessagePush {
                    id: payload.id,
                    direction: payload.direction,
                    content: payload.content,
                    timestamp,
                },
            )
            .await;

        info!(
            message_id = %payload.id,
            conversation_id = %payload.conversation_id,
            direction = payload.direction.as_str(),
            "Message created"
        );
        Ok(EventOutcome::MessageCreated)
    }

    async fn handle_close_conversation(&self, data: &Value) -> EventResult<EventOutcome> {
        let conversation_id = parse_uuid(data, "id")?;

        // Single-statement update: idempotent, and atomic against racing
        // message events thanks to the row lock both paths take.
        let closed = store::close_conversation(&self.pool, conversation_id).await?;
        if closed.is_none() {
            return Err(EventError::NotFound("conversation"));
        }

        info!(conversation_id = %conversation_id, "Conversation closed");
        Ok(EventOutcome::ConversationClosed)
    }
}

// =============================================================================
// Payload Parsing
// =============================================================================

/// Parsed NEW_MESSAGE payload
struct NewMessagePayload {
    id: Uuid,
    conversation_id: Uuid,
    direction: MessageDirection,
    content: String,
}

fn parse_uuid(data: &Value, field: &'static str) -> EventResult<Uuid> {
    data.get(field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(EventError::InvalidIdentifier(field))
}

fn parse_new_message_payload(data: &Value) -> EventResult<NewMessagePayload> {
    let id = parse_uuid(data, "id")?;
    let conversation_id = parse_uuid(data, "conversation_id")?;

    let direction = data
        .get("direction")
        .and_then(Value::as_str)
        .and_then(|s| MessageDirection::try_from(s).ok())
        .ok_or_else(|| {
            EventError::InvalidPayload("direction must be 'SENT' or 'RECEIVED'".to_string())
        })?;

    let content = data
        .get("content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EventError::InvalidPayload("content must not be empty".to_string()))?
        .to_string();

    Ok(NewMessagePayload {
        id,
        conversation_id,
        direction,
        content,
    })
}
