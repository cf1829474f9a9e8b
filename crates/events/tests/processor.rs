//! Integration tests for the webhook event processor
//!
//! These tests run the full validate -> apply -> store -> fanout pipeline
//! against a real Postgres database.
//!
//! ## Running Tests
//! ```bash
//! export DATABASE_URL="postgres://localhost/chatline_test"
//! cargo test --test processor -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use chatline_events::{
    parse_envelope, store, EventError, EventOutcome, EventProcessor, EventResult, FanoutBroker,
};

// ============================================================================
// Test Utilities
// ============================================================================

/// Connect to the test database, run migrations, and build a processor
async fn setup() -> (EventProcessor, Arc<FanoutBroker>, PgPool) {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

    let pool = chatline_shared::create_pool(&database_url, 5)
        .await
        .expect("Failed to connect to test database");
    chatline_shared::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let broker = Arc::new(FanoutBroker::new());
    let processor = EventProcessor::new(pool.clone(), Arc::clone(&broker));
    (processor, broker, pool)
}

/// Validate and apply a raw envelope in one step
async fn apply(
    processor: &EventProcessor,
    envelope: serde_json::Value,
) -> EventResult<EventOutcome> {
    let event = parse_envelope(&envelope)?;
    processor.apply(event).await
}

fn new_conversation(id: Uuid, timestamp: &str) -> serde_json::Value {
    json!({
        "type": "NEW_CONVERSATION",
        "timestamp": timestamp,
        "data": {"id": id.to_string()}
    })
}

fn new_message(id: Uuid, conversation_id: Uuid, content: &str, timestamp: &str) -> serde_json::Value {
    json!({
        "type": "NEW_MESSAGE",
        "timestamp": timestamp,
        "data": {
            "id": id.to_string(),
            "conversation_id": conversation_id.to_string(),
            "direction": "RECEIVED",
            "content": content
        }
    })
}

fn close_conversation(id: Uuid) -> serde_json::Value {
    json!({
        "type": "CLOSE_CONVERSATION",
        "timestamp": "2025-01-01T00:00:00",
        "data": {"id": id.to_string()}
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
#[ignore] // Requires database
async fn test_new_conversation_starts_open() {
    let (processor, _broker, pool) = setup().await;
    let conversation_id = Uuid::new_v4();

    let outcome = apply(
        &processor,
        new_conversation(conversation_id, "2025-01-01T00:00:00"),
    )
    .await
    .unwrap();
    assert_eq!(outcome, EventOutcome::ConversationCreated);

    let conversation = store::get_conversation(&pool, conversation_id)
        .await
        .unwrap()
        .expect("conversation should exist");
    assert_eq!(conversation.status, "OPEN");
    assert!(conversation.last_message_at.is_none());
}

#[tokio::test]
#[ignore] // Requires database
async fn test_duplicate_conversation_reports_conflict() {
    let (processor, _broker, pool) = setup().await;
    let conversation_id = Uuid::new_v4();

    apply(
        &processor,
        new_conversation(conversation_id, "2025-01-01T00:00:00"),
    )
    .await
    .unwrap();

    let replay = apply(
        &processor,
        new_conversation(conversation_id, "2025-06-01T00:00:00"),
    )
    .await;
    assert!(matches!(replay, Err(EventError::Conflict(_))));

    // Stored record is unchanged by the rejected replay
    let conversation = store::get_conversation(&pool, conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.created_at.year(), 2025);
    assert_eq!(u8::from(conversation.created_at.month()), 1);
}

#[tokio::test]
#[ignore] // Requires database
async fn test_message_against_unknown_conversation() {
    let (processor, _broker, pool) = setup().await;
    let message_id = Uuid::new_v4();

    let result = apply(
        &processor,
        new_message(message_id, Uuid::new_v4(), "hello?", "2025-01-01T00:00:00"),
    )
    .await;
    assert!(matches!(result, Err(EventError::NotFound(_))));

    // No record was created
    assert!(!store::message_exists(&pool, message_id).await.unwrap());
}

#[tokio::test]
#[ignore] // Requires database
async fn test_message_against_closed_conversation() {
    let (processor, _broker, pool) = setup().await;
    let conversation_id = Uuid::new_v4();
    let message_id = Uuid::new_v4();

    apply(
        &processor,
        new_conversation(conversation_id, "2025-01-01T00:00:00"),
    )
    .await
    .unwrap();
    apply(&processor, close_conversation(conversation_id))
        .await
        .unwrap();

    let result = apply(
        &processor,
        new_message(message_id, conversation_id, "too late", "2025-01-01T01:00:00"),
    )
    .await;
    assert!(matches!(result, Err(EventError::ConversationClosed)));
    assert!(!store::message_exists(&pool, message_id).await.unwrap());
}

#[tokio::test]
#[ignore] // Requires database
async fn test_duplicate_message_reports_conflict() {
    let (processor, _broker, _pool) = setup().await;
    let conversation_id = Uuid::new_v4();
    let message_id = Uuid::new_v4();

    apply(
        &processor,
        new_conversation(conversation_id, "2025-01-01T00:00:00"),
    )
    .await
    .unwrap();
    apply(
        &processor,
        new_message(message_id, conversation_id, "first", "2025-01-01T01:00:00"),
    )
    .await
    .unwrap();

    let replay = apply(
        &processor,
        new_message(message_id, conversation_id, "first", "2025-01-01T01:00:00"),
    )
    .await;
    assert!(matches!(replay, Err(EventError::Conflict(_))));
}

#[tokio::test]
#[ignore] // Requires database
async fn test_close_is_idempotent() {
    let (processor, _broker, pool) = setup().await;
    let conversation_id = Uuid::new_v4();

    apply(
        &processor,
        new_conversation(conversation_id, "2025-01-01T00:00:00"),
    )
    .await
    .unwrap();

    let first = apply(&processor, close_conversation(conversation_id))
        .await
        .unwrap();
    let second = apply(&processor, close_conversation(conversation_id))
        .await
        .unwrap();
    assert_eq!(first, EventOutcome::ConversationClosed);
    assert_eq!(second, EventOutcome::ConversationClosed);

    let conversation = store::get_conversation(&pool, conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.status, "CLOSED");
}

#[tokio::test]
#[ignore] // Requires database
async fn test_close_unknown_conversation() {
    let (processor, _broker, _pool) = setup().await;

    let result = apply(&processor, close_conversation(Uuid::new_v4())).await;
    assert!(matches!(result, Err(EventError::NotFound(_))));
}

#[tokio::test]
#[ignore] // Requires database
async fn test_messages_update_last_message_at_and_order() {
    let (processor, _broker, pool) = setup().await;
    let conversation_id = Uuid::new_v4();

    apply(
        &processor,
        new_conversation(conversation_id, "2025-01-01T00:00:00"),
    )
    .await
    .unwrap();

    let first_id = Uuid::new_v4();
    let second_id = Uuid::new_v4();
    apply(
        &processor,
        new_message(first_id, conversation_id, "hi", "2025-01-01T10:00:00"),
    )
    .await
    .unwrap();
    apply(
        &processor,
        new_message(second_id, conversation_id, "hello again", "2025-01-01T11:00:00"),
    )
    .await
    .unwrap();

    let conversation = store::get_conversation(&pool, conversation_id)
        .await
        .unwrap()
        .unwrap();
    let last_message_at = conversation.last_message_at.expect("set by message path");
    assert_eq!(last_message_at.hour(), 11);

    let messages = store::get_messages(&pool, conversation_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, first_id);
    assert_eq!(messages[1].id, second_id);
}

/// The full lifecycle from the wire: open, push to a live viewer, close,
/// reject further writes.
#[tokio::test]
#[ignore] // Requires database
async fn test_full_conversation_lifecycle_with_live_viewer() {
    let (processor, broker, pool) = setup().await;
    let conversation_id = Uuid::new_v4();
    let message_id = Uuid::new_v4();

    let outcome = apply(
        &processor,
        new_conversation(conversation_id, "2025-01-01T00:00:00"),
    )
    .await
    .unwrap();
    assert_eq!(outcome, EventOutcome::ConversationCreated);

    let mut subscription = broker.subscribe(conversation_id).await;

    let outcome = apply(
        &processor,
        new_message(message_id, conversation_id, "anyone there?", "2025-01-01T00:05:00"),
    )
    .await
    .unwrap();
    assert_eq!(outcome, EventOutcome::MessageCreated);

    // The live viewer received the accepted message
    let push = subscription.receiver.try_recv().expect("push delivered");
    assert_eq!(push.id, message_id);
    assert_eq!(push.content, "anyone there?");

    let conversation = store::get_conversation(&pool, conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert!(conversation.last_message_at.is_some());

    let outcome = apply(&processor, close_conversation(conversation_id))
        .await
        .unwrap();
    assert_eq!(outcome, EventOutcome::ConversationClosed);

    let rejected = apply(
        &processor,
        new_message(Uuid::new_v4(), conversation_id, "one more", "2025-01-01T00:10:00"),
    )
    .await;
    assert!(matches!(rejected, Err(EventError::ConversationClosed)));

    broker.unsubscribe(&conversation_id, &subscription.id).await;
}
