//! Message endpoints
//!
//! REST creation is the thin sibling of the webhook NEW_MESSAGE path: it
//! shares the store and the same closed-conversation guard, but stamps the
//! server clock instead of a caller-supplied event time.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use chatline_events::store;
use chatline_shared::{Message, MessageDirection};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    /// Client-supplied id; generated when omitted
    pub id: Option<Uuid>,
    pub conversation_id: Uuid,
    pub direction: MessageDirection,
    pub content: String,
}

/// List all messages
pub async fn list_messages(State(state): State<AppState>) -> ApiResult<Json<Vec<Message>>> {
    let messages = store::list_messages(&state.pool).await?;
    Ok(Json(messages))
}

/// Get a message by id
pub async fn get_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    let message = store::get_message(&state.pool, message_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(message))
}

/// Create a message on an open conversation
pub async fn create_message(
    State(state): State<AppState>,
    Json(req): Json<CreateMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Message content cannot be empty".into(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    let conversation = store::lock_conversation(&mut *tx, req.conversation_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if conversation.is_closed() {
        return Err(ApiError::BadRequest("This conversation is closed".into()));
    }

    let message_id = req.id.unwrap_or_else(Uuid::new_v4);
    if store::message_exists(&mut *tx, message_id).await? {
        return Err(ApiError::Conflict("Message already exists".into()));
    }

    let now = OffsetDateTime::now_utc();
    let message = store::insert_message(
        &mut *tx,
        message_id,
        req.conversation_id,
        req.direction.as_str(),
        &req.content,
        now,
    )
    .await?;
    store::touch_last_message(&mut *tx, req.conversation_id, now).await?;

    tx.commit().await?;

    tracing::info!(
        message_id = %message.id,
        conversation_id = %req.conversation_id,
        "Message created via REST"
    );

    Ok((StatusCode::CREATED, Json(message)))
}
