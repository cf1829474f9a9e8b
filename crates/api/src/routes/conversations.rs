//! Conversation read endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use chatline_events::store;
use chatline_shared::{Conversation, Message};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// A conversation together with its messages, ordered by timestamp
#[derive(Debug, Serialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// List all conversations, most recently active first
pub async fn list_conversations(State(state): State<AppState>) -> ApiResult<Json<Vec<Conversation>>> {
    let conversations = store::list_conversations(&state.pool).await?;
    Ok(Json(conversations))
}

/// Get a conversation with its messages
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<Json<ConversationWithMessages>> {
    let conversation = store::get_conversation(&state.pool, conversation_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let messages = store::get_messages(&state.pool, conversation_id).await?;

    Ok(Json(ConversationWithMessages {
        conversation,
        messages,
    }))
}
