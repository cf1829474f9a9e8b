//! Common types used across Chatline

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle status of a conversation
///
/// Transitions are monotonic: a conversation starts OPEN and can only move
/// to CLOSED. Nothing in the system reopens a closed conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversationStatus {
    Open,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Open => "OPEN",
            ConversationStatus::Closed => "CLOSED",
        }
    }
}

impl TryFrom<&str> for ConversationStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "OPEN" => Ok(ConversationStatus::Open),
            "CLOSED" => Ok(ConversationStatus::Closed),
            other => Err(format!("unknown conversation status: {other}")),
        }
    }
}

/// Direction of a message relative to the support desk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageDirection {
    Sent,
    Received,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Sent => "SENT",
            MessageDirection::Received => "RECEIVED",
        }
    }
}

impl TryFrom<&str> for MessageDirection {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "SENT" => Ok(MessageDirection::Sent),
            "RECEIVED" => Ok(MessageDirection::Received),
            other => Err(format!("unknown message direction: {other}")),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// A conversation as stored in the database
///
/// `status` and `direction` columns are Postgres enums; queries cast them to
/// text and the rows carry the uppercase wire strings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
}

impl Conversation {
    pub fn is_closed(&self) -> bool {
        self.status == ConversationStatus::Closed.as_str()
    }
}

/// A message as stored in the database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub direction: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
