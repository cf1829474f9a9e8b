//! Event-processing error types

use thiserror::Error;

/// Errors arising from validating or applying one webhook event
///
/// Everything a malformed or conflicting event can produce is represented
/// here; the HTTP layer maps each variant to a response status. Only
/// `Database` can surface as a server-side failure.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Missing required field: '{0}'")]
    MissingField(&'static str),

    #[error("Invalid timestamp format, expected ISO-8601: {0}")]
    InvalidTimestamp(String),

    #[error("Unsupported event type: '{0}'")]
    UnsupportedEventType(String),

    #[error("Invalid identifier in field '{0}', expected a UUID")]
    InvalidIdentifier(&'static str),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("Conversation is closed")]
    ConversationClosed,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for EventError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique violation: a concurrent duplicate insert
                // lost the race, which is the same duplicate-delivery case
                // as a pre-checked conflict.
                if db_err.code().as_deref() == Some("23505") {
                    return EventError::Conflict("record");
                }
                EventError::Database(db_err.to_string())
            }
            _ => EventError::Database(err.to_string()),
        }
    }
}

/// Result type alias for event processing
pub type EventResult<T> = Result<T, EventError>;
