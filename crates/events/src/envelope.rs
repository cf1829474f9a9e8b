//! Webhook envelope parsing and structural validation
//!
//! The validator is a pure function over the untyped envelope: it checks
//! field presence, timestamp shape, and event kind, and hands everything
//! else (per-kind payload fields) to the processor.

use serde_json::Value;
use time::format_description::well_known::Iso8601;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{EventError, EventResult};

/// The event kinds accepted on the webhook endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NewConversation,
    NewMessage,
    CloseConversation,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewConversation => "NEW_CONVERSATION",
            EventKind::NewMessage => "NEW_MESSAGE",
            EventKind::CloseConversation => "CLOSE_CONVERSATION",
        }
    }
}

impl TryFrom<&str> for EventKind {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "NEW_CONVERSATION" => Ok(EventKind::NewConversation),
            "NEW_MESSAGE" => Ok(EventKind::NewMessage),
            "CLOSE_CONVERSATION" => Ok(EventKind::CloseConversation),
            _ => Err(()),
        }
    }
}

/// A structurally valid envelope, ready for the processor
#[derive(Debug, Clone)]
pub struct ValidatedEvent {
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
    pub data: Value,
}

/// Validate the envelope of one webhook event
///
/// No side effects. Per-kind payload checks (ids, direction, content) are
/// the processor's responsibility since they depend on the event kind.
pub fn parse_envelope(envelope: &Value) -> EventResult<ValidatedEvent> {
    let event_type = match envelope.get("type").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s,
        _ => return Err(EventError::MissingField("type")),
    };

    let raw_timestamp = match envelope.get("timestamp").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s,
        _ => return Err(EventError::MissingField("timestamp")),
    };

    let data = match envelope.get("data") {
        Some(d) if !d.is_null() && d.as_object().map_or(true, |o| !o.is_empty()) => d.clone(),
        _ => return Err(EventError::MissingField("data")),
    };

    let timestamp = parse_iso8601(raw_timestamp)
        .ok_or_else(|| EventError::InvalidTimestamp(raw_timestamp.to_string()))?;

    let kind = EventKind::try_from(event_type)
        .map_err(|_| EventError::UnsupportedEventType(event_type.to_string()))?;

    Ok(ValidatedEvent {
        kind,
        timestamp,
        data,
    })
}

/// Parse an ISO-8601 datetime, with or without a UTC offset
///
/// Event sources emit naive timestamps like `2025-02-21T10:20:44.349308`;
/// those are assumed UTC.
fn parse_iso8601(value: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(value, &Iso8601::DEFAULT) {
        return Some(dt);
    }
    PrimitiveDateTime::parse(value, &Iso8601::DEFAULT)
        .map(PrimitiveDateTime::assume_utc)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_envelope_with_naive_timestamp() {
        let envelope = json!({
            "type": "NEW_CONVERSATION",
            "timestamp": "2025-02-21T10:20:44.349308",
            "data": {"id": "6a41b347-8d80-4ce9-84ba-7af66f369f6a"}
        });

        let event = parse_envelope(&envelope).unwrap();
        assert_eq!(event.kind, EventKind::NewConversation);
        assert_eq!(event.timestamp.year(), 2025);
        assert_eq!(event.timestamp.offset(), time::UtcOffset::UTC);
    }

    #[test]
    fn test_valid_envelope_with_offset_timestamp() {
        let envelope = json!({
            "type": "CLOSE_CONVERSATION",
            "timestamp": "2025-01-01T12:00:00Z",
            "data": {"id": "6a41b347-8d80-4ce9-84ba-7af66f369f6a"}
        });

        let event = parse_envelope(&envelope).unwrap();
        assert_eq!(event.kind, EventKind::CloseConversation);
    }

    #[test]
    fn test_missing_fields() {
        let missing_type = json!({"timestamp": "2025-01-01T00:00:00", "data": {}});
        assert!(matches!(
            parse_envelope(&missing_type),
            Err(EventError::MissingField("type"))
        ));

        let missing_timestamp = json!({"type": "NEW_MESSAGE", "data": {}});
        assert!(matches!(
            parse_envelope(&missing_timestamp),
            Err(EventError::MissingField("timestamp"))
        ));

        let missing_data = json!({"type": "NEW_MESSAGE", "timestamp": "2025-01-01T00:00:00"});
        assert!(matches!(
            parse_envelope(&missing_data),
            Err(EventError::MissingField("data"))
        ));
    }

    #[test]
    fn test_empty_type_is_missing() {
        let envelope = json!({"type": "", "timestamp": "2025-01-01T00:00:00", "data": {}});
        assert!(matches!(
            parse_envelope(&envelope),
            Err(EventError::MissingField("type"))
        ));
    }

    #[test]
    fn test_empty_data_is_missing() {
        let envelope = json!({
            "type": "NEW_CONVERSATION",
            "timestamp": "2025-01-01T00:00:00",
            "data": {}
        });
        assert!(matches!(
            parse_envelope(&envelope),
            Err(EventError::MissingField("data"))
        ));
    }

    #[test]
    fn test_invalid_timestamp() {
        let envelope = json!({
            "type": "NEW_CONVERSATION",
            "timestamp": "21/02/2025 10:20",
            "data": {"id": "6a41b347-8d80-4ce9-84ba-7af66f369f6a"}
        });
        assert!(matches!(
            parse_envelope(&envelope),
            Err(EventError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_unsupported_event_type() {
        let envelope = json!({
            "type": "DELETE_CONVERSATION",
            "timestamp": "2025-01-01T00:00:00",
            "data": {"id": "6a41b347-8d80-4ce9-84ba-7af66f369f6a"}
        });
        match parse_envelope(&envelope) {
            Err(EventError::UnsupportedEventType(t)) => assert_eq!(t, "DELETE_CONVERSATION"),
            other => panic!("expected UnsupportedEventType, got {other:?}"),
        }
    }
}
