//! Webhook ingestion endpoint
//!
//! Receives raw event envelopes and drives the validate -> apply pipeline.
//! Every malformed or conflicting envelope maps to a structured 4xx
//! response; nothing an external caller sends can surface as an unhandled
//! fault.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

use chatline_events::{parse_envelope, EventOutcome};

use crate::{error::ApiResult, state::AppState};

/// Acknowledgement body for accepted webhook events
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub detail: &'static str,
}

/// Receive one webhook event
pub async fn receive_event(
    State(state): State<AppState>,
    Json(envelope): Json<Value>,
) -> ApiResult<(StatusCode, Json<WebhookAck>)> {
    let event = parse_envelope(&envelope)?;
    let kind = event.kind;

    let outcome = state.processor.apply(event).await?;

    let status = match outcome {
        EventOutcome::ConversationCreated | EventOutcome::MessageCreated => StatusCode::CREATED,
        EventOutcome::ConversationClosed => StatusCode::OK,
    };

    tracing::debug!(
        event_type = kind.as_str(),
        status = %status,
        "Webhook event accepted"
    );

    Ok((
        status,
        Json(WebhookAck {
            detail: outcome.detail(),
        }),
    ))
}
