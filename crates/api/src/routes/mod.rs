//! API routes

pub mod conversations;
pub mod health;
pub mod messages;
pub mod webhook;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::{state::AppState, websocket::ws_handler};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Webhook ingestion (no auth by design; callers are trusted upstream)
    let webhook_routes = Router::new().route("/webhook/", post(webhook::receive_event));

    // REST resources
    let api_routes = Router::new()
        .route("/conversations/", get(conversations::list_conversations))
        .route(
            "/conversations/:conversation_id",
            get(conversations::get_conversation),
        )
        .route(
            "/messages/",
            get(messages::list_messages).post(messages::create_message),
        )
        .route("/messages/:message_id", get(messages::get_message));

    // WebSocket live-view routes
    let websocket_routes = Router::new().route("/ws/conversations/:conversation_id", get(ws_handler));

    // Combine all routes
    Router::new()
        .merge(health_routes)
        .merge(webhook_routes)
        .merge(api_routes)
        .merge(websocket_routes)
        // Request body size limit to prevent DoS via large payloads
        .layer(DefaultBodyLimit::max(state.config.max_request_body_bytes))
        .with_state(state)
}
