//! Chatline API Library
//!
//! This crate contains the HTTP server components for Chatline: the webhook
//! ingestion endpoint, the REST read surface, and the live-view WebSocket.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
