//! WebSocket live view
//!
//! Live viewers open a WebSocket per conversation and receive each accepted
//! message as a JSON text frame. Subscriptions live only in the process-wide
//! fanout broker; a dropped connection just re-fetches history over REST and
//! reconnects.

mod handler;

pub use handler::ws_handler;
