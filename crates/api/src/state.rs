//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use chatline_events::{EventProcessor, FanoutBroker};

use crate::config::Config;

/// State shared across all request handlers
///
/// The fanout broker is the single process-wide instance: the webhook
/// processor publishes into it and the live-view sessions subscribe on it.
/// It is constructed here at startup and reaches everything by reference,
/// never as ambient global state.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub broker: Arc<FanoutBroker>,
    pub processor: Arc<EventProcessor>,
}

impl AppState {
    /// Build the application state for a started process
    pub fn new(pool: PgPool, config: Config) -> Self {
        let broker = Arc::new(FanoutBroker::new());
        let processor = Arc::new(EventProcessor::new(pool.clone(), Arc::clone(&broker)));

        Self {
            pool,
            config: Arc::new(config),
            broker,
            processor,
        }
    }
}
