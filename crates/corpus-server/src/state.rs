//! Application state.

use corpus_core::Engine;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// The pipeline engine, built once at startup
    pub engine: Arc<Engine>,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, engine: Engine) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            start_time: Instant::now(),
        })
    }
}
