//! Server types and shared state.
//!
//! This module defines the application state shared by every tool handler.

use std::sync::Arc;

use crate::config::Config;
use crate::detectors::DetectorSet;
use crate::engine::FixEngine;

/// Shared application state for all tool handlers.
///
/// Everything here is immutable after startup, so handlers borrow it
/// concurrently without locking.
#[derive(Clone)]
pub struct AppState {
    /// Fix matching, scoring and aggregation.
    pub engine: Arc<FixEngine>,
    /// Per-story factor detectors.
    pub detectors: Arc<DetectorSet>,
    /// Server configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates a new application state.
    ///
    /// # Arguments
    ///
    /// * `engine` - The recommendation engine
    /// * `detectors` - The detector set
    /// * `config` - Server configuration
    #[must_use]
    pub fn new(engine: FixEngine, detectors: DetectorSet, config: Config) -> Self {
        Self {
            engine: Arc::new(engine),
            detectors: Arc::new(detectors),
            config: Arc::new(config),
        }
    }

    /// State over the built-in catalog, detectors and the given config.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self::new(FixEngine::with_defaults(), DetectorSet::default(), config)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("templates", &self.engine.repository().len())
            .finish_non_exhaustive()
    }
}
