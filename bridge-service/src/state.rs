//! Application state for the bridge service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::registry::ConnectionRegistry;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<ConnectionRegistry>,
}

impl AppState {
    /// Creates the state and its (still empty) connection registry.
    pub fn new(config: AppConfig) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new(&config)),
            config,
        }
    }
}
