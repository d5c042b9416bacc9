//! Server state management
//!
//! Shared state handed to every route: the configuration and the registry
//! of running games.

use crate::config::ServerConfig;
use crate::manager::GameManager;
use crate::store::{GameStore, MemoryStore};
use std::sync::Arc;

/// Server-wide shared state
pub struct ServerState {
    pub config: ServerConfig,
    pub manager: GameManager,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
        Self::with_store(config, store)
    }

    pub fn with_store(config: ServerConfig, store: Arc<dyn GameStore>) -> Self {
        let manager = GameManager::new(store, config.disconnect_grace());
        Self { config, manager }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
