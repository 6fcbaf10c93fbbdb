pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod services;
pub mod store;

use log::info;
use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};
use crate::password::PasswordHasher;
use crate::services::AppState;
use crate::store::{MemoryStore, ScyllaStore, StoreResult};

/// Build the shared application state for the configured backend.
pub async fn build_state(config: &AppConfig) -> StoreResult<AppState> {
    let hasher = PasswordHasher::new(config.bcrypt_cost);
    let state = match config.backend {
        StoreBackend::Scylla => {
            let store = Arc::new(ScyllaStore::connect(config).await?);
            info!("Connected to ScyllaDB at {:?}", config.scylla_nodes);
            AppState::with_store(store, hasher)
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data will not survive a restart");
            AppState::with_store(Arc::new(MemoryStore::new()), hasher)
        }
    };
    Ok(state)
}
