//! Store implementations for AgroMind.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use agromind_core::error::StoreError;
use agromind_core::store::FarmStore;
use std::sync::Arc;

/// Open the store selected by `[store]`.
pub async fn open_from_config(
    config: &agromind_config::StoreConfig,
) -> Result<Arc<dyn FarmStore>, StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(SqliteStore::new(&config.url).await?)),
        other => Err(StoreError::Storage(format!(
            "store backend '{other}' is not available in this build"
        ))),
    }
}
