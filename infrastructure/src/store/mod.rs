//! Document store adapters implementing the
//! [`DocumentStore`](panel_application::DocumentStore) port.
//!
//! - [`FsDocumentStore`]: JSON files under a root directory
//! - [`InMemoryDocumentStore`]: process memory, for tests and dry runs

mod fs;
mod memory;
mod query;

pub use fs::FsDocumentStore;
pub use memory::InMemoryDocumentStore;

use crate::config::{FilePersistenceConfig, StoreBackend};
use panel_application::{DocumentStore, StoreError};
use std::sync::Arc;

/// Build the configured store, or `None` when persistence is disabled.
pub async fn build_store(
    config: &FilePersistenceConfig,
) -> Result<Option<Arc<dyn DocumentStore>>, StoreError> {
    if !config.enabled {
        return Ok(None);
    }
    let store: Arc<dyn DocumentStore> = match config.backend {
        StoreBackend::File => Arc::new(FsDocumentStore::open(&config.path).await?),
        StoreBackend::Memory => Arc::new(InMemoryDocumentStore::new()),
    };
    Ok(Some(store))
}
