//! Append-only storage for visitor records

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};
use crate::record::VisitorRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Records only ever go on the end; reads return everything, oldest first
#[async_trait]
pub trait VisitorStore: Send + Sync {
    async fn append(&self, record: &VisitorRecord) -> Result<(), StoreError>;

    /// A store that was never written to is empty, not an error.
    /// Entries that fail to decode are skipped.
    async fn read_all(&self) -> Result<Vec<VisitorRecord>, StoreError>;
}

/// Thread-safe store handle
pub type SharedStore = Arc<dyn VisitorStore>;

pub fn from_config(config: &StorageConfig) -> SharedStore {
    match config.backend {
        StorageBackend::File => Arc::new(FileStore::new(&config.path)),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
