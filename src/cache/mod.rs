// Cache storage module
// Author: storecache contributors

pub mod disk;
pub mod memory;
pub mod models;
pub mod storage;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;
pub use models::CacheNames;
pub use storage::CacheStorage;

use crate::config::{CacheConfig, StorageBackend};
use crate::error::Result;
use std::sync::Arc;

/// Build the storage backend selected by configuration.
pub async fn open_storage(config: &CacheConfig) -> Result<Arc<dyn CacheStorage>> {
    Ok(match config.backend {
        StorageBackend::Memory => Arc::new(MemoryCacheStorage::new()),
        StorageBackend::Disk => Arc::new(DiskCacheStorage::new(&config.directory).await?),
    })
}
