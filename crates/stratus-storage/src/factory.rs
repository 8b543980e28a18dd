use crate::{LocalStorage, MemoryStorage, Storage, StorageBackend, StorageResult};
use stratus_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        StorageBackend::Local => {
            let storage = LocalStorage::new(config.local_storage_path()).await?;
            Ok(Arc::new(storage))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory blob cache; archives are lost on restart");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}
