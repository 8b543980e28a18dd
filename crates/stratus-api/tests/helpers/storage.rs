use async_trait::async_trait;
use bytes::Bytes;
use stratus_storage::{Storage, StorageBackend, StorageError, StorageResult};

/// Blob cache whose writes always fail
pub struct BrokenStorage;

#[async_trait]
impl Storage for BrokenStorage {
    async fn put(&self, _key: &str, _data: Bytes) -> StorageResult<()> {
        Err(StorageError::UploadFailed(
            "disk full at /var/lib/stratus".to_string(),
        ))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
