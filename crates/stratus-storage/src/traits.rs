//! Storage abstraction trait
//!
//! This module defines the Storage trait that all blob cache backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Blob cache for configuration archives.
///
/// `put` must be all-or-nothing: once it returns `Ok` the bytes are durable and
/// readable under `key`; if it fails or its future is dropped, `key` holds
/// whatever it held before.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `key`, replacing any previous value
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Read the bytes stored under `key`
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Remove `key`; removing a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
