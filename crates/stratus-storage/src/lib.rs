//! Stratus Storage Library
//!
//! Blob cache abstraction for configuration archives, with a local filesystem
//! backend and an in-memory backend.
//!
//! # Storage key format
//!
//! Archives are keyed by configuration version id: `configs/{cv_id}.tar.gz`.
//! Keys must not contain `..` or a leading `/`. Key generation lives in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::configuration_version_key;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use stratus_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};
