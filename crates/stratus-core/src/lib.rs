//! Stratus Core Library
//!
//! This crate provides core domain models, error types, configuration and the
//! cryptographic primitives that are shared across all Stratus components.

pub mod code_codec;
pub mod config;
pub mod error;
pub mod models;
pub mod secret;
pub mod storage_types;

// Re-export commonly used types
pub use code_codec::{CodeCodec, CodecError};
pub use config::{BaseConfig, Config, ServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::{StorageBackend, StoreBackend};
