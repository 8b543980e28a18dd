//! Database repositories for data access layer
//!
//! Each repository is responsible for a specific domain entity. The traits are
//! what the API crate depends on; `memory` holds the in-process implementations.
//
// Configuration versions and their status timestamps
pub mod configuration_version;
//
// In-memory stores
pub mod memory;
//
// Transaction utilities
pub mod transaction;
//
// API tokens minted by `terraform login`
pub mod user_token;
//
pub use configuration_version::{
    ConfigurationVersionStore, PostgresConfigurationVersionRepository,
};
pub use memory::{MemoryConfigurationVersionStore, MemoryUserTokenStore};
pub use transaction::TransactionGuard;
pub use user_token::{PostgresUserTokenRepository, UserTokenStore};
