//! Stratus API Library
//!
//! `terraform login` and the configuration version upload API: handlers,
//! middleware and application setup.

// Module declarations
mod api_doc;
pub mod constants;
pub mod handlers;
pub mod jsonapi;
mod middleware;
pub mod services;
pub mod setup;
pub mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
