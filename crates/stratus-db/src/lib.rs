//! Stratus Database Library
//!
//! Record stores for configuration versions and user tokens, each behind a
//! trait with a PostgreSQL and an in-memory implementation.

pub mod db;

pub use db::*;
