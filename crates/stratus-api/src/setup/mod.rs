//! Application setup and initialization
//!
//! Everything between a loaded [`Config`] and a router ready to serve.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use stratus_core::Config;

pub use routes::build_router;
pub use services::{build_state, Stores};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;
    tracing::info!("Configuration loaded and validated successfully");

    let stores = services::setup_stores(&config).await?;
    let storage = services::setup_storage(&config).await?;

    let state = services::build_state(config, stores, storage);
    let router = routes::build_router(state.clone())?;

    Ok((state, router))
}
