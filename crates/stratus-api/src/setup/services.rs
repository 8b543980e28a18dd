//! Store, blob cache and service wiring.

use anyhow::{Context, Result};
use std::sync::Arc;
use stratus_core::{CodeCodec, Config, StoreBackend};
use stratus_db::{
    ConfigurationVersionStore, MemoryConfigurationVersionStore, MemoryUserTokenStore,
    PostgresConfigurationVersionRepository, PostgresUserTokenRepository, UserTokenStore,
};
use stratus_storage::{create_storage, Storage};

use super::database::setup_database;
use crate::auth::{RoleAuthorizer, StoreTokenIssuer};
use crate::services::ConfigurationVersionService;
use crate::state::AppState;
use crate::utils::UrlSigner;

/// Record stores backing the API
#[derive(Clone)]
pub struct Stores {
    pub configuration_versions: Arc<dyn ConfigurationVersionStore>,
    pub user_tokens: Arc<dyn UserTokenStore>,
}

impl Stores {
    pub fn memory() -> Self {
        Self {
            configuration_versions: Arc::new(MemoryConfigurationVersionStore::new()),
            user_tokens: Arc::new(MemoryUserTokenStore::new()),
        }
    }
}

pub async fn setup_stores(config: &Config) -> Result<Stores> {
    match config.store_backend() {
        StoreBackend::Postgres => {
            let pool = setup_database(config).await?;
            Ok(Stores {
                configuration_versions: Arc::new(PostgresConfigurationVersionRepository::new(
                    pool.clone(),
                )),
                user_tokens: Arc::new(PostgresUserTokenRepository::new(pool)),
            })
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory record store; data is lost on restart");
            Ok(Stores::memory())
        }
    }
}

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize blob cache")?;
    tracing::info!(backend = %storage.backend_type(), "Blob cache initialized");
    Ok(storage)
}

/// Assemble the shared state. The secret-derived keys are computed once here.
pub fn build_state(config: Config, stores: Stores, storage: Arc<dyn Storage>) -> Arc<AppState> {
    let configuration_versions = ConfigurationVersionService::new(
        stores.configuration_versions,
        storage,
        Arc::new(RoleAuthorizer),
        config.max_config_size(),
    );

    Arc::new(AppState {
        codec: CodeCodec::from_secret(config.secret()),
        signer: Arc::new(UrlSigner::from_secret(config.secret())),
        tokens: Arc::new(StoreTokenIssuer::new(stores.user_tokens)),
        configuration_versions,
        config,
    })
}
