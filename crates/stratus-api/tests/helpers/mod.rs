pub mod login;
pub mod storage;

use axum_test::TestServer;
use std::sync::Arc;
use stratus_api::auth::TokenIssuer;
use stratus_api::constants::API_PREFIX;
use stratus_api::setup::{build_router, build_state, Stores};
use stratus_api::state::AppState;
use stratus_core::{BaseConfig, Config, ServiceConfig, StorageBackend, StoreBackend};
use stratus_storage::{LocalStorage, MemoryStorage, Storage};
use tempfile::TempDir;

pub const TEST_SECRET: &str = "test-secret-at-least-32-characters-long";
pub const SESSION_HEADER: &str = "X-Forwarded-User";
pub const ADMIN_USERNAME: &str = "alice";
pub const MAX_CONFIG_SIZE: u64 = 100;

/// Returns the API path: `api_path("/ping")` -> `/api/v2/ping`.
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

/// Test application state
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub stores: Stores,
    pub _temp_dir: Option<TempDir>,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Mint an API token for `username` the way the token endpoint does.
    pub async fn token_for(&self, username: &str) -> String {
        self.state
            .tokens
            .create_token(username, "test")
            .await
            .expect("Failed to create test token")
    }
}

pub fn test_config() -> Config {
    Config(Box::new(ServiceConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 1,
            environment: "test".to_string(),
        },
        secret: TEST_SECRET.to_string(),
        database_url: None,
        store_backend: StoreBackend::Memory,
        storage_backend: StorageBackend::Memory,
        local_storage_path: String::new(),
        max_config_size: MAX_CONFIG_SIZE,
        site_admins: vec![ADMIN_USERNAME.to_string()],
        session_user_header: SESSION_HEADER.to_string(),
        auth_code_ttl_seconds: 600,
        upload_url_ttl_seconds: 3600,
    }))
}

pub fn setup_test_app_with(config: Config, storage: Arc<dyn Storage>) -> TestApp {
    let stores = Stores::memory();
    let state = build_state(config, stores.clone(), storage);
    let router = build_router(state.clone()).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        stores,
        _temp_dir: None,
    }
}

/// Memory stores and an in-memory blob cache
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config(), Arc::new(MemoryStorage::new()))
}

/// Memory stores and a filesystem blob cache in a temp dir
pub async fn setup_local_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = LocalStorage::new(temp_dir.path())
        .await
        .expect("Failed to create local storage");
    let mut app = setup_test_app_with(test_config(), Arc::new(storage));
    app._temp_dir = Some(temp_dir);
    app
}
