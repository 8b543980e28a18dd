//! Configuration module
//!
//! This module provides configuration structures for the API server, including
//! database, blob storage, login and upload settings.

use std::env;

use crate::storage_types::{StorageBackend, StoreBackend};

// Common constants
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SERVER_PORT: u16 = 8080;
const MAX_CONFIG_SIZE: u64 = 104_857_600;
const AUTH_CODE_TTL_SECS: i64 = 600;
const UPLOAD_URL_TTL_SECS: u64 = 3600;
const MAX_AUTH_CODE_TTL_SECS: i64 = 86_400;
const MAX_UPLOAD_URL_TTL_SECS: u64 = 7 * 86_400;
const SESSION_USER_HEADER: &str = "X-Forwarded-User";
const LOCAL_STORAGE_PATH: &str = "./data/configs";

/// Minimum length of the process secret
pub const MIN_SECRET_LEN: usize = 32;

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base: BaseConfig,
    /// Secret used to seal authorization codes and sign upload URLs
    pub secret: String,
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    /// Maximum configuration archive size in bytes
    pub max_config_size: u64,
    /// Usernames granted the admin role
    pub site_admins: Vec<String>,
    /// Header carrying the username established by the fronting session proxy
    pub session_user_header: String,
    pub auth_code_ttl_seconds: i64,
    pub upload_url_ttl_seconds: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    fn as_service(&self) -> &ServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_service().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_service().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_service().base.server_port
    }
    pub fn cors_origins(&self) -> &[String] {
        &self.as_service().base.cors_origins
    }
    pub fn db_max_connections(&self) -> u32 {
        self.as_service().base.db_max_connections
    }
    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_service().base.db_timeout_seconds
    }
    pub fn environment(&self) -> &str {
        &self.as_service().base.environment
    }
    pub fn secret(&self) -> &[u8] {
        self.as_service().secret.as_bytes()
    }
    pub fn database_url(&self) -> Option<&str> {
        self.as_service().database_url.as_deref()
    }
    pub fn store_backend(&self) -> StoreBackend {
        self.as_service().store_backend
    }
    pub fn storage_backend(&self) -> StorageBackend {
        self.as_service().storage_backend
    }
    pub fn local_storage_path(&self) -> &str {
        &self.as_service().local_storage_path
    }
    pub fn max_config_size(&self) -> u64 {
        self.as_service().max_config_size
    }
    pub fn site_admins(&self) -> &[String] {
        &self.as_service().site_admins
    }
    pub fn session_user_header(&self) -> &str {
        &self.as_service().session_user_header
    }
    pub fn auth_code_ttl_seconds(&self) -> i64 {
        self.as_service().auth_code_ttl_seconds
    }
    pub fn upload_url_ttl_seconds(&self) -> u64 {
        self.as_service().upload_url_ttl_seconds
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| StoreBackend::Postgres.to_string())
            .parse()?;
        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| StorageBackend::Local.to_string())
            .parse()?;

        let site_admins = env::var("SITE_ADMINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(ServiceConfig {
            base,
            secret: env::var("SECRET")
                .map_err(|_| anyhow::anyhow!("SECRET must be set to seal login codes"))?,
            database_url: env::var("DATABASE_URL").ok(),
            store_backend,
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| LOCAL_STORAGE_PATH.to_string()),
            max_config_size: env::var("MAX_CONFIG_SIZE")
                .unwrap_or_else(|_| MAX_CONFIG_SIZE.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_CONFIG_SIZE must be a number of bytes"))?,
            site_admins,
            session_user_header: env::var("SESSION_USER_HEADER")
                .unwrap_or_else(|_| SESSION_USER_HEADER.to_string()),
            auth_code_ttl_seconds: env::var("AUTH_CODE_TTL_SECONDS")
                .unwrap_or_else(|_| AUTH_CODE_TTL_SECS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("AUTH_CODE_TTL_SECONDS must be a number of seconds"))?,
            upload_url_ttl_seconds: env::var("UPLOAD_URL_TTL_SECONDS")
                .unwrap_or_else(|_| UPLOAD_URL_TTL_SECS.to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("UPLOAD_URL_TTL_SECONDS must be a number of seconds")
                })?,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "SECRET must be at least {} characters long",
                MIN_SECRET_LEN
            ));
        }

        if self.max_config_size == 0 {
            return Err(anyhow::anyhow!("MAX_CONFIG_SIZE must be greater than zero"));
        }

        if self.auth_code_ttl_seconds <= 0 || self.auth_code_ttl_seconds > MAX_AUTH_CODE_TTL_SECS {
            return Err(anyhow::anyhow!(
                "AUTH_CODE_TTL_SECONDS must be between 1 and {}",
                MAX_AUTH_CODE_TTL_SECS
            ));
        }

        if self.upload_url_ttl_seconds == 0 || self.upload_url_ttl_seconds > MAX_UPLOAD_URL_TTL_SECS
        {
            return Err(anyhow::anyhow!(
                "UPLOAD_URL_TTL_SECONDS must be between 1 and {}",
                MAX_UPLOAD_URL_TTL_SECS
            ));
        }

        if self.store_backend == StoreBackend::Postgres {
            match self.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {}
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when using the postgres store backend"
                    ))
                }
            }
        }

        let environment = self.base.environment.to_lowercase();
        let is_production = environment == "production" || environment == "prod";
        if is_production && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        Ok(())
    }
}
