//! API tokens handed out by `terraform login`.
//!
//! Format: `stx_` followed by 40 hex chars. Only an argon2 hash is stored, next
//! to a 16-char prefix used to find candidate rows.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use stratus_core::models::{NewUserToken, UserToken};
use stratus_core::AppError;
use stratus_db::UserTokenStore;

pub const TOKEN_PREFIX: &str = "stx_";
const TOKEN_LOOKUP_PREFIX_LEN: usize = 16;

/// Generate a fresh token
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let random_bytes: [u8; 20] = rng.random();
    format!("{}{}", TOKEN_PREFIX, hex::encode(random_bytes))
}

pub fn hash_token(token: &str) -> Result<String, AppError> {
    use rand_core::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(token.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash token: {}", e)))
}

pub fn verify_token(token: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(token.as_bytes(), &parsed_hash)
        .is_ok())
}

/// First 16 chars, used as the lookup key.
pub fn extract_token_prefix(token: &str) -> String {
    token.chars().take(TOKEN_LOOKUP_PREFIX_LEN).collect()
}

/// Mints API tokens on behalf of a user.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Returns the plaintext token; it is never retrievable again.
    async fn create_token(&self, username: &str, description: &str) -> Result<String, AppError>;

    /// Resolve a presented bearer token to its record.
    async fn authenticate(&self, token: &str) -> Result<UserToken, AppError>;
}

#[derive(Clone)]
pub struct StoreTokenIssuer {
    store: Arc<dyn UserTokenStore>,
}

impl StoreTokenIssuer {
    pub fn new(store: Arc<dyn UserTokenStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TokenIssuer for StoreTokenIssuer {
    async fn create_token(&self, username: &str, description: &str) -> Result<String, AppError> {
        let token = generate_token();
        let record = self
            .store
            .create(NewUserToken {
                username: username.to_string(),
                description: description.to_string(),
                token_prefix: extract_token_prefix(&token),
                token_hash: hash_token(&token)?,
            })
            .await?;

        tracing::info!(token_id = %record.id, username = %username, "Issued user token");
        Ok(token)
    }

    async fn authenticate(&self, token: &str) -> Result<UserToken, AppError> {
        if !token.starts_with(TOKEN_PREFIX) {
            return Err(AppError::Unauthorized("Invalid token".to_string()));
        }

        let candidates = self
            .store
            .get_by_prefix(&extract_token_prefix(token))
            .await?;
        for candidate in candidates {
            if verify_token(token, &candidate.token_hash)? {
                return Ok(candidate);
            }
        }

        Err(AppError::Unauthorized("Invalid token".to_string()))
    }
}
