use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use stratus_core::models::{NewUserToken, UserToken};
use stratus_core::AppError;
use uuid::Uuid;

/// Persistence for API tokens. Lookup is by the non-secret prefix; the caller
/// verifies the full token against each candidate hash.
#[async_trait]
pub trait UserTokenStore: Send + Sync {
    async fn create(&self, token: NewUserToken) -> Result<UserToken, AppError>;

    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<UserToken>, AppError>;
}

#[derive(Clone)]
pub struct PostgresUserTokenRepository {
    pool: PgPool,
}

impl PostgresUserTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserTokenStore for PostgresUserTokenRepository {
    async fn create(&self, token: NewUserToken) -> Result<UserToken, AppError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO user_tokens (id, username, description, token_prefix, token_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&token.username)
        .bind(&token.description)
        .bind(&token.token_prefix)
        .bind(&token.token_hash)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(token_id = %id, username = %token.username, "User token created");

        Ok(UserToken {
            id,
            username: token.username,
            description: token.description,
            token_prefix: token.token_prefix,
            token_hash: token.token_hash,
            created_at,
        })
    }

    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<UserToken>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, description, token_prefix, token_hash, created_at
            FROM user_tokens
            WHERE token_prefix = $1
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(UserToken {
                    id: row.try_get("id")?,
                    username: row.try_get("username")?,
                    description: row.try_get("description")?,
                    token_prefix: row.try_get("token_prefix")?,
                    token_hash: row.try_get("token_hash")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(AppError::from)
    }
}
