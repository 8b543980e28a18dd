use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API token owned by a user. Only the argon2 hash of the secret is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserToken {
    pub id: Uuid,
    pub username: String,
    pub description: String,
    pub token_prefix: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUserToken {
    pub username: String,
    pub description: String,
    pub token_prefix: String,
    pub token_hash: String,
}
