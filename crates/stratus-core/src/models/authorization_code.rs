use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contents of a sealed authorization code.
///
/// This is the whole login session: nothing is stored server-side between the
/// authorization redirect and the token exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodePayload {
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub username: String,
    /// Unix timestamp (seconds) after which the code is rejected
    pub expires_at: i64,
}

impl AuthorizationCodePayload {
    pub fn new(
        code_challenge: impl Into<String>,
        code_challenge_method: impl Into<String>,
        username: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            code_challenge: code_challenge.into(),
            code_challenge_method: code_challenge_method.into(),
            username: username.into(),
            expires_at: expires_at.timestamp(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.expires_at
    }
}
