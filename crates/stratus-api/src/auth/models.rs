use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};
use stratus_core::AppError;
use utoipa::ToSchema;

use crate::error::HttpAppError;

/// User role for authorization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Member,
    Viewer,
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Member => write!(f, "member"),
            UserRole::Viewer => write!(f, "viewer"),
        }
    }
}

/// Authenticated caller, stored in request extensions by the auth middlewares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub username: String,
    pub role: UserRole,
}

impl Subject {
    pub fn new(username: impl Into<String>, role: UserRole) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    /// Site admins get `Admin`; everyone else who can authenticate is a `Member`.
    pub fn for_username(username: impl Into<String>, site_admins: &[String]) -> Self {
        let username = username.into();
        let role = if site_admins.iter().any(|a| a == &username) {
            UserRole::Admin
        } else {
            UserRole::Member
        };
        Self { username, role }
    }
}

impl<S> FromRequestParts<S> for Subject
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Subject>().cloned().ok_or_else(|| {
            HttpAppError(AppError::Unauthorized(
                "Missing authenticated subject".to_string(),
            ))
        })
    }
}

impl<S> OptionalFromRequestParts<S> for Subject
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Subject>().cloned())
    }
}
