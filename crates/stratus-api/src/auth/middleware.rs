//! Bearer-token authentication for `/api/v2`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use stratus_core::AppError;

use super::models::Subject;
use super::token::TokenIssuer;
use crate::error::HttpAppError;

#[derive(Clone)]
pub struct AuthState {
    pub issuer: Arc<dyn TokenIssuer>,
    pub site_admins: Arc<Vec<String>>,
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            tracing::debug!("Missing authorization header");
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        tracing::debug!("Invalid authorization header format");
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    match auth_state.issuer.authenticate(token.trim()).await {
        Ok(record) => {
            let subject = Subject::for_username(record.username, &auth_state.site_admins);
            tracing::debug!(
                username = %subject.username,
                role = %subject.role,
                token_id = %record.id,
                "Authenticated bearer token"
            );
            request.extensions_mut().insert(subject);
            next.run(request).await
        }
        Err(e) => {
            tracing::info!(error = %e, "Bearer authentication failed");
            HttpAppError(e).into_response()
        }
    }
}
