//! Gate for routes under `/api/v2/signed/`.
//!
//! The signature segment is taken from the request path itself, so the wrapped
//! handler only runs for a path that was actually signed and is not expired.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;
use stratus_core::AppError;

use crate::constants::API_PREFIX;
use crate::error::HttpAppError;
use crate::utils::signed_url::{split_signed_path, SignatureError, UrlSigner};

pub async fn signed_url_middleware(
    State(signer): State<Arc<UrlSigner>>,
    request: Request,
    next: Next,
) -> Response {
    let full_path = request.uri().path().to_string();
    // nested routers see the path without the API prefix
    let result = split_signed_path(full_path.strip_prefix(API_PREFIX).unwrap_or(&full_path))
        .ok_or(SignatureError::Malformed)
        .and_then(|(segment, path)| signer.verify(segment, path, Utc::now().timestamp()));

    match result {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::info!(path = %full_path, reason = %e, "Rejected signed URL");
            HttpAppError(AppError::Forbidden("invalid or expired signature".to_string()))
                .into_response()
        }
    }
}
