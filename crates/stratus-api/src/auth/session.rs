//! Session authentication for the browser side of `terraform login`.
//!
//! The server sits behind an SSO proxy which sets a trusted header carrying the
//! username. When present it becomes the request's [`Subject`]; when absent the
//! request continues without one and the handler decides.

use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::models::Subject;

#[derive(Clone)]
pub struct SessionState {
    pub header: HeaderName,
    pub site_admins: Arc<Vec<String>>,
}

pub async fn session_middleware(
    State(session): State<Arc<SessionState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let username = request
        .headers()
        .get(&session.header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    if let Some(username) = username {
        let subject = Subject::for_username(username, &session.site_admins);
        tracing::debug!(username = %subject.username, "Session subject attached");
        request.extensions_mut().insert(subject);
    }

    next.run(request).await
}
