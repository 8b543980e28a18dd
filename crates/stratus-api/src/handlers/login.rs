//! `terraform login`: the OAuth 2.0 authorization code grant with PKCE.
//!
//! The authorization code is the whole session. It is sealed with the
//! [`CodeCodec`](stratus_core::CodeCodec) and carries the PKCE challenge, the
//! username and an expiry, so nothing is persisted between the two endpoints.
//!
//! Until the redirect target has been validated, errors are answered directly.
//! Every later error is a 302 back to the client's redirect URI.

use askama::Template;
use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use stratus_core::models::AuthorizationCodePayload;
use subtle::ConstantTimeEq;
use url::{form_urlencoded, Url};
use utoipa::ToSchema;

use crate::auth::Subject;
use crate::constants::{AUTHORIZATION_PATH, LOGIN_TOKEN_DESCRIPTION, OAUTH_CLIENT_ID};
use crate::state::AppState;

const RESPONSE_TYPE_CODE: &str = "code";
const CHALLENGE_METHOD_S256: &str = "S256";
const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

/// OAuth error identifiers placed in the `error` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthError {
    InvalidRequest,
    InvalidGrant,
    UnsupportedGrantType,
    UnsupportedResponseType,
    AccessDenied,
    ServerError,
}

impl OAuthError {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest => "invalid_request",
            OAuthError::InvalidGrant => "invalid_grant",
            OAuthError::UnsupportedGrantType => "unsupported_grant_type",
            OAuthError::UnsupportedResponseType => "unsupported_response_type",
            OAuthError::AccessDenied => "access_denied",
            OAuthError::ServerError => "server_error",
        }
    }
}

/// Parameters of an authorization request, from the query string or form body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub redirect_uri: String,
    pub response_type: String,
    pub state: String,
    pub consented: bool,
}

impl AuthorizationRequest {
    fn from_params(mut params: HashMap<String, String>) -> Result<Self, String> {
        let consented = match params.remove("consented") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| format!("invalid value for consented: {:?}", value))?,
            None => false,
        };

        Ok(Self {
            client_id: params.remove("client_id").unwrap_or_default(),
            code_challenge: params.remove("code_challenge").unwrap_or_default(),
            code_challenge_method: params.remove("code_challenge_method").unwrap_or_default(),
            redirect_uri: params.remove("redirect_uri").unwrap_or_default(),
            response_type: params.remove("response_type").unwrap_or_default(),
            state: params.remove("state").unwrap_or_default(),
            consented,
        })
    }
}

/// Parameters of a token request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRequest {
    pub client_id: String,
    pub code: String,
    pub code_verifier: String,
    pub grant_type: String,
    pub redirect_uri: String,
}

impl TokenRequest {
    fn from_params(mut params: HashMap<String, String>) -> Self {
        Self {
            client_id: params.remove("client_id").unwrap_or_default(),
            code: params.remove("code").unwrap_or_default(),
            code_verifier: params.remove("code_verifier").unwrap_or_default(),
            grant_type: params.remove("grant_type").unwrap_or_default(),
            redirect_uri: params.remove("redirect_uri").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Template)]
#[template(path = "consent.html")]
struct ConsentTemplate<'a> {
    action: &'a str,
    username: Option<&'a str>,
    request: &'a AuthorizationRequest,
}

/// Where OAuth errors and the final code are delivered.
struct Redirector {
    target: Url,
    state: String,
}

impl Redirector {
    fn error(&self, error: OAuthError, description: Option<&str>) -> Response {
        let mut target = self.target.clone();
        {
            let mut query = target.query_pairs_mut();
            query.append_pair("error", error.as_str());
            if let Some(description) = description {
                query.append_pair("error_description", description);
            }
            if !self.state.is_empty() {
                query.append_pair("state", &self.state);
            }
        }
        found(&target)
    }

    fn code(&self, code: &str) -> Response {
        let mut target = self.target.clone();
        {
            let mut query = target.query_pairs_mut();
            if !self.state.is_empty() {
                query.append_pair("state", &self.state);
            }
            query.append_pair("code", code);
        }
        found(&target)
    }
}

fn found(target: &Url) -> Response {
    match HeaderValue::from_str(target.as_str()) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Plain-text answer for errors that cannot be redirected
fn direct(status: StatusCode, message: &str) -> Response {
    (status, message.to_string()).into_response()
}

/// Accepts `1`, `t`, `true`, `on` and friends, as HTML forms and most OAuth
/// clients send them.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Merge query-string and url-encoded body parameters. Body values win, and
/// within one source the first occurrence of a key wins.
fn collect_params(query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> HashMap<String, String> {
    let mut params = HashMap::new();

    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if is_form {
        for (key, value) in form_urlencoded::parse(body) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }

    if let Some(query) = query {
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }

    params
}

/// Validate the parts of a request that decide where errors can be sent.
fn redirector(client_id: &str, redirect_uri: &str, state: &str) -> Result<Redirector, Response> {
    let target = Url::parse(redirect_uri)
        .map_err(|_| direct(StatusCode::BAD_REQUEST, "invalid redirect_uri"))?;
    if client_id != OAUTH_CLIENT_ID {
        return Err(direct(StatusCode::BAD_REQUEST, "invalid_client"));
    }
    Ok(Redirector {
        target,
        state: state.to_string(),
    })
}

/// `base64url(sha256(verifier))`
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn challenge_matches(verifier: &str, challenge: &str) -> bool {
    // slices of different lengths compare unequal without leaking where
    pkce_challenge(verifier)
        .as_bytes()
        .ct_eq(challenge.as_bytes())
        .into()
}

#[utoipa::path(
    get,
    path = "/app/oauth2/auth",
    tag = "login",
    params(
        ("client_id" = String, Query, description = "Must be `terraform`"),
        ("redirect_uri" = String, Query, description = "Client callback URL"),
        ("response_type" = String, Query, description = "Must be `code`"),
        ("code_challenge" = String, Query, description = "PKCE challenge"),
        ("code_challenge_method" = String, Query, description = "Must be `S256`"),
        ("state" = Option<String>, Query, description = "Opaque client state")
    ),
    request_body(
        content_type = "application/x-www-form-urlencoded",
        description = "On POST, the query parameters plus consented"
    ),
    responses(
        (status = 200, description = "Consent page", content_type = "text/html"),
        (status = 302, description = "OAuth error redirect"),
        (status = 400, description = "Invalid redirect_uri or client"),
        (status = 422, description = "Undecodable parameters")
    )
)]
#[tracing::instrument(skip_all, fields(method = %method, operation = "authorize"))]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    method: Method,
    subject: Option<Subject>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = collect_params(query.as_deref(), &headers, &body);
    let request = match AuthorizationRequest::from_params(params) {
        Ok(request) => request,
        Err(e) => return direct(StatusCode::UNPROCESSABLE_ENTITY, &e),
    };

    let redirect = match redirector(&request.client_id, &request.redirect_uri, &request.state) {
        Ok(redirect) => redirect,
        Err(response) => return response,
    };

    if request.response_type != RESPONSE_TYPE_CODE {
        return redirect.error(
            OAuthError::UnsupportedResponseType,
            Some("unsupported response type"),
        );
    }
    if request.code_challenge_method != CHALLENGE_METHOD_S256 {
        return redirect.error(
            OAuthError::InvalidRequest,
            Some("unsupported code challenge method"),
        );
    }

    if method == Method::GET {
        let page = ConsentTemplate {
            action: AUTHORIZATION_PATH,
            username: subject.as_ref().map(|s| s.username.as_str()),
            request: &request,
        };
        return match page.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render consent page");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    if !request.consented {
        return redirect.error(OAuthError::AccessDenied, Some("user denied consent"));
    }

    let Some(subject) = subject else {
        tracing::error!("Authorization request without an authenticated subject");
        return redirect.error(OAuthError::ServerError, None);
    };

    let Some(expires_at) = Duration::try_seconds(state.config.auth_code_ttl_seconds())
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
    else {
        tracing::error!("Authorization code lifetime out of range");
        return redirect.error(OAuthError::ServerError, None);
    };
    let payload = AuthorizationCodePayload::new(
        request.code_challenge.as_str(),
        request.code_challenge_method.as_str(),
        subject.username.as_str(),
        expires_at,
    );
    let code = match state.codec.seal(&payload) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Failed to seal authorization code");
            return redirect.error(OAuthError::ServerError, None);
        }
    };

    tracing::info!(username = %subject.username, "Issued authorization code");
    redirect.code(&code)
}

#[utoipa::path(
    post,
    path = "/oauth2/token",
    tag = "login",
    request_body(
        content_type = "application/x-www-form-urlencoded",
        description = "client_id, code, code_verifier, grant_type, redirect_uri"
    ),
    responses(
        (status = 200, description = "API token", body = TokenResponse),
        (status = 302, description = "OAuth error redirect"),
        (status = 400, description = "Invalid redirect_uri or client")
    )
)]
#[tracing::instrument(skip_all, fields(operation = "token"))]
pub async fn token(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = TokenRequest::from_params(collect_params(query.as_deref(), &headers, &body));

    let redirect = match redirector(&request.client_id, &request.redirect_uri, "") {
        Ok(redirect) => redirect,
        Err(response) => return response,
    };

    if request.code.is_empty() {
        return redirect.error(OAuthError::InvalidRequest, Some("missing code"));
    }
    if request.code_verifier.is_empty() {
        return redirect.error(OAuthError::InvalidRequest, Some("missing code verifier"));
    }
    if request.grant_type != GRANT_TYPE_AUTHORIZATION_CODE {
        return redirect.error(OAuthError::UnsupportedGrantType, None);
    }

    let payload: AuthorizationCodePayload = match state.codec.open(&request.code) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::info!(error = %e, "Rejected authorization code");
            return redirect.error(
                OAuthError::InvalidRequest,
                Some("invalid authorization code"),
            );
        }
    };

    if payload.is_expired(Utc::now()) {
        return redirect.error(
            OAuthError::InvalidGrant,
            Some("authorization code expired"),
        );
    }

    if !challenge_matches(&request.code_verifier, &payload.code_challenge) {
        tracing::info!(username = %payload.username, "PKCE verification failed");
        return redirect.error(OAuthError::InvalidGrant, Some("invalid code verifier"));
    }

    let access_token = match state
        .tokens
        .create_token(&payload.username, LOGIN_TOKEN_DESCRIPTION)
        .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, username = %payload.username, "Failed to create API token");
            return redirect.error(OAuthError::ServerError, None);
        }
    };

    tracing::info!(username = %payload.username, "Exchanged authorization code for API token");
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        }),
    )
        .into_response()
}
