//! Route configuration and setup.
//!
//! - public: discovery, token exchange, health and docs
//! - oauth: the browser-facing authorization endpoint, behind session auth
//! - api: `/api/v2`, behind bearer-token auth
//! - signed: `/api/v2/signed/...`, authorized by the URL signature alone and
//!   without a body limit layer, since the upload handler enforces its own

use anyhow::{Context, Result};
use axum::{
    http::{HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use stratus_core::Config;
use stratus_infra::{request_id_middleware, security_headers_middleware, SecurityHeaders};
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

use crate::api_doc::get_openapi_spec;
use crate::auth::middleware::{auth_middleware, AuthState};
use crate::auth::session::{session_middleware, SessionState};
use crate::constants::{
    API_PREFIX, AUTHORIZATION_PATH, DISCOVERY_PATH, MAX_REQUEST_BODY_BYTES, TOKEN_PATH,
};
use crate::handlers::{configuration_versions as cv, discovery, health, login};
use crate::middleware::{api_version_middleware, signed_url_middleware};
use crate::state::AppState;

/// Build the complete application router.
///
/// Trailing slashes are trimmed before routing, so `/api/v2/ping/` and
/// `/api/v2/ping` reach the same handler.
pub fn build_router(state: Arc<AppState>) -> Result<Router> {
    let config = &state.config;
    let cors = setup_cors(config);
    let site_admins = Arc::new(config.site_admins().to_vec());

    let session_state = Arc::new(SessionState {
        header: HeaderName::from_bytes(config.session_user_header().as_bytes())
            .context("SESSION_USER_HEADER is not a valid header name")?,
        site_admins: site_admins.clone(),
    });
    let auth_state = Arc::new(AuthState {
        issuer: state.tokens.clone(),
        site_admins,
    });

    let public_routes = Router::new()
        .route(DISCOVERY_PATH, get(discovery::discovery))
        .route(TOKEN_PATH, post(login::token))
        .route("/health", get(health::health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(get_openapi_spec()) }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"));

    let oauth_routes = Router::new()
        .route(
            AUTHORIZATION_PATH,
            get(login::authorize).post(login::authorize),
        )
        .layer(from_fn_with_state(session_state, session_middleware));

    let api_routes = Router::new()
        .route(
            "/workspaces/{workspace_id}/configuration-versions",
            get(cv::list_configuration_versions).post(cv::create_configuration_version),
        )
        .route(
            "/workspaces/{workspace_id}/configuration-versions/latest",
            get(cv::get_latest_configuration_version),
        )
        .route(
            "/configuration-versions/{id}",
            get(cv::get_configuration_version).delete(cv::delete_configuration_version),
        )
        .route(
            "/configuration-versions/{id}/download",
            get(cv::download_configuration_version),
        )
        .layer(from_fn_with_state(auth_state, auth_middleware))
        .route("/ping", get(cv::ping))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES));

    let signed_routes = Router::new()
        .route(
            "/signed/{signature}/configuration-versions/{id}/upload",
            put(cv::upload_configuration_version),
        )
        .layer(from_fn_with_state(
            state.signer.clone(),
            signed_url_middleware,
        ));

    let v2_routes = api_routes
        .merge(signed_routes)
        .layer(from_fn(api_version_middleware));

    let app = public_routes
        .merge(oauth_routes)
        .nest(API_PREFIX, v2_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .layer(from_fn_with_state(
            SecurityHeaders {
                hsts: config.is_production(),
            },
            security_headers_middleware,
        ))
        .with_state(state.clone());

    // the layer has to wrap the router for the rewrite to happen before routing
    Ok(Router::new().fallback_service(NormalizePathLayer::trim_trailing_slash().layer(app)))
}

fn setup_cors(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins()
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}
