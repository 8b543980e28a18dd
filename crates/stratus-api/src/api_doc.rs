//! OpenAPI documentation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::UserRole;
use crate::error::ErrorResponse;
use crate::handlers;
use crate::jsonapi;
use stratus_core::models;

/// Bearer tokens are the ones handed out by `terraform login`.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stratus API",
        version = "0.1.0",
        description = "Terraform login and configuration version upload. Terraform finds the endpoints through /.well-known/terraform.json; the TFE-compatible API lives under /api/v2/."
    ),
    paths(
        // Login
        handlers::discovery::discovery,
        handlers::login::authorize,
        handlers::login::token,
        // Configuration versions
        handlers::configuration_versions::create_configuration_version,
        handlers::configuration_versions::list_configuration_versions,
        handlers::configuration_versions::get_configuration_version,
        handlers::configuration_versions::get_latest_configuration_version,
        handlers::configuration_versions::delete_configuration_version,
        handlers::configuration_versions::download_configuration_version,
        handlers::configuration_versions::upload_configuration_version,
        // Health
        handlers::configuration_versions::ping,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::ConfigurationStatus,
            models::ConfigurationSource,
            models::IngressAttributes,
            models::Pagination,
            jsonapi::ConfigurationVersionDocument,
            jsonapi::ConfigurationVersionListDocument,
            jsonapi::ConfigurationVersionResource,
            jsonapi::ConfigurationVersionAttributes,
            jsonapi::CreateConfigurationVersionDocument,
            handlers::login::TokenResponse,
            handlers::health::HealthCheckResponse,
            UserRole,
            ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "login", description = "Service discovery and the terraform login OAuth flow"),
        (name = "configuration-versions", description = "Configuration version lifecycle and archive upload"),
        (name = "health", description = "Liveness and dependency checks")
    )
)]
pub struct ApiDoc;
