//! Paths and protocol constants shared by routes, discovery and tests.

/// Prefix of the TFE-compatible API
pub const API_PREFIX: &str = "/api/v2";

/// Version advertised in the `TFP-API-Version` header
pub const TFP_API_VERSION: &str = "2.5";
pub const TFP_API_VERSION_HEADER: &str = "TFP-API-Version";

/// Segment under `API_PREFIX` that carries signed routes
pub const SIGNED_PREFIX: &str = "/signed";

pub const DISCOVERY_PATH: &str = "/.well-known/terraform.json";
pub const AUTHORIZATION_PATH: &str = "/app/oauth2/auth";
pub const TOKEN_PATH: &str = "/oauth2/token";
pub const MODULE_V1_PREFIX: &str = "/v1/modules/";
pub const MOTD_PATH: &str = "/api/terraform/motd";

/// The only OAuth client this server accepts
pub const OAUTH_CLIENT_ID: &str = "terraform";

/// Loopback ports terraform may listen on for the OAuth redirect
pub const LOGIN_PORTS: [u16; 2] = [10000, 10010];

/// Set by terraform when it talks to a cloud backend
pub const TERRAFORM_INTEGRATION_HEADER: &str = "X-Terraform-Integration";

pub const LOGIN_TOKEN_DESCRIPTION: &str = "terraform login";

/// Request bodies outside the signed upload route are small JSON or form documents
pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;
