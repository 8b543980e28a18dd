//! Service discovery document read by `terraform login` and the remote backend.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::json;
use std::sync::LazyLock;

use crate::constants::{
    API_PREFIX, AUTHORIZATION_PATH, LOGIN_PORTS, MODULE_V1_PREFIX, MOTD_PATH, OAUTH_CLIENT_ID,
    TOKEN_PATH,
};

/// Serialized once; every response shares the same bytes.
static DISCOVERY: LazyLock<Bytes> = LazyLock::new(|| {
    let api = format!("{}/", API_PREFIX);
    let document = json!({
        "login.v1": {
            "authz": AUTHORIZATION_PATH,
            "token": TOKEN_PATH,
            "client": OAUTH_CLIENT_ID,
            "ports": LOGIN_PORTS,
        },
        "modules.v1": MODULE_V1_PREFIX,
        "motd.v1": MOTD_PATH,
        "state.v2": api,
        "tfe.v2": api,
        "tfe.v2.1": api,
        "tfe.v2.2": api,
    });
    Bytes::from(document.to_string())
});

pub fn discovery_bytes() -> Bytes {
    DISCOVERY.clone()
}

#[utoipa::path(
    get,
    path = "/.well-known/terraform.json",
    tag = "login",
    responses(
        (status = 200, description = "Terraform service discovery document", content_type = "application/json")
    )
)]
pub async fn discovery() -> Response {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        discovery_bytes(),
    )
        .into_response()
}
