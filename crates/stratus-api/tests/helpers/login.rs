use axum_test::TestServer;
use std::collections::HashMap;
use stratus_api::handlers::login::pkce_challenge;
use url::Url;

use super::SESSION_HEADER;

pub const REDIRECT_URI: &str = "http://localhost:10000/login";
pub const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

/// Authorization request parameters as terraform sends them.
pub fn authorization_params(state: &str) -> Vec<(&'static str, String)> {
    vec![
        ("client_id", "terraform".to_string()),
        ("redirect_uri", REDIRECT_URI.to_string()),
        ("response_type", "code".to_string()),
        ("code_challenge", pkce_challenge(VERIFIER)),
        ("code_challenge_method", "S256".to_string()),
        ("state", state.to_string()),
    ]
}

/// Query pairs of a redirect `Location`.
pub fn location_query(location: &str) -> HashMap<String, String> {
    Url::parse(location)
        .expect("Location should be absolute")
        .query_pairs()
        .into_owned()
        .collect()
}

/// Approve the consent page as `username` and return the authorization code.
pub async fn authorize(client: &TestServer, username: &str) -> String {
    let mut params = authorization_params("xyz");
    params.push(("consented", "true".to_string()));

    let response = client
        .post("/app/oauth2/auth")
        .add_header(SESSION_HEADER, username)
        .form(&params)
        .await;
    assert_eq!(response.status_code(), 302);

    let location = response.header("location");
    let query = location_query(location.to_str().unwrap());
    assert_eq!(query.get("state").map(String::as_str), Some("xyz"));
    query.get("code").cloned().expect("redirect should carry a code")
}

pub fn token_params(code: &str, verifier: &str) -> Vec<(&'static str, String)> {
    vec![
        ("client_id", "terraform".to_string()),
        ("code", code.to_string()),
        ("code_verifier", verifier.to_string()),
        ("grant_type", "authorization_code".to_string()),
        ("redirect_uri", REDIRECT_URI.to_string()),
    ]
}
