mod helpers;

use helpers::login::{
    authorization_params, authorize, location_query, token_params, REDIRECT_URI, VERIFIER,
};
use helpers::{api_path, setup_test_app, SESSION_HEADER};
use stratus_api::handlers::login::pkce_challenge;
use stratus_core::models::AuthorizationCodePayload;

fn authorize_url(params: &[(&str, String)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish();
    format!("/app/oauth2/auth?{}", query)
}

#[tokio::test]
async fn test_consent_page_renders() {
    let app = setup_test_app();
    let client = app.client();

    let response = client
        .get(&authorize_url(&authorization_params("xyz")))
        .add_header(SESSION_HEADER, "bobby")
        .await;

    assert_eq!(response.status_code(), 200);
    let html = response.text();
    assert!(html.contains("<form"));
    assert!(html.contains("bobby"));
    assert!(html.contains(r#"name="consented""#));
}

#[tokio::test]
async fn test_consent_page_escapes_parameters() {
    let app = setup_test_app();
    let client = app.client();

    let response = client
        .get(&authorize_url(&authorization_params("\"><script>alert(1)</script>")))
        .await;

    assert_eq!(response.status_code(), 200);
    assert!(!response.text().contains("<script>alert(1)</script>"));
}

#[tokio::test]
async fn test_invalid_redirect_uri_is_direct_400() {
    let app = setup_test_app();
    let client = app.client();

    let mut params = authorization_params("xyz");
    params[1].1 = "/relative/callback".to_string();

    let response = client.get(&authorize_url(&params)).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.text(), "invalid redirect_uri");
}

#[tokio::test]
async fn test_unknown_client_is_direct_400() {
    let app = setup_test_app();
    let client = app.client();

    let mut params = authorization_params("xyz");
    params[0].1 = "someone-else".to_string();

    let response = client.get(&authorize_url(&params)).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.text(), "invalid_client");
}

#[tokio::test]
async fn test_undecodable_consent_is_422() {
    let app = setup_test_app();
    let client = app.client();

    let mut params = authorization_params("xyz");
    params.push(("consented", "perhaps".to_string()));

    let response = client
        .post("/app/oauth2/auth")
        .add_header(SESSION_HEADER, "bobby")
        .form(&params)
        .await;
    assert_eq!(response.status_code(), 422);
}

#[tokio::test]
async fn test_unsupported_response_type_preserves_state() {
    let app = setup_test_app();
    let client = app.client();

    let mut params = authorization_params("keep-me");
    params[2].1 = "token".to_string();

    let response = client.get(&authorize_url(&params)).await;
    assert_eq!(response.status_code(), 302);

    let query = location_query(response.header("location").to_str().unwrap());
    assert_eq!(query["error"], "unsupported_response_type");
    assert_eq!(query["state"], "keep-me");
}

#[tokio::test]
async fn test_plain_challenge_method_is_invalid_request() {
    let app = setup_test_app();
    let client = app.client();

    let mut params = authorization_params("xyz");
    params[4].1 = "plain".to_string();

    let response = client.get(&authorize_url(&params)).await;
    assert_eq!(response.status_code(), 302);

    let location = response.header("location");
    let location = location.to_str().unwrap();
    assert!(location.starts_with(REDIRECT_URI));
    let query = location_query(location);
    assert_eq!(query["error"], "invalid_request");
    assert_eq!(query["error_description"], "unsupported code challenge method");
}

#[tokio::test]
async fn test_denied_consent_is_access_denied() {
    let app = setup_test_app();
    let client = app.client();

    let mut params = authorization_params("xyz");
    params.push(("consented", "false".to_string()));

    let response = client
        .post("/app/oauth2/auth")
        .add_header(SESSION_HEADER, "bobby")
        .form(&params)
        .await;
    assert_eq!(response.status_code(), 302);
    let query = location_query(response.header("location").to_str().unwrap());
    assert_eq!(query["error"], "access_denied");
    assert!(!query.contains_key("code"));
}

#[tokio::test]
async fn test_consent_without_session_is_server_error() {
    let app = setup_test_app();
    let client = app.client();

    let mut params = authorization_params("xyz");
    params.push(("consented", "true".to_string()));

    let response = client.post("/app/oauth2/auth").form(&params).await;
    assert_eq!(response.status_code(), 302);
    let query = location_query(response.header("location").to_str().unwrap());
    assert_eq!(query["error"], "server_error");
    assert_eq!(query["state"], "xyz");
}

#[tokio::test]
async fn test_login_flow_issues_usable_token() {
    let app = setup_test_app();
    let client = app.client();

    let code = authorize(client, "bobby").await;

    let response = client
        .post("/oauth2/token")
        .form(&token_params(&code, VERIFIER))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("cache-control"), "no-store");
    assert!(response
        .header("content-type")
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: serde_json::Value = response.json();
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap();
    assert!(token.starts_with("stx_"));

    let response = client
        .post(&api_path("/workspaces/ws-login/configuration-versions"))
        .add_header("Authorization", format!("Bearer {}", token))
        .await;
    assert_eq!(response.status_code(), 201);
}

#[tokio::test]
async fn test_token_params_in_query_string() {
    let app = setup_test_app();
    let client = app.client();

    let code = authorize(client, "bobby").await;
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(token_params(&code, VERIFIER).iter().map(|(k, v)| (*k, v.as_str())))
        .finish();

    let response = client.post(&format!("/oauth2/token?{}", query)).await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_mutated_verifier_is_invalid_grant() {
    let app = setup_test_app();
    let client = app.client();

    let code = authorize(client, "bobby").await;
    let mut verifier = VERIFIER.to_string();
    verifier.replace_range(0..1, "e");

    let response = client
        .post("/oauth2/token")
        .form(&token_params(&code, &verifier))
        .await;
    assert_eq!(response.status_code(), 302);
    let query = location_query(response.header("location").to_str().unwrap());
    assert_eq!(query["error"], "invalid_grant");
}

#[tokio::test]
async fn test_expired_code_is_invalid_grant() {
    let app = setup_test_app();
    let client = app.client();

    let payload = AuthorizationCodePayload::new(
        pkce_challenge(VERIFIER),
        "S256",
        "bobby",
        chrono::Utc::now() - chrono::Duration::seconds(1),
    );
    let code = app.state.codec.seal(&payload).unwrap();

    let response = client
        .post("/oauth2/token")
        .form(&token_params(&code, VERIFIER))
        .await;
    assert_eq!(response.status_code(), 302);
    let query = location_query(response.header("location").to_str().unwrap());
    assert_eq!(query["error"], "invalid_grant");
    assert_eq!(query["error_description"], "authorization code expired");
    assert!(!query.contains_key("access_token"));
}

#[tokio::test]
async fn test_tampered_code_is_invalid_request() {
    let app = setup_test_app();
    let client = app.client();

    let code = authorize(client, "bobby").await;
    let mut tampered = code.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let response = client
        .post("/oauth2/token")
        .form(&token_params(&tampered, VERIFIER))
        .await;
    assert_eq!(response.status_code(), 302);
    let query = location_query(response.header("location").to_str().unwrap());
    assert_eq!(query["error"], "invalid_request");
    assert_eq!(query["error_description"], "invalid authorization code");
}

#[tokio::test]
async fn test_token_request_validation_order() {
    let app = setup_test_app();
    let client = app.client();

    let response = client
        .post("/oauth2/token")
        .form(&token_params("", VERIFIER))
        .await;
    let query = location_query(response.header("location").to_str().unwrap());
    assert_eq!(query["error_description"], "missing code");

    let response = client
        .post("/oauth2/token")
        .form(&token_params("some-code", ""))
        .await;
    let query = location_query(response.header("location").to_str().unwrap());
    assert_eq!(query["error_description"], "missing code verifier");

    let mut params = token_params("some-code", VERIFIER);
    params[3].1 = "client_credentials".to_string();
    let response = client.post("/oauth2/token").form(&params).await;
    let query = location_query(response.header("location").to_str().unwrap());
    assert_eq!(query["error"], "unsupported_grant_type");

    let mut params = token_params("some-code", VERIFIER);
    params[0].1 = "other".to_string();
    let response = client.post("/oauth2/token").form(&params).await;
    assert_eq!(response.status_code(), 400);
}
