// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in flow tests against a mock Google server.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use letters_api::db::CredentialStore;
use letters_api::middleware::auth::verify_jwt;
use letters_api::models::TokenBundle;
use letters_api::routes::auth::sign_state;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

async fn mock_token_exchange(server: &MockServer, code: &str, body: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json"))
        .mount(server)
        .await;
}

async fn mock_userinfo(server: &MockServer, access_token: &str) {
    Mock::given(method("GET"))
        .and(path("/oauth2/v2/userinfo"))
        .and(header_eq("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"id":"g-100","email":"ada@example.com","name":"Ada Lovelace","picture":"https://example.com/ada.png"}"#,
            "application/json",
        ))
        .mount(server)
        .await;
}

fn exchange_request(code: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/google/callback")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "code": code }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_auth_url_requests_offline_access() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/google/url")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::json_body(response).await;
    let url = body["url"].as_str().unwrap();
    assert!(url.contains("client_id=test_client_id"));
    assert!(url.contains("access_type=offline"));
    assert!(url.contains("prompt=consent"));
    assert!(url.contains("state="));
}

#[tokio::test]
async fn test_code_exchange_creates_user_and_session() {
    let server = MockServer::start().await;
    mock_token_exchange(
        &server,
        "code-1",
        r#"{"access_token":"at-1","refresh_token":"rt-1","expires_in":3600}"#,
    )
    .await;
    mock_userinfo(&server, "at-1").await;

    let (app, state) = common::create_test_app_with_google(&server.uri());
    let response = app.oneshot(exchange_request("code-1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let body = common::json_body(response).await;
    assert_eq!(body["user"]["id"], "g-100");
    assert_eq!(body["user"]["name"], "Ada Lovelace");

    let claims = verify_jwt(body["token"].as_str().unwrap(), &state.config.jwt_signing_key).unwrap();
    assert_eq!(claims.sub, "g-100");
    assert_eq!(claims.email, "ada@example.com");

    let stored = state.users.get_user("g-100").await.unwrap().unwrap();
    let tokens = stored.tokens.unwrap();
    assert_eq!(tokens.access_token.as_deref(), Some("at-1"));
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
    assert!(tokens.expiry_date.unwrap() > chrono::Utc::now().timestamp_millis());
}

#[tokio::test]
async fn test_repeat_login_keeps_refresh_token() {
    let server = MockServer::start().await;
    // Google omits refresh_token when consent was already granted
    mock_token_exchange(&server, "code-2", r#"{"access_token":"at-2","expires_in":3600}"#).await;
    mock_userinfo(&server, "at-2").await;

    let (app, state) = common::create_test_app_with_google(&server.uri());
    let existing = letters_api::models::User::new(
        "g-100",
        "old@example.com",
        "Old Name",
        None,
        Some(TokenBundle {
            access_token: Some("at-old".to_string()),
            refresh_token: Some("rt-original".to_string()),
            expiry_date: Some(1),
        }),
    );
    state.users.upsert_user(&existing).await.unwrap();

    let response = app.oneshot(exchange_request("code-2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = state.users.get_user("g-100").await.unwrap().unwrap();
    assert_eq!(stored.email, "ada@example.com");
    assert_eq!(stored.created_at, existing.created_at);
    let tokens = stored.tokens.unwrap();
    assert_eq!(tokens.access_token.as_deref(), Some("at-2"));
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-original"));
}

#[tokio::test]
async fn test_rejected_code_is_authentication_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_raw(
            r#"{"error":"invalid_grant","error_description":"Bad Request"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let (app, _) = common::create_test_app_with_google(&server.uri());
    let response = app.oneshot(exchange_request("bad-code")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::json_body(response).await;
    assert_eq!(body["error"], "authentication_failed");
}

#[tokio::test]
async fn test_missing_code_is_bad_request() {
    let (app, _) = common::create_test_app();
    let response = app.oneshot(exchange_request("  ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_redirect_callback_sets_cookie_and_redirects() {
    let server = MockServer::start().await;
    mock_token_exchange(
        &server,
        "code-3",
        r#"{"access_token":"at-3","refresh_token":"rt-3","expires_in":3600}"#,
    )
    .await;
    mock_userinfo(&server, "at-3").await;

    let (app, state) = common::create_test_app_with_google(&server.uri());
    let oauth_state = sign_state("http://localhost:5173", &state.config.oauth_state_key).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/auth/google/callback?code=code-3&state={oauth_state}"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("http://localhost:5173/auth-redirect?token="));
    assert!(response.headers().contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn test_redirect_callback_failure_goes_to_error_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_raw(
            r#"{"error":"invalid_grant"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let (app, _) = common::create_test_app_with_google(&server.uri());

    // A tampered state falls back to the configured frontend
    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/google/callback?code=nope&state=tampered")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("http://localhost:5173/auth/error?message="));
    assert!(!response.headers().contains_key(header::SET_COOKIE));
}

fn state_from_auth_url(url: &str) -> String {
    url.split('&')
        .find_map(|pair| pair.strip_prefix("state="))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_requested_frontend_round_trips_through_state() {
    let server = MockServer::start().await;
    mock_token_exchange(
        &server,
        "code-4",
        r#"{"access_token":"at-4","refresh_token":"rt-4","expires_in":3600}"#,
    )
    .await;
    mock_userinfo(&server, "at-4").await;

    let mut config = common::test_config(&server.uri());
    config.frontend_url = "https://letters.example.com".to_string();
    let (app, _) = common::create_test_app_with_config(config);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/google/url?redirect_uri=http%3A%2F%2Flocalhost%3A4000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::json_body(response).await;
    let oauth_state = state_from_auth_url(body["url"].as_str().unwrap());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/auth/google/callback?code=code-4&state={oauth_state}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert!(
        location.starts_with("http://localhost:4000/auth-redirect?token="),
        "unexpected redirect: {location}"
    );
}

#[tokio::test]
async fn test_unknown_frontend_rejected() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/google/url?redirect_uri=https%3A%2F%2Fevil.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::json_body(response).await["error"], "bad_request");
}
