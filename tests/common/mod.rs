// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use letters_api::config::{Config, GoogleEndpoints};
use letters_api::db::{CredentialStore, FirestoreDb, MemoryDb};
use letters_api::middleware::auth::create_jwt;
use letters_api::models::{TokenBundle, User};
use letters_api::routes::create_router;
use letters_api::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Address nothing listens on; tests that must not reach Google use it.
#[allow(dead_code)]
pub const UNREACHABLE_GOOGLE: &str = "http://127.0.0.1:9";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Test config with every Google endpoint rooted at `google_base_url`.
#[allow(dead_code)]
pub fn test_config(google_base_url: &str) -> Config {
    let mut config = Config::default();
    config.google.endpoints = GoogleEndpoints::with_base_url(google_base_url);
    config.remote_timeout = Duration::from_secs(5);
    config
}

/// Build an app over in-memory storage.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let db = MemoryDb::new();
    let state = Arc::new(
        AppState::new(config, Arc::new(db.clone()), Arc::new(db))
            .expect("Failed to build app state"),
    );
    (create_router(state.clone()), state)
}

/// Create a test app whose Google calls go nowhere.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(test_config(UNREACHABLE_GOOGLE))
}

/// Create a test app talking to a mock Google server.
#[allow(dead_code)]
pub fn create_test_app_with_google(base_url: &str) -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(test_config(base_url))
}

#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = test_config(UNREACHABLE_GOOGLE);
    config.frontend_url = frontend_url.to_string();
    create_test_app_with_config(config)
}

/// Credentials valid for the next hour.
#[allow(dead_code)]
pub fn fresh_tokens() -> TokenBundle {
    TokenBundle {
        access_token: Some("test-token".to_string()),
        refresh_token: Some("refresh-token".to_string()),
        expiry_date: Some(chrono::Utc::now().timestamp_millis() + 3_600_000),
    }
}

/// Credentials that expired a minute ago.
#[allow(dead_code)]
pub fn expired_tokens() -> TokenBundle {
    TokenBundle {
        access_token: Some("stale-token".to_string()),
        refresh_token: Some("refresh-token".to_string()),
        expiry_date: Some(chrono::Utc::now().timestamp_millis() - 60_000),
    }
}

/// Store a user and return a session token for them.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, google_id: &str, tokens: Option<TokenBundle>) -> String {
    let user = User::new(
        google_id,
        format!("{google_id}@example.com"),
        format!("User {google_id}"),
        None,
        tokens,
    );
    state.users.upsert_user(&user).await.unwrap();
    create_jwt(&user, &state.config.jwt_signing_key, 24).unwrap()
}

/// Request with a Bearer session token and an optional JSON body.
#[allow(dead_code)]
pub fn authed_request(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
