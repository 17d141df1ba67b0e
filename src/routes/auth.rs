// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth authentication routes.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, removal_cookie, session_cookie, AuthUser};
use crate::models::User;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed OAuth state stays valid.
pub const OAUTH_STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

/// Tolerated clock skew for state timestamps.
const OAUTH_STATE_SKEW_MS: u128 = 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google/url", get(auth_url))
        .route(
            "/auth/google/callback",
            get(auth_callback).post(exchange_code),
        )
        .route("/auth/logout", post(logout))
}

/// Routes that require a session.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/profile", get(profile))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
pub struct AuthUrlResponse {
    pub url: String,
}

/// Public profile of the signed-in user.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.google_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            picture: user.picture.clone(),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
pub struct LoginResponse {
    pub token: String,
    pub user: ProfileResponse,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Query parameters for starting the OAuth flow.
#[derive(Deserialize)]
pub struct AuthUrlParams {
    /// Frontend to return to after sign-in. Defaults to CLIENT_URL.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Build the Google consent URL.
async fn auth_url(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthUrlParams>,
) -> Result<Json<AuthUrlResponse>> {
    let frontend_url = match params.redirect_uri {
        Some(uri) if state.config.is_allowed_frontend(&uri) => {
            uri.trim_end_matches('/').to_string()
        }
        Some(uri) => {
            tracing::warn!(redirect_uri = %uri, "Rejected sign-in redirect to unknown origin");
            return Err(AppError::BadRequest(
                "redirect_uri is not an allowed frontend".to_string(),
            ));
        }
        None => state.config.frontend_url.clone(),
    };

    let oauth_state = sign_state(&frontend_url, &state.config.oauth_state_key)?;
    let url = state.token_manager.oauth().authorization_url(&oauth_state);

    tracing::info!(
        client_id = %state.config.google.client_id,
        frontend_url = %frontend_url,
        "Starting Google OAuth flow"
    );

    Ok(Json(AuthUrlResponse { url }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth redirect target - exchange code, set session, bounce to the frontend.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    // Decode and verify frontend URL from state parameter
    let frontend_url = params
        .state
        .as_deref()
        .and_then(|s| verify_and_decode_state(s, &state.config.oauth_state_key))
        .filter(|url| state.config.is_allowed_frontend(url))
        .unwrap_or_else(|| {
            tracing::warn!(
                "Invalid or tampered state parameter, falling back to default frontend URL"
            );
            state.config.frontend_url.clone()
        });

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return Ok((jar, Redirect::temporary(&error_redirect(&frontend_url, &error))));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let user = match state.token_manager.complete_login(&code).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Google sign-in failed");
            return Ok((
                jar,
                Redirect::temporary(&error_redirect(&frontend_url, &e.to_string())),
            ));
        }
    };

    let jwt = issue_session(&state, &user)?;
    let jar = jar.add(session_cookie(
        jwt.clone(),
        !state.config.is_local_frontend(),
        state.config.session_ttl_hours,
    ));

    let redirect_url = format!(
        "{}/auth-redirect?token={}",
        frontend_url,
        urlencoding::encode(&jwt)
    );
    Ok((jar, Redirect::temporary(&redirect_url)))
}

#[derive(Deserialize)]
pub struct CodeExchangeRequest {
    #[serde(default)]
    code: String,
}

/// Code exchange for frontends that receive the redirect themselves.
async fn exchange_code(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: std::result::Result<Json<CodeExchangeRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let Json(body) = body?;
    if body.code.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Missing authorization code".to_string(),
        ));
    }

    let user = state.token_manager.complete_login(body.code.trim()).await?;
    let jwt = issue_session(&state, &user)?;
    let jar = jar.add(session_cookie(
        jwt.clone(),
        !state.config.is_local_frontend(),
        state.config.session_ttl_hours,
    ));

    Ok((
        jar,
        Json(LoginResponse {
            token: jwt,
            user: ProfileResponse::from(&user),
        }),
    ))
}

fn issue_session(state: &AppState, user: &User) -> Result<String> {
    create_jwt(
        user,
        &state.config.jwt_signing_key,
        state.config.session_ttl_hours,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
}

fn error_redirect(frontend_url: &str, message: &str) -> String {
    format!(
        "{}/auth/error?message={}",
        frontend_url,
        urlencoding::encode(message)
    )
}

/// Profile of the signed-in user.
async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let user = state
        .users
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse::from(&user)))
}

/// Logout - clear the session cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.add(removal_cookie(!state.config.is_local_frontend()));
    (
        jar,
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

/// Sign the frontend URL into an OAuth `state` value.
///
/// Format is `base64url(frontend_url|timestamp_hex|signature_hex)`.
pub fn sign_state(frontend_url: &str, secret: &[u8]) -> Result<String> {
    let timestamp = now_millis()?;
    sign_state_at(frontend_url, timestamp, secret)
}

fn sign_state_at(frontend_url: &str, timestamp: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", frontend_url, timestamp);
    let signature = state_signature(&payload, secret)?;

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature).as_bytes()))
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

fn state_signature(payload: &str, secret: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify HMAC signature and decode the frontend URL from the OAuth state parameter.
///
/// States older than [`OAUTH_STATE_MAX_AGE_MS`] are rejected.
pub fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Split from the right so a '|' inside the URL stays part of it
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let frontend_url = parts.next()?;

    let payload = format!("{}|{}", frontend_url, timestamp_hex);
    let expected = state_signature(&payload, secret).ok()?;

    if !bool::from(signature_hex.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = u128::from_str_radix(timestamp_hex, 16).ok()?;
    let now = now_millis().ok()?;
    if issued_at > now + OAUTH_STATE_SKEW_MS || now - issued_at > OAUTH_STATE_MAX_AGE_MS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(frontend_url.to_string())
}
