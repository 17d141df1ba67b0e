// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth 2.0 client.
//!
//! Handles:
//! - Consent URL construction (offline access, forced consent)
//! - Authorization code exchange
//! - Access token renewal from a refresh token
//! - Profile lookup for the signed-in account

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::config::GoogleOAuthConfig;
use crate::error::AppError;
use crate::models::RenewedTokens;

/// Scopes requested at login: profile, email, and app-created Drive files.
pub const SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/drive.appdata",
];

/// Lifetime assumed when Google omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    config: Arc<GoogleOAuthConfig>,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleOAuthConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building Google OAuth HTTP client")?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Build the consent URL the browser is sent to.
    pub fn authorization_url(&self, state: &str) -> String {
        let scope = SCOPES.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.config.endpoints.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(state),
        )
    }

    /// Exchange a one-time authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.config.endpoints.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::AuthenticationFailed(format!(
                    "Token exchange request failed: {}",
                    e.without_url()
                ))
            })?;

        check_response_json(response).await
    }

    /// Obtain a new access token from a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.config.endpoints.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::AuthenticationFailed(format!(
                    "Token refresh request failed: {}",
                    e.without_url()
                ))
            })?;

        check_response_json(response).await
    }

    /// Fetch the profile of the account an access token belongs to.
    pub async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AppError> {
        let response = self
            .http
            .get(&self.config.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                AppError::AuthenticationFailed(format!(
                    "Profile request failed: {}",
                    e.without_url()
                ))
            })?;

        check_response_json(response).await
    }
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<OAuthErrorBody>(&body)
            .map(|e| match e.error_description {
                Some(desc) => format!("{}: {}", e.error, desc),
                None => e.error,
            })
            .unwrap_or(body);
        return Err(AppError::AuthenticationFailed(format!(
            "HTTP {}: {}",
            status, reason
        )));
    }

    response
        .json()
        .await
        .map_err(|e| {
            AppError::AuthenticationFailed(format!("JSON parse error: {}", e.without_url()))
        })
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    error_description: Option<String>,
}

/// Token endpoint response from Google.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Only sent on consent and occasionally on renewal
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert to credentials with an absolute expiry.
    pub fn into_renewal(self, now_ms: i64) -> RenewedTokens {
        let lifetime = self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        RenewedTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expiry_date: now_ms + lifetime * 1000,
        }
    }
}

/// Profile returned by the userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}
