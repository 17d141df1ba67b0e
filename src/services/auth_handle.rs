// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-request authorization handle for calling Google on a user's behalf.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::{RenewedTokens, TokenBundle};
use crate::services::GoogleOAuthClient;

/// Renew the access token when it expires within this window.
pub const TOKEN_REFRESH_MARGIN_MS: i64 = 60 * 1000;

/// Callback that persists renewed credentials before they are used.
pub type RenewalHook =
    Arc<dyn Fn(RenewedTokens) -> BoxFuture<'static, Result<(), AppError>> + Send + Sync>;

/// A user's credentials plus the means to renew them.
///
/// Renewal happens lazily in [`AuthHandle::access_token`]. The lock is held
/// across the renewal, so concurrent callers sharing a handle renew once.
pub struct AuthHandle {
    user_id: String,
    oauth: GoogleOAuthClient,
    tokens: Mutex<TokenBundle>,
    on_renewed: RenewalHook,
}

impl AuthHandle {
    pub fn new(
        user_id: impl Into<String>,
        oauth: GoogleOAuthClient,
        tokens: TokenBundle,
        on_renewed: RenewalHook,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            oauth,
            tokens: Mutex::new(tokens),
            on_renewed,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Return a usable access token, renewing it first if it is about to expire.
    ///
    /// On renewal the hook runs before the new token is handed out. If Google
    /// rejects the renewal the stored credentials are left untouched.
    pub async fn access_token(&self) -> Result<String, AppError> {
        let mut tokens = self.tokens.lock().await;

        let current = tokens
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(AppError::NoAccessToken)?;

        let now_ms = chrono::Utc::now().timestamp_millis();
        if !tokens.needs_refresh(now_ms, TOKEN_REFRESH_MARGIN_MS) {
            return Ok(current);
        }

        tracing::info!(user_id = %self.user_id, "Access token expiring, refreshing");

        let refresh_token = tokens
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::AuthenticationFailed("access token expired and no refresh token".into())
            })?;

        let renewed = self
            .oauth
            .refresh_token(&refresh_token)
            .await
            .map_err(|e| {
                tracing::warn!(user_id = %self.user_id, error = %e, "Token refresh failed");
                match e {
                    AppError::AuthenticationFailed(_) => e,
                    other => AppError::AuthenticationFailed(other.to_string()),
                }
            })?
            .into_renewal(now_ms);

        (self.on_renewed)(renewed.clone()).await?;
        tokens.apply_renewal(&renewed);

        tracing::info!(user_id = %self.user_id, "Token refreshed");
        Ok(renewed.access_token)
    }
}
