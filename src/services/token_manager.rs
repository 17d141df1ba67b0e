// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google credential lifecycle: login, storage, and renewal hand-off.

use std::sync::Arc;

use futures_util::FutureExt;

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::{RenewedTokens, TokenBundle, User};
use crate::services::{AuthHandle, GoogleOAuthClient, RenewalHook};

/// Issues authorization handles backed by stored credentials.
#[derive(Clone)]
pub struct TokenManager {
    oauth: GoogleOAuthClient,
    users: Arc<dyn CredentialStore>,
}

impl TokenManager {
    pub fn new(oauth: GoogleOAuthClient, users: Arc<dyn CredentialStore>) -> Self {
        Self { oauth, users }
    }

    pub fn oauth(&self) -> &GoogleOAuthClient {
        &self.oauth
    }

    /// Build an authorization handle for a user from their stored credentials.
    ///
    /// Renewals performed through the handle are written back to the store.
    pub async fn authorize(&self, user_id: &str) -> Result<AuthHandle, AppError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        let tokens = user.tokens.ok_or(AppError::MissingCredentials)?;
        if !tokens.has_access_token() {
            return Err(AppError::NoAccessToken);
        }

        let users = self.users.clone();
        let owner = user_id.to_string();
        let on_renewed: RenewalHook = Arc::new(move |renewed: RenewedTokens| {
            let users = users.clone();
            let owner = owner.clone();
            async move { users.update_tokens(&owner, &renewed).await }.boxed()
        });

        Ok(AuthHandle::new(user_id, self.oauth.clone(), tokens, on_renewed))
    }

    /// Complete a Google sign-in: exchange the code, fetch the profile, and
    /// upsert the user with the new credentials.
    ///
    /// An existing refresh token is kept when Google does not issue a new one.
    pub async fn complete_login(&self, code: &str) -> Result<User, AppError> {
        let token_response = self.oauth.exchange_code(code).await?;
        let profile = self.oauth.user_info(&token_response.access_token).await?;

        let now = chrono::Utc::now();
        let renewed = token_response.into_renewal(now.timestamp_millis());
        let name = profile.name.unwrap_or_else(|| profile.email.clone());

        let user = match self.users.get_user(&profile.id).await? {
            Some(mut existing) => {
                existing.email = profile.email;
                existing.name = name;
                existing.picture = profile.picture;
                existing
                    .tokens
                    .get_or_insert_with(TokenBundle::default)
                    .apply_renewal(&renewed);
                existing.updated_at = now.to_rfc3339();
                existing
            }
            None => User::new(
                profile.id,
                profile.email,
                name,
                profile.picture,
                Some(TokenBundle::from(renewed)),
            ),
        };

        self.users.upsert_user(&user).await?;

        tracing::info!(user_id = %user.google_id, "Google sign-in complete");
        Ok(user)
    }
}
