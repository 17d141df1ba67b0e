//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile and Google credentials stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Google account ID (also used as document ID)
    pub google_id: String,
    pub email: String,
    /// Display name
    pub name: String,
    /// Profile picture URL
    pub picture: Option<String>,
    /// Google OAuth credentials, absent until the first successful login
    #[serde(default)]
    pub tokens: Option<TokenBundle>,
    /// When the user first connected (RFC 3339)
    pub created_at: String,
    /// Last profile or credential update (RFC 3339)
    pub updated_at: String,
}

impl User {
    pub fn new(
        google_id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        picture: Option<String>,
        tokens: Option<TokenBundle>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            google_id: google_id.into(),
            email: email.into(),
            name: name.into(),
            picture,
            tokens,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A user's Google OAuth credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenBundle {
    pub access_token: Option<String>,
    /// Long-lived token used to obtain new access tokens
    pub refresh_token: Option<String>,
    /// Access token expiry, milliseconds since the Unix epoch
    pub expiry_date: Option<i64>,
}

/// New credentials issued by Google on login or renewal.
#[derive(Debug, Clone, PartialEq)]
pub struct RenewedTokens {
    pub access_token: String,
    /// Google omits this on most renewals
    pub refresh_token: Option<String>,
    pub expiry_date: i64,
}

impl TokenBundle {
    /// Whether the access token expires within `margin_ms` of `now_ms`.
    ///
    /// A bundle with no recorded expiry is treated as still valid.
    pub fn needs_refresh(&self, now_ms: i64, margin_ms: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => now_ms + margin_ms >= expiry,
            None => false,
        }
    }

    /// Merge renewed credentials, keeping the stored refresh token when the
    /// provider does not send a new one.
    pub fn apply_renewal(&mut self, renewed: &RenewedTokens) {
        self.access_token = Some(renewed.access_token.clone());
        if let Some(refresh) = renewed.refresh_token.as_ref().filter(|t| !t.is_empty()) {
            self.refresh_token = Some(refresh.clone());
        }
        self.expiry_date = Some(renewed.expiry_date);
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl From<RenewedTokens> for TokenBundle {
    fn from(renewed: RenewedTokens) -> Self {
        let mut bundle = TokenBundle::default();
        bundle.apply_renewal(&renewed);
        bundle
    }
}
