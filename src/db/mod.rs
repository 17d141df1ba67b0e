//! Database layer (Firestore, or in-memory for tests and local development).

pub mod firestore;
pub mod memory;

use async_trait::async_trait;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Letter, RenewedTokens, TokenBundle, User};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const LETTERS: &str = "letters";
}

/// Persistent user profiles and their Google credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Create or replace a user record.
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    /// Merge renewed credentials into the stored bundle.
    ///
    /// The stored refresh token survives a renewal that carries none.
    async fn update_tokens(&self, user_id: &str, renewed: &RenewedTokens) -> Result<(), AppError> {
        let mut user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
        user.tokens
            .get_or_insert_with(TokenBundle::default)
            .apply_renewal(renewed);
        user.updated_at = chrono::Utc::now().to_rfc3339();
        self.upsert_user(&user).await
    }
}

/// Persistent letter records.
#[async_trait]
pub trait LetterStore: Send + Sync {
    async fn get_letter(&self, letter_id: &str) -> Result<Option<Letter>, AppError>;

    /// Create or replace a letter record.
    async fn put_letter(&self, letter: &Letter) -> Result<(), AppError>;

    /// All letters owned by a user, in no particular order.
    async fn list_letters_for_user(&self, user_id: &str) -> Result<Vec<Letter>, AppError>;
}
