// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store used by tests and `STORAGE_BACKEND=memory`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::{CredentialStore, LetterStore};
use crate::error::AppError;
use crate::models::{Letter, RenewedTokens, TokenBundle, User};

/// Process-local store backed by concurrent maps.
///
/// Clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    letters: Arc<DashMap<String, Letter>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|entry| entry.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.google_id.clone(), user.clone());
        Ok(())
    }

    async fn update_tokens(&self, user_id: &str, renewed: &RenewedTokens) -> Result<(), AppError> {
        // get_mut holds the shard lock, so concurrent renewals apply one at a time
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
        user.tokens
            .get_or_insert_with(TokenBundle::default)
            .apply_renewal(renewed);
        user.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(())
    }
}

#[async_trait]
impl LetterStore for MemoryDb {
    async fn get_letter(&self, letter_id: &str) -> Result<Option<Letter>, AppError> {
        Ok(self.letters.get(letter_id).map(|entry| entry.clone()))
    }

    async fn put_letter(&self, letter: &Letter) -> Result<(), AppError> {
        self.letters.insert(letter.id.clone(), letter.clone());
        Ok(())
    }

    async fn list_letters_for_user(&self, user_id: &str) -> Result<Vec<Letter>, AppError> {
        Ok(self
            .letters
            .iter()
            .filter(|entry| entry.is_owned_by(user_id))
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LetterInput;

    #[tokio::test]
    async fn test_update_tokens_preserves_refresh_token() {
        let db = MemoryDb::new();
        let user = User::new(
            "g-1",
            "ada@example.com",
            "Ada",
            None,
            Some(TokenBundle {
                access_token: Some("a1".to_string()),
                refresh_token: Some("r1".to_string()),
                expiry_date: Some(1),
            }),
        );
        db.upsert_user(&user).await.unwrap();

        db.update_tokens(
            "g-1",
            &RenewedTokens {
                access_token: "a2".to_string(),
                refresh_token: None,
                expiry_date: 99,
            },
        )
        .await
        .unwrap();

        let tokens = db.get_user("g-1").await.unwrap().unwrap().tokens.unwrap();
        assert_eq!(tokens.access_token.as_deref(), Some("a2"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("r1"));
        assert_eq!(tokens.expiry_date, Some(99));
    }

    #[tokio::test]
    async fn test_update_tokens_unknown_user() {
        let db = MemoryDb::new();
        let result = db
            .update_tokens(
                "missing",
                &RenewedTokens {
                    access_token: "a".to_string(),
                    refresh_token: None,
                    expiry_date: 1,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_letters_filters_by_owner() {
        let db = MemoryDb::new();
        let now = chrono::Utc::now();
        for (owner, title) in [("u1", "a"), ("u2", "b"), ("u1", "c")] {
            let letter = Letter::new(owner, LetterInput::new(title, "body").unwrap(), now);
            db.put_letter(&letter).await.unwrap();
        }

        let mut titles: Vec<String> = db
            .list_letters_for_user("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["a", "c"]);
    }
}
