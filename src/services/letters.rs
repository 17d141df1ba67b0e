// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Letter saving: Drive-backed saves and local drafts.
//!
//! A Drive save writes the document first and only then touches the local
//! record, so a failed Drive call never leaves a record pointing at content
//! that was not written.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::LetterStore;
use crate::error::AppError;
use crate::models::{drive_document_link, Letter, LetterInput};
use crate::services::{AuthHandle, DriveGateway, TokenManager};

/// Result of a Drive-backed save.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
pub struct SavedLetter {
    pub letter: Letter,
    pub drive_link: String,
}

/// Outcome of resolving a client-supplied letter ID.
#[derive(Debug)]
pub enum LetterLookup {
    /// The caller's own letter
    Found(Letter),
    /// No ID given, or no record under it
    NotFound,
}

/// Coordinates letter records with their Drive documents.
#[derive(Clone)]
pub struct LetterService {
    letters: Arc<dyn LetterStore>,
    tokens: TokenManager,
    drive: DriveGateway,
}

impl LetterService {
    pub fn new(letters: Arc<dyn LetterStore>, tokens: TokenManager, drive: DriveGateway) -> Self {
        Self {
            letters,
            tokens,
            drive,
        }
    }

    /// Resolve an optional letter ID for `user_id`.
    ///
    /// A record owned by someone else is reported as `Unauthorized`, the same
    /// way for drafts and Drive saves.
    pub async fn lookup(
        &self,
        user_id: &str,
        letter_id: Option<&str>,
    ) -> Result<LetterLookup, AppError> {
        let Some(letter_id) = letter_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(LetterLookup::NotFound);
        };

        match self.letters.get_letter(letter_id).await? {
            Some(letter) if !letter.is_owned_by(user_id) => {
                tracing::warn!(user_id, letter_id, "Rejected access to another user's letter");
                Err(AppError::Unauthorized)
            }
            Some(letter) => Ok(LetterLookup::Found(letter)),
            None => {
                tracing::debug!(user_id, letter_id, "Unknown letter ID, creating a new letter");
                Ok(LetterLookup::NotFound)
            }
        }
    }

    /// Save a letter to Drive and record it locally.
    ///
    /// The first save creates a Google Doc and links it to the record; later
    /// saves replace that document's content.
    pub async fn save(
        &self,
        user_id: &str,
        input: LetterInput,
        letter_id: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<SavedLetter, AppError> {
        let existing = self.lookup(user_id, letter_id).await?;
        let auth = self.tokens.authorize(user_id).await?;
        let folder_id = folder_id.map(str::trim).filter(|id| !id.is_empty());

        let letter = match existing {
            LetterLookup::Found(letter) => match letter.drive_file_id.clone() {
                Some(file_id) => self.update_linked(&auth, letter, &file_id, input).await?,
                None => self.create_linked(&auth, user_id, Some(letter), input, folder_id).await?,
            },
            LetterLookup::NotFound => {
                self.create_linked(&auth, user_id, None, input, folder_id)
                    .await?
            }
        };

        let drive_link = letter
            .drive_file_id
            .as_deref()
            .map(drive_document_link)
            .ok_or_else(|| anyhow::anyhow!("saved letter {} has no Drive document", letter.id))?;

        Ok(SavedLetter { letter, drive_link })
    }

    async fn update_linked(
        &self,
        auth: &AuthHandle,
        mut letter: Letter,
        file_id: &str,
        input: LetterInput,
    ) -> Result<Letter, AppError> {
        self.drive.update_document(auth, file_id, &input.content).await?;

        letter.revise(input, Utc::now());
        self.letters.put_letter(&letter).await?;

        tracing::info!(letter_id = %letter.id, drive_file_id = %file_id, "Letter saved to Drive");
        Ok(letter)
    }

    async fn create_linked(
        &self,
        auth: &AuthHandle,
        user_id: &str,
        existing: Option<Letter>,
        input: LetterInput,
        folder_id: Option<&str>,
    ) -> Result<Letter, AppError> {
        let document = self
            .drive
            .create_document(auth, &input.title, &input.content, folder_id)
            .await?;

        let now = Utc::now();
        let mut letter = match existing {
            Some(mut letter) => {
                letter.revise(input, now);
                letter
            }
            None => Letter::new(user_id, input, now),
        };
        letter.drive_file_id = Some(document.id);
        self.letters.put_letter(&letter).await?;

        tracing::info!(
            letter_id = %letter.id,
            drive_file_id = ?letter.drive_file_id,
            "Letter linked to new Drive document"
        );
        Ok(letter)
    }

    /// Save a letter locally without touching Drive.
    pub async fn save_draft(
        &self,
        user_id: &str,
        input: LetterInput,
        letter_id: Option<&str>,
    ) -> Result<Letter, AppError> {
        let now = Utc::now();
        let letter = match self.lookup(user_id, letter_id).await? {
            LetterLookup::Found(mut letter) => {
                letter.revise(input, now);
                letter
            }
            LetterLookup::NotFound => Letter::new(user_id, input, now),
        };
        self.letters.put_letter(&letter).await?;

        tracing::debug!(user_id, letter_id = %letter.id, "Draft saved");
        Ok(letter)
    }

    /// All of a user's letters, most recently saved first.
    pub async fn list_drafts(&self, user_id: &str) -> Result<Vec<Letter>, AppError> {
        let mut letters = self.letters.list_letters_for_user(user_id).await?;
        letters.sort_by(|a, b| b.last_saved.cmp(&a.last_saved));
        Ok(letters)
    }
}
