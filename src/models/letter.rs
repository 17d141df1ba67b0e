// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Letter records and input validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::AppError;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CONTENT_LEN: usize = 5000;

/// A letter owned by one user, optionally linked to a Google Docs document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
pub struct Letter {
    /// Record ID (also used as document ID)
    pub id: String,
    pub title: String,
    pub content: String,
    /// Owning user's Google ID
    pub user_id: String,
    /// Linked Drive document, set by the first successful Drive save
    #[serde(default)]
    pub drive_file_id: Option<String>,
    pub last_saved: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Letter {
    pub fn new(user_id: &str, input: LetterInput, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            content: input.content,
            user_id: user_id.to_string(),
            drive_file_id: None,
            last_saved: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Replace title and content and bump the save timestamps.
    pub fn revise(&mut self, input: LetterInput, now: DateTime<Utc>) {
        self.title = input.title;
        self.content = input.content;
        self.last_saved = now;
        self.updated_at = now;
    }
}

/// Title and content as submitted by a client.
#[derive(Debug, Clone, Validate)]
pub struct LetterInput {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "content must be 1-5000 characters"))]
    pub content: String,
}

impl LetterInput {
    /// Trim both fields and check their lengths.
    pub fn new(title: &str, content: &str) -> Result<Self, AppError> {
        let input = Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        };
        input.validate().map_err(|errors| {
            let mut messages: Vec<String> = errors
                .field_errors()
                .into_iter()
                .flat_map(|(field, errs)| {
                    errs.iter().map(move |e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{field} is invalid"))
                    })
                })
                .collect();
            messages.sort();
            AppError::BadRequest(messages.join("; "))
        })?;
        Ok(input)
    }
}

/// Public link for a Google Docs document.
pub fn drive_document_link(file_id: &str) -> String {
    format!("https://docs.google.com/document/d/{file_id}")
}
