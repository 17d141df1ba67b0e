// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth_handle;
pub mod drive;
pub mod google_oauth;
pub mod letters;
pub mod token_manager;

pub use auth_handle::{AuthHandle, RenewalHook};
pub use drive::{DriveDocument, DriveDocumentSummary, DriveGateway};
pub use google_oauth::{GoogleOAuthClient, GoogleUserInfo, TokenResponse};
pub use letters::{LetterLookup, LetterService, SavedLetter};
pub use token_manager::TokenManager;
