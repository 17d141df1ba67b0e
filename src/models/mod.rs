// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod letter;
pub mod user;

pub use letter::{drive_document_link, Letter, LetterInput};
pub use user::{RenewedTokens, TokenBundle, User};
