// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Letters API: write letters in the browser and keep them in Google Drive
//!
//! This crate provides the backend API for Google sign-in, Drive-backed
//! letter saves, and locally stored drafts.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use db::{CredentialStore, LetterStore};
use services::{DriveGateway, GoogleOAuthClient, LetterService, TokenManager};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn CredentialStore>,
    pub letters: Arc<dyn LetterStore>,
    pub token_manager: TokenManager,
    pub drive: DriveGateway,
    pub letter_service: LetterService,
}

impl AppState {
    /// Wire the Google clients and services over the given stores.
    pub fn new(
        config: Config,
        users: Arc<dyn CredentialStore>,
        letters: Arc<dyn LetterStore>,
    ) -> anyhow::Result<Self> {
        let oauth = GoogleOAuthClient::new(config.google.clone(), config.remote_timeout)?;
        let drive = DriveGateway::new(&config.google.endpoints, config.remote_timeout)?;
        let token_manager = TokenManager::new(oauth, users.clone());
        let letter_service =
            LetterService::new(letters.clone(), token_manager.clone(), drive.clone());

        Ok(Self {
            config,
            users,
            letters,
            token_manager,
            drive,
            letter_service,
        })
    }
}
