// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Letter routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Letter, LetterInput};
use crate::services::{DriveDocumentSummary, SavedLetter};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Drive and draft routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drive/ensure-folder", get(ensure_folder))
        .route("/drive/save", post(save_letter))
        .route("/drive/list", get(list_documents))
        .route("/drive/draft", post(save_draft))
        .route("/drive/drafts", get(list_drafts))
}

// ─── Drive ───────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FolderResponse {
    pub folder_id: String,
}

async fn ensure_folder(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FolderResponse>> {
    let auth = state.token_manager.authorize(&user.user_id).await?;
    let folder_id = state.drive.ensure_folder(&auth).await?;
    Ok(Json(FolderResponse { folder_id }))
}

/// Body for a Drive-backed save.
///
/// Missing fields default to empty and fail validation with 400.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveLetterRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub letter_id: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
}

async fn save_letter(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<SaveLetterRequest>, JsonRejection>,
) -> Result<Json<SavedLetter>> {
    let Json(body) = body?;
    let input = LetterInput::new(&body.title, &body.content)?;
    let saved = state
        .letter_service
        .save(
            &user.user_id,
            input,
            body.letter_id.as_deref(),
            body.folder_id.as_deref(),
        )
        .await?;
    Ok(Json(saved))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<DriveDocumentSummary>>> {
    let auth = state.token_manager.authorize(&user.user_id).await?;
    let files = state.drive.list_documents(&auth).await?;
    Ok(Json(files))
}

// ─── Drafts ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub letter_id: Option<String>,
}

async fn save_draft(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<DraftRequest>, JsonRejection>,
) -> Result<Json<Letter>> {
    let Json(body) = body?;
    let input = LetterInput::new(&body.title, &body.content)?;
    let letter = state
        .letter_service
        .save_draft(&user.user_id, input, body.letter_id.as_deref())
        .await?;
    Ok(Json(letter))
}

async fn list_drafts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Letter>>> {
    let letters = state.letter_service.list_drafts(&user.user_id).await?;
    Ok(Json(letters))
}
