// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Drive gateway for letter documents.
//!
//! Handles:
//! - Locating or creating the "Letters" folder
//! - Creating Google Docs from plain text (multipart upload)
//! - Replacing a document's content (media upload)
//! - Listing the user's documents, newest first

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::GoogleEndpoints;
use crate::error::AppError;
use crate::services::AuthHandle;

pub const LETTERS_FOLDER_NAME: &str = "Letters";
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";

const MULTIPART_BOUNDARY: &str = "===============letters_boundary===============";

/// A document created in Drive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveDocument {
    pub id: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

/// One entry of the user's document listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
pub struct DriveDocumentSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct FileList<T> {
    #[serde(default = "Vec::new")]
    files: Vec<T>,
}

#[derive(Deserialize)]
struct FileId {
    id: String,
}

#[derive(Deserialize)]
struct DriveErrorBody {
    error: DriveErrorDetail,
}

#[derive(Deserialize)]
struct DriveErrorDetail {
    message: String,
}

/// Drive v3 client. Every call authenticates through an [`AuthHandle`].
#[derive(Clone)]
pub struct DriveGateway {
    http: reqwest::Client,
    api_base: String,
    upload_base: String,
}

impl DriveGateway {
    pub fn new(endpoints: &GoogleEndpoints, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building Drive HTTP client")?;
        Ok(Self {
            http,
            api_base: endpoints.drive_api_base.trim_end_matches('/').to_string(),
            upload_base: endpoints.drive_upload_base.trim_end_matches('/').to_string(),
        })
    }

    /// Return the ID of the user's "Letters" folder, creating it if needed.
    pub async fn ensure_folder(&self, auth: &AuthHandle) -> Result<String, AppError> {
        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            LETTERS_FOLDER_NAME, FOLDER_MIME_TYPE
        );
        let url = format!("{}/files", self.api_base);
        let found: FileList<FileId> = self
            .send_json(
                auth,
                self.http
                    .get(&url)
                    .query(&[("q", query.as_str()), ("fields", "files(id)")]),
            )
            .await?;

        if let Some(folder) = found.files.into_iter().next() {
            tracing::debug!(user_id = %auth.user_id(), folder_id = %folder.id, "Found letters folder");
            return Ok(folder.id);
        }

        let metadata = serde_json::json!({
            "name": LETTERS_FOLDER_NAME,
            "mimeType": FOLDER_MIME_TYPE,
        });
        let created: FileId = self
            .send_json(
                auth,
                self.http
                    .post(&url)
                    .query(&[("fields", "id")])
                    .json(&metadata),
            )
            .await?;

        tracing::info!(user_id = %auth.user_id(), folder_id = %created.id, "Created letters folder");
        Ok(created.id)
    }

    /// Create a Google Doc from plain text, optionally inside a folder.
    pub async fn create_document(
        &self,
        auth: &AuthHandle,
        name: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<DriveDocument, AppError> {
        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": DOCUMENT_MIME_TYPE,
        });
        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let body = multipart_body(&metadata, content);
        let url = format!(
            "{}/files?uploadType=multipart&fields=id,webViewLink",
            self.upload_base
        );
        let document: DriveDocument = self
            .send_json(
                auth,
                self.http
                    .post(&url)
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
                    )
                    .body(body),
            )
            .await?;

        tracing::info!(user_id = %auth.user_id(), drive_file_id = %document.id, "Created Drive document");
        Ok(document)
    }

    /// Replace the full content of an existing document.
    pub async fn update_document(
        &self,
        auth: &AuthHandle,
        document_id: &str,
        content: &str,
    ) -> Result<(), AppError> {
        let url = format!("{}/files/{}", self.upload_base, document_id);
        self.send(
            auth,
            self.http
                .patch(&url)
                .query(&[("uploadType", "media")])
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(content.to_string()),
        )
        .await?;

        tracing::info!(user_id = %auth.user_id(), drive_file_id = %document_id, "Updated Drive document");
        Ok(())
    }

    /// List non-trashed Google Docs, most recently modified first.
    pub async fn list_documents(
        &self,
        auth: &AuthHandle,
    ) -> Result<Vec<DriveDocumentSummary>, AppError> {
        let query = format!("mimeType='{}' and trashed=false", DOCUMENT_MIME_TYPE);
        let url = format!("{}/files", self.api_base);
        let list: FileList<DriveDocumentSummary> = self
            .send_json(
                auth,
                self.http.get(&url).query(&[
                    ("q", query.as_str()),
                    (
                        "fields",
                        "files(id, name, webViewLink, createdTime, modifiedTime)",
                    ),
                    ("orderBy", "modifiedTime desc"),
                ]),
            )
            .await?;

        let mut files = list.files;
        sort_newest_first(&mut files);
        Ok(files)
    }

    async fn send(
        &self,
        auth: &AuthHandle,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AppError> {
        let access_token = auth.access_token().await?;
        let response = request
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                AppError::RemoteStorage(format!("Drive request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::RemoteStorage(format!(
            "HTTP {}: {}",
            status,
            provider_message(&body)
        )))
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        auth: &AuthHandle,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        self.send(auth, request)
            .await?
            .json()
            .await
            .map_err(|e| {
                AppError::RemoteStorage(format!("JSON parse error: {}", e.without_url()))
            })
    }
}

/// Metadata plus plain-text media as a `multipart/related` body.
fn multipart_body(metadata: &serde_json::Value, content: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: text/plain; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(content.as_bytes());
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--").as_bytes());
    body
}

/// Pull the human-readable message out of a Drive error body.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<DriveErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn sort_newest_first(files: &mut [DriveDocumentSummary]) {
    // None sorts before Some, so undated entries land at the end
    files.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
}
