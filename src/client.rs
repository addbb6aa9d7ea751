//! Drive API v3 calls used by the chooser and the metadata enricher.

use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use crate::auth::AccessToken;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, FileListResponse, FileMetadata};

/// Base URL for Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Fields requested for each entry of a folder listing.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, size, mimeType, fileExtension, webViewLink)";

/// Thin client over the drive's `files` resource.
///
/// The token is passed per call: it belongs to the session, not the client.
#[derive(Clone)]
pub struct DriveClient {
    api_base: String,
    developer_key: Option<String>,
    http: Client,
}

impl DriveClient {
    pub fn new(http: Client, api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            developer_key: None,
            http,
        }
    }

    /// Attach the developer key sent as `key` on listing calls.
    pub fn with_developer_key(mut self, key: impl Into<String>) -> Self {
        self.developer_key = Some(key.into());
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// List the children of a folder, following pagination.
    pub async fn list_folder(
        &self,
        parent_id: &str,
        token: &AccessToken,
        include_folders: bool,
    ) -> Result<Vec<FileMetadata>> {
        let mut query = format!("'{}' in parents and trashed = false", parent_id.replace('\'', "\\'"));
        if !include_folders {
            query.push_str(" and mimeType != 'application/vnd.google-apps.folder'");
        }
        self.query_files(&query, token).await
    }

    /// Query files using Google Drive query syntax.
    pub async fn query_files(&self, query: &str, token: &AccessToken) -> Result<Vec<FileMetadata>> {
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/files", self.api_base))
                .bearer_auth(token.secret())
                .query(&[
                    ("q", query),
                    ("includeItemsFromAllDrives", "true"),
                    ("supportsAllDrives", "true"),
                    ("orderBy", "folder,name"),
                    ("fields", LIST_FIELDS),
                ]);

            if let Some(key) = &self.developer_key {
                request = request.query(&[("key", key)]);
            }
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page)]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            let list_response: FileListResponse = response.json().await?;
            all_files.extend(list_response.files);

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = all_files.len(), "listed files");
        Ok(all_files)
    }

    /// Get file metadata by ID, restricted to `fields`.
    pub async fn get_file(
        &self,
        file_id: &str,
        token: &AccessToken,
        fields: &str,
    ) -> Result<FileMetadata> {
        let response = self
            .http
            .get(self.file_url(file_id)?)
            .bearer_auth(token.secret())
            .query(&[("supportsAllDrives", "true"), ("fields", fields)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let mut metadata: FileMetadata = response.json().await?;
        if metadata.id.is_empty() {
            metadata.id = file_id.to_string();
        }
        Ok(metadata)
    }

    /// `{api_base}/files/{id}` with the ID percent-encoded as one path segment.
    fn file_url(&self, file_id: &str) -> Result<Url> {
        let invalid = || DriveError::InvalidUrlOrId(self.api_base.clone());
        let mut url = Url::parse(&self.api_base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push("files")
            .push(file_id);
        Ok(url)
    }
}

/// Turn a non-success response into an [`DriveError::ApiError`], preferring
/// the structured error body when the API sent one.
pub(crate) async fn api_error(response: Response) -> DriveError {
    let status = response.status();
    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        };
    }
    DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    }
}
