//! Data models shared by the chooser, the drive API and the session.

use serde::{Deserialize, Serialize};

use crate::auth::AccessToken;

/// MIME type the drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Metadata for a file or folder as returned by the drive API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
}

impl FileMetadata {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl std::fmt::Display for FileMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_folder() {
            return write!(f, "{:>12}  {}/", "<folder>", self.name);
        }
        write!(f, "{:>12}  {}", format_size(self.size), self.name)
    }
}

/// Format a byte count for display.
///
/// Counts under 1024 KB are shown in KB, everything else in MB, both with two
/// decimals. A missing or zero count is `"Unknown size"`.
pub fn format_size(bytes: Option<u64>) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    match bytes {
        None | Some(0) => "Unknown size".to_string(),
        Some(b) if b < MB => format!("{:.2} KB", b as f64 / KB as f64),
        Some(b) => format!("{:.2} MB", b as f64 / MB as f64),
    }
}

/// Minimal item handed back by the chooser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSelection {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<FileMetadata> for FileSelection {
    fn from(meta: FileMetadata) -> Self {
        Self {
            id: meta.id,
            name: meta.name,
            mime_type: meta.mime_type.unwrap_or_default(),
            url: meta.web_view_link,
        }
    }
}

/// The selected file as shown to the user and used for downloads.
///
/// Built once per selection by merging the chooser's result with the drive's
/// metadata; a new selection replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub extension: Option<String>,
    pub size_bytes: Option<u64>,
    pub view_link: Option<String>,
}

impl FileRecord {
    /// Record built from the chooser alone, used when metadata is unavailable.
    pub fn from_selection(selection: &FileSelection) -> Self {
        Self {
            id: selection.id.clone(),
            name: selection.name.clone(),
            mime_type: selection.mime_type.clone(),
            extension: None,
            size_bytes: None,
            view_link: None,
        }
    }

    /// Merge drive metadata over the chooser's result. Server fields win
    /// wherever they are present.
    pub fn merged(selection: &FileSelection, metadata: FileMetadata) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        Self {
            id: selection.id.clone(),
            name: non_empty(Some(metadata.name)).unwrap_or_else(|| selection.name.clone()),
            mime_type: non_empty(metadata.mime_type)
                .unwrap_or_else(|| selection.mime_type.clone()),
            extension: non_empty(metadata.file_extension),
            size_bytes: metadata.size,
            view_link: non_empty(metadata.web_view_link).or_else(|| selection.url.clone()),
        }
    }

    pub fn display_size(&self) -> String {
        format_size(self.size_bytes)
    }
}

impl std::fmt::Display for FileRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "ID:   {}", self.id)?;
        writeln!(f, "Type: {}", self.mime_type)?;
        write!(f, "Size: {}", self.display_size())?;
        if let Some(ext) = &self.extension {
            write!(f, "\nExt:  {}", ext)?;
        }
        if let Some(link) = &self.view_link {
            write!(f, "\nLink: {}", link)?;
        }
        Ok(())
    }
}

/// View configuration for the chooser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsView {
    pub include_folders: bool,
    pub folder_selectable: bool,
}

/// Everything the chooser needs to open.
#[derive(Debug, Clone)]
pub struct PickerConfig {
    pub view: DocsView,
    pub oauth_token: AccessToken,
    pub developer_key: String,
    pub max_items: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickerAction {
    Picked,
    Cancel,
}

/// What the chooser reports when it closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerResponse {
    pub action: PickerAction,
    #[serde(default)]
    pub docs: Vec<FileSelection>,
}

impl PickerResponse {
    pub fn picked(doc: FileSelection) -> Self {
        Self {
            action: PickerAction::Picked,
            docs: vec![doc],
        }
    }

    pub fn cancel() -> Self {
        Self {
            action: PickerAction::Cancel,
            docs: Vec::new(),
        }
    }
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileMetadata>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// The parts of the OpenID discovery document the identity client needs.
#[derive(Debug, Deserialize)]
pub struct IdentityDiscovery {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
}

/// The parts of an API discovery document the chooser needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDiscovery {
    pub root_url: String,
    pub service_path: String,
}

impl ApiDiscovery {
    /// Base URL for API calls, without a trailing slash.
    pub fn api_base(&self) -> String {
        format!(
            "{}/{}",
            self.root_url.trim_end_matches('/'),
            self.service_path.trim_matches('/')
        )
    }
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
