//! Picks the byte-retrieval strategy for a record and saves the bytes locally.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use url::Url;

use crate::auth::AccessToken;
use crate::error::{DriveError, Result};
use crate::models::FileRecord;

pub const GOOGLE_DOCUMENT: &str = "application/vnd.google-apps.document";
pub const GOOGLE_SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";
pub const GOOGLE_PRESENTATION: &str = "application/vnd.google-apps.presentation";

/// Used when the record has no usable name.
pub const PLACEHOLDER_NAME: &str = "downloaded_file";

/// Target format of a server-side export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Csv,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Csv => "text/csv",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
        }
    }
}

/// How the bytes of a file are retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStrategy {
    DocumentExport,
    SpreadsheetExport,
    PresentationExport,
    DirectContent,
}

impl RetrievalStrategy {
    /// Total over MIME types: the three native types export, everything else
    /// is fetched as raw content.
    pub fn for_mime_type(mime_type: &str) -> Self {
        match mime_type {
            GOOGLE_DOCUMENT => RetrievalStrategy::DocumentExport,
            GOOGLE_SPREADSHEET => RetrievalStrategy::SpreadsheetExport,
            GOOGLE_PRESENTATION => RetrievalStrategy::PresentationExport,
            _ => RetrievalStrategy::DirectContent,
        }
    }

    pub fn export_format(self) -> Option<ExportFormat> {
        match self {
            RetrievalStrategy::DocumentExport | RetrievalStrategy::PresentationExport => {
                Some(ExportFormat::Pdf)
            }
            RetrievalStrategy::SpreadsheetExport => Some(ExportFormat::Csv),
            RetrievalStrategy::DirectContent => None,
        }
    }
}

/// A file written by [`TransferResolver::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Filename for a downloaded record: `name` plus `.extension` when known, so
/// `Report` with extension `pdf` saves as `Report.pdf`.
///
/// Two refinements on that rule: exports always take the export format's
/// extension, since the bytes are converted, and a name that already ends
/// with the extension is not suffixed again (`Report.pdf` stays as is).
pub fn download_filename(record: &FileRecord) -> String {
    let name = sanitize_filename(&record.name);
    let base = if name.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        name
    };

    let extension = match RetrievalStrategy::for_mime_type(&record.mime_type).export_format() {
        Some(format) => Some(format.extension().to_string()),
        None => record
            .extension
            .as_deref()
            .map(sanitize_filename)
            .filter(|ext| !ext.is_empty()),
    };

    match extension {
        Some(ext) if !base.to_lowercase().ends_with(&format!(".{}", ext.to_lowercase())) => {
            format!("{}.{}", base, ext)
        }
        _ => base,
    }
}

/// Make a remote name safe to use as a single local path component.
///
/// Path separators and control characters become `_`, surrounding dots and
/// whitespace are trimmed, and the result is capped at 255 bytes.
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());

    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

/// Resolves retrieval URLs against the drive API and performs downloads.
pub struct TransferResolver {
    api_base: Url,
    http: Client,
}

impl TransferResolver {
    pub fn new(http: Client, api_base: &str) -> Result<Self> {
        let api_base = Url::parse(api_base.trim_end_matches('/'))
            .map_err(|_| DriveError::InvalidUrlOrId(api_base.to_string()))?;
        if api_base.cannot_be_a_base() {
            return Err(DriveError::InvalidUrlOrId(api_base.to_string()));
        }
        Ok(Self { api_base, http })
    }

    /// URL the bytes of `record` are fetched from. Performs no I/O.
    pub fn resolve_download_url(&self, record: &FileRecord) -> Result<Url> {
        let strategy = RetrievalStrategy::for_mime_type(&record.mime_type);

        let mut url = self.api_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| DriveError::InvalidUrlOrId(self.api_base.to_string()))?;
            segments.pop_if_empty().push("files").push(&record.id);
            if strategy.export_format().is_some() {
                segments.push("export");
            }
        }

        {
            let mut query = url.query_pairs_mut();
            match strategy.export_format() {
                Some(format) => query.append_pair("mimeType", format.mime_type()),
                None => query.append_pair("alt", "media"),
            };
            query.append_pair("supportsAllDrives", "true");
        }

        Ok(url)
    }

    /// Fetch the bytes of `record` and save them into `dest_dir`.
    ///
    /// The body is staged in a temporary file next to the destination and
    /// renamed into place once complete; on any failure the staging file is
    /// removed.
    pub async fn download(
        &self,
        record: &FileRecord,
        token: &AccessToken,
        dest_dir: &Path,
    ) -> Result<SavedFile> {
        let url = self.resolve_download_url(record)?;
        info!(
            file_id = %record.id,
            strategy = ?RetrievalStrategy::for_mime_type(&record.mime_type),
            "starting download"
        );

        let response = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| DriveError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(file_id = %record.id, status = status.as_u16(), "download rejected");
            return Err(DriveError::DownloadFailed(status_text(status)));
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let staging = tempfile::Builder::new()
            .prefix(".drive_pick-")
            .suffix(".part")
            .tempfile_in(dest_dir)?;

        let mut file = tokio::fs::File::from_std(staging.reopen()?);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DriveError::DownloadFailed(e.to_string()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        let path = dest_dir.join(download_filename(record));
        staging.persist(&path).map_err(|e| DriveError::Io(e.error))?;

        info!(file_id = %record.id, bytes = written, path = %path.display(), "download saved");
        Ok(SavedFile {
            path,
            bytes: written,
        })
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}
