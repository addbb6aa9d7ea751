//! Error types for the drive_pick crate.

use thiserror::Error;

use crate::session::SessionState;

/// Errors that can occur while authorizing, picking, or transferring a file.
///
/// Dismissing the consent prompt or the chooser is not an error; those paths
/// return [`Outcome::Aborted`](crate::Outcome::Aborted) instead.
#[derive(Error, Debug)]
pub enum DriveError {
    /// A prerequisite (loaded library, cached token, selection) is missing.
    #[error("{0} not ready")]
    NotReady(&'static str),

    #[error("another action is already in progress ({0})")]
    Busy(SessionState),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL or ID: {0}")]
    InvalidUrlOrId(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
