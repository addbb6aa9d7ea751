//! Completes the chooser's minimal selection with authoritative metadata.

use tracing::{debug, warn};

use crate::auth::AccessToken;
use crate::client::DriveClient;
use crate::models::{FileRecord, FileSelection};

/// Fields looked up for a picked file.
pub const METADATA_FIELDS: &str = "name,size,mimeType,fileExtension,webViewLink";

pub struct MetadataEnricher {
    drive: DriveClient,
}

impl MetadataEnricher {
    pub fn new(drive: DriveClient) -> Self {
        Self { drive }
    }

    /// Build the record for `selection`.
    ///
    /// Never fails: when the lookup does not succeed (status, network, body)
    /// the record is built from the chooser's fields alone.
    pub async fn enrich(&self, selection: &FileSelection, token: &AccessToken) -> FileRecord {
        match self.drive.get_file(&selection.id, token, METADATA_FIELDS).await {
            Ok(metadata) => {
                debug!(file_id = %selection.id, "metadata fetched");
                FileRecord::merged(selection, metadata)
            }
            Err(e) => {
                warn!(file_id = %selection.id, error = %e, "metadata fetch failed, using chooser result");
                FileRecord::from_selection(selection)
            }
        }
    }
}
