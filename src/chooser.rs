//! Opens the file chooser and turns its result into a single selection.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::auth::AccessToken;
use crate::error::{DriveError, Result};
use crate::models::{DocsView, FileSelection, PickerAction, PickerConfig, PickerResponse};
use crate::Outcome;

/// Handle to a loaded chooser widget.
#[async_trait]
pub trait ChooserLibrary: Send + Sync {
    /// Show the chooser and resolve when the user picks or cancels.
    async fn show(&self, config: &PickerConfig) -> Result<PickerResponse>;
}

/// Single-select view: folders can be browsed but not picked.
pub const SINGLE_FILE_VIEW: DocsView = DocsView {
    include_folders: true,
    folder_selectable: false,
};

pub struct ChooserGateway {
    developer_key: String,
}

impl ChooserGateway {
    pub fn new(developer_key: impl Into<String>) -> Self {
        Self {
            developer_key: developer_key.into(),
        }
    }

    /// Open the chooser once. No retries: one open, one outcome.
    pub async fn open(
        &self,
        chooser: &dyn ChooserLibrary,
        token: &AccessToken,
    ) -> Result<Outcome<FileSelection>> {
        if token.is_empty() {
            return Err(DriveError::NotReady("access token"));
        }

        let config = PickerConfig {
            view: SINGLE_FILE_VIEW,
            oauth_token: token.clone(),
            developer_key: self.developer_key.clone(),
            max_items: 1,
        };

        info!("opening chooser");
        let response = chooser.show(&config).await?;

        match response.action {
            PickerAction::Cancel => {
                info!("chooser dismissed");
                Ok(Outcome::Aborted)
            }
            PickerAction::Picked => match response.docs.into_iter().next() {
                Some(doc) => {
                    info!(file_id = %doc.id, mime_type = %doc.mime_type, "file picked");
                    Ok(Outcome::Completed(doc))
                }
                None => {
                    warn!("chooser reported a pick without documents");
                    Ok(Outcome::Aborted)
                }
            },
        }
    }
}
