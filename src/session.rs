//! The per-run session: readiness, token, selection, and the pick/download
//! entry points the shell calls.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use tracing::info;

use crate::auth::{AccessToken, TokenManager};
use crate::chooser::ChooserGateway;
use crate::client::DriveClient;
use crate::config::Config;
use crate::enricher::MetadataEnricher;
use crate::error::{DriveError, Result};
use crate::loader::{ScriptLoader, ScriptsReady};
use crate::models::FileRecord;
use crate::transfer::{SavedFile, TransferResolver};
use crate::Outcome;

/// Where the pick flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingToken,
    AwaitingSelection,
    Enriching,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingToken => "awaiting token",
            SessionState::AwaitingSelection => "awaiting selection",
            SessionState::Enriching => "enriching",
        };
        f.write_str(s)
    }
}

/// Holds the session out of `Idle` for one pick and puts it back on drop.
struct FlowGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl<'a> FlowGuard<'a> {
    fn begin(state: &'a Mutex<SessionState>, first: SessionState) -> Result<Self> {
        let mut current = state.lock();
        if *current != SessionState::Idle {
            return Err(DriveError::Busy(*current));
        }
        *current = first;
        Ok(Self { state })
    }

    fn advance(&self, next: SessionState) {
        *self.state.lock() = next;
    }
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = SessionState::Idle;
    }
}

pub struct Session {
    loader: Arc<ScriptLoader>,
    tokens: TokenManager,
    chooser: ChooserGateway,
    enricher: MetadataEnricher,
    transfer: TransferResolver,
    state: Mutex<SessionState>,
    selected: RwLock<Option<FileRecord>>,
}

impl Session {
    pub fn new(config: &Config, loader: Arc<ScriptLoader>) -> Result<Self> {
        let http = Client::new();
        let drive = DriveClient::new(http.clone(), config.endpoints.drive_api.as_str());

        Ok(Self {
            loader,
            tokens: TokenManager::new(config.client_id.as_str()),
            chooser: ChooserGateway::new(config.developer_key.as_str()),
            enricher: MetadataEnricher::new(drive),
            transfer: TransferResolver::new(http, &config.endpoints.drive_api)?,
            state: Mutex::new(SessionState::Idle),
            selected: RwLock::new(None),
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn scripts_ready(&self) -> ScriptsReady {
        self.loader.scripts_ready()
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.tokens.current_token()
    }

    pub fn selected_file(&self) -> Option<FileRecord> {
        self.selected.read().clone()
    }

    /// The "choose a file" action.
    ///
    /// Requires both libraries to be loaded. Requests a token first when none
    /// is cached, then opens the chooser and enriches the pick. Dismissing
    /// either the consent or the chooser ends the flow with
    /// [`Outcome::Aborted`] and leaves the previous selection in place.
    pub async fn pick(&self) -> Result<Outcome<FileRecord>> {
        let (Some(auth), Some(chooser)) =
            (self.loader.auth_library(), self.loader.chooser_library())
        else {
            info!(ready = ?self.loader.scripts_ready(), "pick requested before libraries loaded");
            return Err(DriveError::NotReady("chooser"));
        };

        let token = self.tokens.current_token();
        let flow = FlowGuard::begin(
            &self.state,
            if token.is_some() {
                SessionState::AwaitingSelection
            } else {
                SessionState::AwaitingToken
            },
        )?;

        let token = match token {
            Some(token) => token,
            None => match self.tokens.request_token(auth.as_ref()).await? {
                Outcome::Completed(token) => token,
                Outcome::Aborted => return Ok(Outcome::Aborted),
            },
        };

        flow.advance(SessionState::AwaitingSelection);
        let selection = match self.chooser.open(chooser.as_ref(), &token).await? {
            Outcome::Completed(selection) => selection,
            Outcome::Aborted => return Ok(Outcome::Aborted),
        };

        flow.advance(SessionState::Enriching);
        let record = self.enricher.enrich(&selection, &token).await;
        *self.selected.write() = Some(record.clone());

        info!(file_id = %record.id, "selection ready");
        Ok(Outcome::Completed(record))
    }

    /// The "download" action for the current selection.
    pub async fn download(&self, dest_dir: &Path) -> Result<SavedFile> {
        let record = self
            .selected_file()
            .ok_or(DriveError::NotReady("file selection"))?;
        let token = self
            .tokens
            .current_token()
            .ok_or(DriveError::NotReady("access token"))?;

        self.transfer.download(&record, &token, dest_dir).await
    }
}
