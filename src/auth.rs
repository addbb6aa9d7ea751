//! Access token lifecycle for the session.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::Outcome;

/// Read-only access to the user's drive, needed to browse in the chooser.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Per-file access, needed to export and download the picked file.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Scopes requested for the whole session.
pub const SCOPES: &[&str] = &[DRIVE_READONLY_SCOPE, DRIVE_FILE_SCOPE];

/// Space-separated scope string sent to the identity provider.
pub fn scope_string() -> String {
    SCOPES.join(" ")
}

/// Short-lived bearer credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// What the identity client is asked for.
#[derive(Debug, Clone, Copy)]
pub struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub scope: &'a str,
}

/// Handle to a loaded identity client.
///
/// `request_access_token` drives the provider's consent UI and resolves once,
/// with [`Outcome::Aborted`] when the user dismisses it.
#[async_trait]
pub trait AuthLibrary: Send + Sync {
    async fn request_access_token(&self, request: TokenRequest<'_>) -> Result<Outcome<AccessToken>>;
}

/// Owns the session's access token.
///
/// The cached token is written only here, on a successful consent round-trip,
/// and lives until the process exits.
pub struct TokenManager {
    client_id: String,
    scope: String,
    cached: RwLock<Option<AccessToken>>,
    pending: Mutex<()>,
}

impl TokenManager {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            scope: scope_string(),
            cached: RwLock::new(None),
            pending: Mutex::new(()),
        }
    }

    /// The cached token, if any. Never blocks on a pending request.
    pub fn current_token(&self) -> Option<AccessToken> {
        self.cached.read().clone()
    }

    /// Run the consent flow and cache the resulting token.
    ///
    /// Only one consent prompt is ever open: a caller arriving while another
    /// request is pending waits for it and reuses its token.
    pub async fn request_token(&self, auth: &dyn AuthLibrary) -> Result<Outcome<AccessToken>> {
        let _pending = match self.pending.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("token request already pending, waiting for it");
                let guard = self.pending.lock().await;
                if let Some(token) = self.current_token() {
                    return Ok(Outcome::Completed(token));
                }
                guard
            }
        };

        info!(scope = %self.scope, "requesting access token");
        let request = TokenRequest {
            client_id: &self.client_id,
            scope: &self.scope,
        };

        match auth.request_access_token(request).await? {
            Outcome::Completed(token) => {
                *self.cached.write() = Some(token.clone());
                info!("access token cached for this session");
                Ok(Outcome::Completed(token))
            }
            Outcome::Aborted => {
                info!("consent dismissed, no token issued");
                Ok(Outcome::Aborted)
            }
        }
    }
}
