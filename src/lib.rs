//! drive_pick - pick one file from a cloud drive and download it.
//!
//! The flow runs in causal order:
//! - [`ScriptLoader`] loads the identity client and the chooser once
//! - [`TokenManager`] obtains and caches an access token through the
//!   provider's consent page
//! - [`ChooserGateway`] opens the chooser and returns one selection
//! - [`MetadataEnricher`] completes it with the drive's metadata
//! - [`TransferResolver`] downloads the bytes, exporting native documents
//!
//! [`Session`] wires them together behind two user actions: pick and download.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use drive_pick::{Config, Outcome, ScriptLoader, Session};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("client-id", "developer-key")?;
//!     let loader = Arc::new(ScriptLoader::google(&config));
//!     loader.ensure_ready();
//!     loader.wait_ready(config.ready_timeout).await?;
//!
//!     let session = Session::new(&config, loader)?;
//!     if let Outcome::Completed(record) = session.pick().await? {
//!         println!("{}", record);
//!         session.download(Path::new(".")).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod chooser;
pub mod client;
pub mod config;
pub mod enricher;
pub mod error;
pub mod identity;
pub mod link;
pub mod loader;
pub mod logging;
pub mod models;
pub mod picker;
pub mod pkce;
pub mod session;
pub mod transfer;

// Re-exports for convenience
pub use auth::{AccessToken, AuthLibrary, TokenManager};
pub use chooser::{ChooserGateway, ChooserLibrary};
pub use client::DriveClient;
pub use config::{Config, Endpoints};
pub use enricher::MetadataEnricher;
pub use error::{DriveError, Result};
pub use loader::{ScriptLoader, ScriptsReady};
pub use models::{format_size, FileRecord, FileSelection};
pub use session::{Session, SessionState};
pub use transfer::{RetrievalStrategy, SavedFile, TransferResolver};

/// Result of a step the user can dismiss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Aborted,
}

impl<T> Outcome<T> {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Outcome::Aborted)
    }
}
