//! Loads the identity client and the chooser exactly once and publishes
//! their readiness.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::auth::AuthLibrary;
use crate::chooser::ChooserLibrary;
use crate::config::Config;
use crate::error::{DriveError, Result};
use crate::identity::{open_in_browser, GoogleIdentity};
use crate::picker::TerminalPicker;

/// Pending load of a capability handle.
pub type LoadFuture<L> = BoxFuture<'static, Result<Arc<L>>>;

/// Readiness of both libraries at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptsReady {
    pub chooser_lib: bool,
    pub auth_lib: bool,
}

impl ScriptsReady {
    pub fn all(&self) -> bool {
        self.chooser_lib && self.auth_lib
    }
}

/// One library: its pending load and the signal it flips once loaded.
struct Script<L: ?Sized> {
    name: &'static str,
    pending: Mutex<Option<LoadFuture<L>>>,
    ready: Arc<watch::Sender<Option<Arc<L>>>>,
}

impl<L> Script<L>
where
    L: ?Sized + Send + Sync + 'static,
{
    fn new(name: &'static str, load: LoadFuture<L>) -> Self {
        let (ready, _) = watch::channel(None);
        Self {
            name,
            pending: Mutex::new(Some(load)),
            ready: Arc::new(ready),
        }
    }

    fn start(&self) {
        let Some(load) = self.pending.lock().take() else {
            return;
        };

        let ready = Arc::clone(&self.ready);
        let name = self.name;
        tokio::spawn(async move {
            match load.await {
                Ok(handle) => {
                    info!(library = name, "library loaded");
                    ready.send_replace(Some(handle));
                }
                Err(e) => warn!(library = name, error = %e, "library failed to load"),
            }
        });
    }

    fn handle(&self) -> Option<Arc<L>> {
        self.ready.borrow().clone()
    }

    async fn wait(&self, timeout: Duration) -> Result<Arc<L>> {
        let mut rx = self.ready.subscribe();
        let handle = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(handle)) => (*handle).clone(),
            _ => None,
        };
        handle.ok_or(DriveError::NotReady(self.name))
    }
}

/// Owner of the two capability handles the flow depends on.
///
/// Nothing is loaded until [`ScriptLoader::ensure_ready`] runs; after that
/// each handle becomes available once its load completes and stays
/// available. A failed load leaves its handle absent for good.
pub struct ScriptLoader {
    auth: Script<dyn AuthLibrary>,
    chooser: Script<dyn ChooserLibrary>,
}

impl ScriptLoader {
    pub fn new(auth: LoadFuture<dyn AuthLibrary>, chooser: LoadFuture<dyn ChooserLibrary>) -> Self {
        Self {
            auth: Script::new("auth library", auth),
            chooser: Script::new("chooser", chooser),
        }
    }

    /// Loader for the vendor's identity provider and a terminal chooser.
    pub fn google(config: &Config) -> Self {
        let http = Client::new();

        let identity_url = config.endpoints.identity_discovery.clone();
        let client_secret = config.client_secret.clone();
        let auth_http = http.clone();
        let auth = async move {
            let identity =
                GoogleIdentity::load(auth_http, &identity_url, client_secret, open_in_browser()).await?;
            Ok::<Arc<dyn AuthLibrary>, DriveError>(Arc::new(identity))
        }
        .boxed();

        let drive_url = config.endpoints.drive_discovery.clone();
        let chooser = async move { TerminalPicker::load(http, &drive_url).await }.boxed();

        Self::new(auth, chooser)
    }

    /// Start loading both libraries. Safe to call any number of times.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure_ready(&self) {
        self.auth.start();
        self.chooser.start();
    }

    pub fn scripts_ready(&self) -> ScriptsReady {
        ScriptsReady {
            chooser_lib: self.chooser.handle().is_some(),
            auth_lib: self.auth.handle().is_some(),
        }
    }

    pub fn auth_library(&self) -> Option<Arc<dyn AuthLibrary>> {
        self.auth.handle()
    }

    pub fn chooser_library(&self) -> Option<Arc<dyn ChooserLibrary>> {
        self.chooser.handle()
    }

    /// Wait up to `timeout` for both libraries.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let (auth, chooser) = tokio::join!(self.auth.wait(timeout), self.chooser.wait(timeout));
        chooser?;
        auth?;
        Ok(())
    }
}
