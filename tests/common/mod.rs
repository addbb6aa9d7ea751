//! Fakes for the capability handles, shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;

use drive_pick::auth::{AccessToken, AuthLibrary, TokenRequest};
use drive_pick::chooser::ChooserLibrary;
use drive_pick::models::{FileSelection, PickerConfig, PickerResponse};
use drive_pick::{DriveError, Outcome, Result, ScriptLoader};

/// Identity client that grants `token`, or is dismissed when `None`.
pub struct FakeAuth {
    token: Option<String>,
    calls: AtomicUsize,
}

impl FakeAuth {
    pub fn granting(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn dismissing() -> Arc<Self> {
        Arc::new(Self {
            token: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthLibrary for FakeAuth {
    async fn request_access_token(&self, _request: TokenRequest<'_>) -> Result<Outcome<AccessToken>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // The consent page takes a while; let other tasks run meanwhile.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        Ok(match &self.token {
            Some(token) => Outcome::Completed(AccessToken::new(token.clone())),
            None => Outcome::Aborted,
        })
    }
}

/// Chooser that always answers with `response`.
pub struct FakeChooser {
    response: PickerResponse,
    calls: AtomicUsize,
    last_config: Mutex<Option<PickerConfig>>,
}

impl FakeChooser {
    pub fn picking(doc: FileSelection) -> Arc<Self> {
        Self::answering(PickerResponse::picked(doc))
    }

    pub fn cancelling() -> Arc<Self> {
        Self::answering(PickerResponse::cancel())
    }

    pub fn answering(response: PickerResponse) -> Arc<Self> {
        Arc::new(Self {
            response,
            calls: AtomicUsize::new(0),
            last_config: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<PickerConfig> {
        self.last_config.lock().clone()
    }
}

#[async_trait]
impl ChooserLibrary for FakeChooser {
    async fn show(&self, config: &PickerConfig) -> Result<PickerResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock() = Some(config.clone());
        Ok(self.response.clone())
    }
}

pub fn selection(id: &str, name: &str, mime_type: &str) -> FileSelection {
    FileSelection {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        url: Some(format!("https://drive.google.com/file/d/{}/view", id)),
    }
}

/// Loader whose libraries load immediately, already waited on.
pub async fn ready_loader(auth: Arc<FakeAuth>, chooser: Arc<FakeChooser>) -> Arc<ScriptLoader> {
    let auth: Arc<dyn AuthLibrary> = auth;
    let chooser: Arc<dyn ChooserLibrary> = chooser;
    let loader = Arc::new(ScriptLoader::new(
        async move { Ok::<_, DriveError>(auth) }.boxed(),
        async move { Ok::<_, DriveError>(chooser) }.boxed(),
    ));
    loader.ensure_ready();
    loader
        .wait_ready(Duration::from_secs(5))
        .await
        .expect("fake libraries load");
    loader
}

/// Loader whose libraries never finish loading.
pub fn stalled_loader() -> Arc<ScriptLoader> {
    let loader = Arc::new(ScriptLoader::new(
        futures::future::pending().boxed(),
        futures::future::pending().boxed(),
    ));
    loader.ensure_ready();
    loader
}

/// An address nothing listens on.
pub async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
