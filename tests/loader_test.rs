//! Readiness signals of the script loader.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use common::{stalled_loader, FakeAuth, FakeChooser};
use drive_pick::auth::AuthLibrary;
use drive_pick::chooser::ChooserLibrary;
use drive_pick::{DriveError, ScriptLoader, ScriptsReady};

fn counting_loader(loads: Arc<AtomicUsize>) -> ScriptLoader {
    let auth_loads = Arc::clone(&loads);
    let auth = async move {
        auth_loads.fetch_add(1, Ordering::SeqCst);
        Ok::<Arc<dyn AuthLibrary>, DriveError>(FakeAuth::granting("tok"))
    }
    .boxed();
    let chooser = async move {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok::<Arc<dyn ChooserLibrary>, DriveError>(FakeChooser::cancelling())
    }
    .boxed();
    ScriptLoader::new(auth, chooser)
}

#[tokio::test]
async fn nothing_is_ready_before_loading_starts() {
    let loader = counting_loader(Arc::new(AtomicUsize::new(0)));

    assert_eq!(loader.scripts_ready(), ScriptsReady::default());
    let err = loader.wait_ready(Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, DriveError::NotReady(_)));
}

#[tokio::test]
async fn ensure_ready_loads_each_library_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = counting_loader(Arc::clone(&loads));

    loader.ensure_ready();
    loader.ensure_ready();
    loader.wait_ready(Duration::from_secs(5)).await.unwrap();
    loader.ensure_ready();

    assert_eq!(loads.load(Ordering::SeqCst), 2);
    assert!(loader.scripts_ready().all());
    assert!(loader.auth_library().is_some());
    assert!(loader.chooser_library().is_some());
}

#[tokio::test]
async fn failed_load_never_becomes_ready() {
    let chooser: Arc<dyn ChooserLibrary> = FakeChooser::cancelling();
    let loader = ScriptLoader::new(
        async {
            Err::<Arc<dyn AuthLibrary>, DriveError>(DriveError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
        .boxed(),
        async move { Ok::<_, DriveError>(chooser) }.boxed(),
    );
    loader.ensure_ready();

    let err = loader.wait_ready(Duration::from_millis(100)).await.unwrap_err();

    assert_eq!(err.to_string(), "auth library not ready");
    assert_eq!(
        loader.scripts_ready(),
        ScriptsReady {
            chooser_lib: true,
            auth_lib: false,
        }
    );
}

#[tokio::test]
async fn stalled_load_reports_chooser_not_ready() {
    let loader = stalled_loader();

    let err = loader.wait_ready(Duration::from_millis(50)).await.unwrap_err();

    assert_eq!(err.to_string(), "chooser not ready");
}
