//! Terminal chooser driven by scripted input against a mocked drive.

use std::io::Cursor;

use mockito::{Matcher, Server, ServerGuard};
use reqwest::Client;
use serde_json::json;

use drive_pick::chooser::{ChooserLibrary, SINGLE_FILE_VIEW};
use drive_pick::models::{PickerAction, PickerConfig};
use drive_pick::picker::TerminalPicker;
use drive_pick::{AccessToken, DriveClient};

fn config() -> PickerConfig {
    PickerConfig {
        view: SINGLE_FILE_VIEW,
        oauth_token: AccessToken::new("tok-1"),
        developer_key: "dev-key".to_string(),
        max_items: 1,
    }
}

fn picker(server: &ServerGuard, input: &str) -> TerminalPicker<Cursor<Vec<u8>>> {
    TerminalPicker::new(
        DriveClient::new(Client::new(), server.url()),
        Cursor::new(input.as_bytes().to_vec()),
    )
}

async fn mock_listing(server: &mut ServerGuard, folder: &str, files: serde_json::Value) -> mockito::Mock {
    server
        .mock("GET", "/files")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "q".into(),
                format!("'{}' in parents and trashed = false", folder),
            ),
            Matcher::UrlEncoded("key".into(), "dev-key".into()),
        ]))
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .with_body(json!({ "files": files }).to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn folders_are_entered_and_files_picked() {
    let mut server = Server::new_async().await;
    let root = mock_listing(
        &mut server,
        "root",
        json!([
            {"id": "fold1", "name": "Projects", "mimeType": "application/vnd.google-apps.folder"}
        ]),
    )
    .await;
    let inner = mock_listing(
        &mut server,
        "fold1",
        json!([
            {
                "id": "file1",
                "name": "plan.txt",
                "mimeType": "text/plain",
                "webViewLink": "https://drive.google.com/file/d/file1/view"
            }
        ]),
    )
    .await;

    let response = picker(&server, "1\n1\n").show(&config()).await.unwrap();

    root.assert_async().await;
    inner.assert_async().await;
    assert_eq!(response.action, PickerAction::Picked);
    assert_eq!(response.docs.len(), 1);
    assert_eq!(response.docs[0].id, "file1");
    assert_eq!(response.docs[0].name, "plan.txt");
    assert_eq!(response.docs[0].mime_type, "text/plain");
}

#[tokio::test]
async fn pasted_link_is_resolved() {
    let mut server = Server::new_async().await;
    let _root = mock_listing(&mut server, "root", json!([])).await;
    let _mock = server
        .mock("GET", "/files/linked1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"name": "Shared.pdf", "mimeType": "application/pdf"}).to_string())
        .create_async()
        .await;

    let response = picker(&server, "https://drive.google.com/file/d/linked1/view\n")
        .show(&config())
        .await
        .unwrap();

    assert_eq!(response.action, PickerAction::Picked);
    assert_eq!(response.docs[0].id, "linked1");
    assert_eq!(response.docs[0].name, "Shared.pdf");
}

#[tokio::test]
async fn quit_cancels() {
    let mut server = Server::new_async().await;
    let _root = mock_listing(&mut server, "root", json!([])).await;

    let response = picker(&server, "7\nq\n").show(&config()).await.unwrap();

    assert_eq!(response.action, PickerAction::Cancel);
    assert!(response.docs.is_empty());
}

#[tokio::test]
async fn end_of_input_cancels() {
    let mut server = Server::new_async().await;
    let _root = mock_listing(&mut server, "root", json!([])).await;

    let response = picker(&server, "").show(&config()).await.unwrap();

    assert_eq!(response.action, PickerAction::Cancel);
}
