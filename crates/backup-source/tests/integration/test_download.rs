//! Integration tests for listing children and downloading file content
//!
//! Verifies end-to-end behavior of `GraphSourceClient::children`,
//! `::get_item`, and `::open` against a wiremock-based mock server.

use backup_core::domain::{DriveId, DriveKind, DriveTarget, ItemId};
use backup_core::ports::{Item, SourceClient};
use chrono::{DateTime, Utc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn target(drive_id: &str) -> DriveTarget {
    DriveTarget::new(
        DriveId::new(drive_id.to_string()).unwrap(),
        "Test User".to_string(),
        DriveKind::Personal,
        "test-user".to_string(),
    )
}

fn item_without_download_ref(id: &str) -> Item {
    Item {
        id: ItemId::new(id.to_string()).unwrap(),
        name: "document.txt".to_string(),
        size: 39,
        modified_time: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        mime_type: Some("text/plain".to_string()),
        is_deleted: false,
        is_folder: false,
        parent_path: "/".to_string(),
        parent_drive_id: None,
        download_ref: None,
    }
}

#[tokio::test]
async fn test_children_lists_items_under_a_folder() {
    let (server, client) = common::setup_client().await;
    let target = target("drive-001");
    let folder_id = ItemId::new("root".to_string()).unwrap();

    Mock::given(method("GET"))
        .and(path("/drives/drive-001/items/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{"id": "c1", "name": "a.txt", "size": 10, "parentReference": {"path": "/drive/root:"}}]
        })))
        .mount(&server)
        .await;

    let items = client
        .children(&target, &folder_id, None)
        .await
        .expect("listing children failed");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "a.txt");
}

#[tokio::test]
async fn test_get_item_fetches_a_single_item_by_id() {
    let (server, client) = common::setup_client().await;
    let target = target("drive-001");
    let item_id = ItemId::new("item-001".to_string()).unwrap();

    Mock::given(method("GET"))
        .and(path("/drives/drive-001/items/item-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "item-001",
            "name": "report.pdf",
            "size": 4096,
            "parentReference": {"path": "/drive/root:/Reports"}
        })))
        .mount(&server)
        .await;

    let item = client
        .get_item(&target, &item_id)
        .await
        .expect("get_item failed");

    assert_eq!(item.name, "report.pdf");
    assert_eq!(item.parent_path, "/Reports");
}

#[tokio::test]
async fn test_open_downloads_via_download_ref_when_present() {
    let (server, client) = common::setup_client().await;
    let target = target("drive-001");
    let content = b"Hello, backup! This is test content.";

    Mock::given(method("GET"))
        .and(path("/custom/download/path"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(&server)
        .await;

    let mut item = item_without_download_ref("download-001");
    item.download_ref = Some(format!("{}/custom/download/path", server.uri()));

    let mut stream = client.open(&target, &item).await.expect("open failed");
    let mut buf = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut buf)
        .await
        .expect("reading stream failed");

    assert_eq!(buf, content);
}

#[tokio::test]
async fn test_open_falls_back_to_resource_type_url_without_download_ref() {
    let (server, client) = common::setup_client().await;
    let target = target("drive-001");
    let content: Vec<u8> = (0..65536).map(|i| (i % 256) as u8).collect();

    common::mount_download(&server, "drive-001", "large-001", &content).await;

    let item = item_without_download_ref("large-001");

    let mut stream = client.open(&target, &item).await.expect("open failed");
    let mut buf = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut buf)
        .await
        .expect("reading stream failed");

    assert_eq!(buf, content);
}

#[tokio::test]
async fn test_open_returns_error_on_404() {
    let server = MockServer::start().await;
    let client = common::client_against(&server);
    let target = target("drive-001");

    Mock::given(method("GET"))
        .and(path("/drives/drive-001/items/missing/content"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let item = item_without_download_ref("missing");

    let result = client.open(&target, &item).await;
    assert!(result.is_err());
}
