//! Integration tests for delta (incremental sync) queries
//!
//! Verifies end-to-end behavior of `GraphSourceClient::delta` against a
//! wiremock-based mock server:
//! - Initial delta query (no cursor)
//! - Incremental delta query (with cursor)
//! - Empty delta response
//! - Mixed item types (files, folders, deleted)

use backup_core::domain::{DriveId, DriveKind, DriveTarget};
use backup_core::ports::SourceClient;
use wiremock::matchers::{method, path, query_param};
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

#[tokio::test]
async fn test_delta_initial_sync_returns_all_items() {
    let (server, client) = common::setup_client().await;
    let target = target("drive-001");

    let items = serde_json::json!([
        {
            "id": "file-001",
            "name": "document.txt",
            "size": 1024,
            "lastModifiedDateTime": "2026-01-15T10:00:00Z",
            "parentReference": { "driveId": "drive-001", "path": "/drive/root:" },
            "file": { "mimeType": "text/plain" }
        },
        {
            "id": "folder-001",
            "name": "Documents",
            "parentReference": { "driveId": "drive-001", "path": "/drive/root:" },
            "folder": { "childCount": 3 }
        }
    ]);

    common::mount_delta_single_page(&server, "drive-001", items, "initial-token-001").await;

    let page = client
        .delta(&target, None)
        .await
        .expect("initial delta query failed");

    assert_eq!(page.items.len(), 2);
    assert!(page.delta_link.is_some());
    assert!(page.next_link.is_none());

    let file = &page.items[0];
    assert_eq!(file.id.as_str(), "file-001");
    assert_eq!(file.name, "document.txt");
    assert_eq!(file.parent_path, "/");
    assert_eq!(file.size, 1024);
    assert!(!file.is_folder);
    assert!(!file.is_deleted);

    let folder = &page.items[1];
    assert_eq!(folder.id.as_str(), "folder-001");
    assert!(folder.is_folder);
}

#[tokio::test]
async fn test_delta_incremental_with_cursor() {
    let server = MockServer::start().await;
    let target = target("drive-002");

    Mock::given(method("GET"))
        .and(path("/drives/drive-002/root/delta"))
        .and(query_param("token", "previous-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {
                    "id": "file-002",
                    "name": "new-file.txt",
                    "size": 512,
                    "lastModifiedDateTime": "2026-01-16T08:00:00Z",
                    "parentReference": { "driveId": "drive-002", "path": "/drive/root:" },
                    "file": {}
                }
            ],
            "@odata.deltaLink": format!(
                "{}/drives/drive-002/root/delta?token=incremental-token-002",
                server.uri()
            )
        })))
        .mount(&server)
        .await;

    let client = common::client_against(&server);

    let page = client
        .delta(&target, Some("previous-token"))
        .await
        .expect("incremental delta query failed");

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id.as_str(), "file-002");
    assert!(page.delta_link.is_some());
}

#[tokio::test]
async fn test_delta_empty_response() {
    let (server, client) = common::setup_client().await;
    let target = target("drive-003");

    common::mount_delta_single_page(&server, "drive-003", serde_json::json!([]), "empty-token").await;

    let page = client.delta(&target, None).await.expect("empty delta query failed");

    assert_eq!(page.items.len(), 0);
    assert!(page.delta_link.is_some());
}

#[tokio::test]
async fn test_delta_mixed_item_types() {
    let (server, client) = common::setup_client().await;
    let target = target("drive-004");

    let items = serde_json::json!([
        {
            "id": "file-mix",
            "name": "photo.jpg",
            "size": 2048576,
            "lastModifiedDateTime": "2026-01-15T12:00:00Z",
            "parentReference": { "driveId": "drive-004", "path": "/drive/root:/Pictures" },
            "file": { "mimeType": "image/jpeg" }
        },
        {
            "id": "folder-mix",
            "name": "Archive",
            "parentReference": { "driveId": "drive-004", "path": "/drive/root:" },
            "folder": { "childCount": 10 }
        },
        {
            "id": "del-mix",
            "name": "temp.log",
            "deleted": {}
        }
    ]);

    common::mount_delta_single_page(&server, "drive-004", items, "mixed-token").await;

    let page = client.delta(&target, None).await.expect("mixed delta query failed");

    assert_eq!(page.items.len(), 3);
    assert!(!page.items[0].is_deleted);
    assert_eq!(page.items[0].parent_path, "/Pictures");
    assert!(page.items[1].is_folder);
    assert!(page.items[2].is_deleted);
}
