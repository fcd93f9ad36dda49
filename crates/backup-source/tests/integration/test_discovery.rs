//! Integration tests for drive discovery
//!
//! Verifies `GraphSourceClient::list_drives` against a wiremock-based mock
//! server for both personal and team sources.

use backup_core::domain::DriveKind;
use backup_core::ports::SourceClient;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_list_personal_drives_returns_one_per_provisioned_user() {
    let (server, client) = common::setup_client().await;

    common::mount_personal_drive(&server, "user-1", "drive-1").await;

    let drives = client
        .list_drives(DriveKind::Personal)
        .await
        .expect("listing personal drives failed");

    assert_eq!(drives.len(), 1);
    assert_eq!(drives[0].id.as_str(), "drive-1");
    assert_eq!(drives[0].kind, DriveKind::Personal);
}

#[tokio::test]
async fn test_list_personal_drives_skips_users_without_a_drive() {
    let server = MockServer::start().await;
    let client = common::client_against(&server);

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {"id": "licensed", "userPrincipalName": "licensed@example.com"},
                {"id": "unlicensed", "userPrincipalName": "unlicensed@example.com"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/licensed/drive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "drive-licensed"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/unlicensed/drive"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let drives = client
        .list_drives(DriveKind::Personal)
        .await
        .expect("listing personal drives failed");

    assert_eq!(drives.len(), 1);
    assert_eq!(drives[0].id.as_str(), "drive-licensed");
}

#[tokio::test]
async fn test_list_team_drives_returns_one_per_group() {
    let server = MockServer::start().await;
    let client = common::client_against(&server);

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{"id": "group-1", "displayName": "Engineering"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/groups/group-1/drive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "drive-team-1"})))
        .mount(&server)
        .await;

    let drives = client
        .list_drives(DriveKind::Team)
        .await
        .expect("listing team drives failed");

    assert_eq!(drives.len(), 1);
    assert_eq!(drives[0].id.as_str(), "drive-team-1");
    assert_eq!(drives[0].display_name, "Engineering");
    assert_eq!(drives[0].kind, DriveKind::Team);
}
