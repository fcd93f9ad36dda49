//! Shared wiremock scaffolding for the backup-source integration suite.
//!
//! Builds a [`GraphSourceClient`] against a local [`MockServer`] so tests
//! exercise the full `SourceClient` surface (auth header, retry policy,
//! response parsing) rather than just the parsing layer in isolation.

use std::sync::Arc;

use async_trait::async_trait;
use backup_core::ports::{AuthError, TokenSource};
use backup_source::client::SourceHttpClient;
use backup_source::source_client_impl::GraphSourceClient;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticTokenSource;

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<String, AuthError> {
        Ok("test-access-token".to_string())
    }

    async fn force_refresh(&self) -> Result<String, AuthError> {
        Ok("test-access-token".to_string())
    }
}

/// Start a mock server and wrap it in a [`GraphSourceClient`] pointed at it.
pub async fn setup_client() -> (MockServer, GraphSourceClient) {
    let server = MockServer::start().await;
    let client = client_against(&server);
    (server, client)
}

/// Build a [`GraphSourceClient`] against an already-running mock server.
pub fn client_against(server: &MockServer) -> GraphSourceClient {
    let http_client = Arc::new(SourceHttpClient::with_base_url(
        Arc::new(StaticTokenSource),
        server.uri(),
    ));
    GraphSourceClient::new(http_client)
}

/// Mount a single-page delta response for the given drive, with a
/// `@odata.deltaLink` cursor for the next cycle.
pub async fn mount_delta_single_page(
    server: &MockServer,
    drive_id: &str,
    items: serde_json::Value,
    delta_token: &str,
) {
    Mock::given(method("GET"))
        .and(path(format!("/drives/{drive_id}/root/delta")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": items,
            "@odata.deltaLink": format!(
                "{}/drives/{drive_id}/root/delta?token={delta_token}",
                server.uri()
            )
        })))
        .mount(server)
        .await;
}

/// Mount `/users` plus a `/users/{id}/drive` lookup for one user.
pub async fn mount_personal_drive(server: &MockServer, user_id: &str, drive_id: &str) {
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{"id": user_id, "displayName": "Test User", "userPrincipalName": format!("{user_id}@example.com")}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/users/{user_id}/drive")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": drive_id})))
        .mount(server)
        .await;
}

/// Mount a download endpoint that returns raw bytes for an item's content.
pub async fn mount_download(server: &MockServer, drive_id: &str, item_id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/drives/{drive_id}/items/{item_id}/content")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}
