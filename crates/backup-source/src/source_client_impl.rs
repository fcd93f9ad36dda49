//! [`SourceClient`] implementation over the source REST API
//!
//! Wraps [`SourceHttpClient`] (transport, retry, auth) with the
//! delta/discovery parsing modules to produce the port-level types
//! `backup-engine` depends on.

use std::sync::Arc;

use async_trait::async_trait;
use backup_core::domain::{DriveId, DriveKind, DriveTarget, ItemId};
use backup_core::ports::source_client::{BodyStream, DeltaPage, Item};
use backup_core::ports::SourceClient;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use crate::client::SourceHttpClient;
use crate::delta;
use crate::discovery;

/// Adapter implementing [`SourceClient`] against the Graph-style source
/// REST surface.
pub struct GraphSourceClient {
    client: Arc<SourceHttpClient>,
}

impl GraphSourceClient {
    /// Wrap an already-constructed HTTP client.
    pub fn new(client: Arc<SourceHttpClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildrenResponse {
    #[serde(default)]
    value: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    id: String,
    #[serde(default)]
    name: String,
    size: Option<u64>,
    last_modified_date_time: Option<DateTime<Utc>>,
    #[serde(default, rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
    parent_reference: Option<RawParentReference>,
    file: Option<RawFileFacet>,
    folder: Option<RawFolderFacet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParentReference {
    drive_id: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFileFacet {
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFolderFacet {}

fn raw_into_item(raw: RawItem) -> anyhow::Result<Item> {
    Ok(Item {
        id: ItemId::new(raw.id)?,
        name: raw.name,
        size: raw.size.unwrap_or(0),
        modified_time: raw
            .last_modified_date_time
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap()),
        mime_type: raw.file.as_ref().and_then(|f| f.mime_type.clone()),
        is_deleted: false,
        is_folder: raw.folder.is_some(),
        parent_path: raw
            .parent_reference
            .as_ref()
            .and_then(|pr| pr.path.clone())
            .map(|p| p.strip_prefix("/drive/root:").unwrap_or(&p).to_string())
            .unwrap_or_default(),
        parent_drive_id: raw
            .parent_reference
            .as_ref()
            .and_then(|pr| pr.drive_id.clone())
            .and_then(|id| DriveId::new(id).ok()),
        download_ref: raw.download_url,
    })
}

#[async_trait]
impl SourceClient for GraphSourceClient {
    async fn list_drives(&self, kind: DriveKind) -> anyhow::Result<Vec<DriveTarget>> {
        match kind {
            DriveKind::Personal => discovery::list_personal_drives(&self.client).await,
            DriveKind::Team => discovery::list_team_drives(&self.client).await,
        }
    }

    async fn delta(&self, target: &DriveTarget, cursor: Option<&str>) -> anyhow::Result<DeltaPage> {
        Ok(delta::fetch_delta_page(&self.client, &target.id, cursor).await?)
    }

    async fn children(
        &self,
        target: &DriveTarget,
        folder_id: &ItemId,
        modified_after: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<Item>> {
        let mut path = format!(
            "/drives/{}/items/{}/children",
            target.id.as_str(),
            folder_id.as_str()
        );
        if let Some(ts) = modified_after {
            path.push_str(&format!("?$filter=lastModifiedDateTime ge {}", ts.to_rfc3339()));
        }

        debug!(target = target.id.as_str(), folder_id = folder_id.as_str(), "listing children");

        let response = self
            .client
            .execute_with_retry(reqwest::Method::GET, &path, "metadata")
            .await?;

        let parsed: ChildrenResponse = response.json().await?;
        parsed.value.into_iter().map(raw_into_item).collect()
    }

    async fn get_item(&self, target: &DriveTarget, item_id: &ItemId) -> anyhow::Result<Item> {
        let path = format!("/drives/{}/items/{}", target.id.as_str(), item_id.as_str());
        let response = self
            .client
            .execute_with_retry(reqwest::Method::GET, &path, "metadata")
            .await?;
        let raw: RawItem = response.json().await?;
        raw_into_item(raw)
    }

    async fn open(&self, target: &DriveTarget, item: &Item) -> anyhow::Result<BodyStream> {
        let url = match &item.download_ref {
            Some(url) => url.clone(),
            None => {
                let drive_id = item.parent_drive_id.as_ref().unwrap_or(&target.id);
                warn!(
                    item_id = item.id.as_str(),
                    drive_id = drive_id.as_str(),
                    "no download ref on item, falling back to resource-type URL"
                );
                format!(
                    "{}/drives/{}/items/{}/content",
                    self.client.base_url(),
                    drive_id.as_str(),
                    item.id.as_str()
                )
            }
        };

        let response = self.client.get_raw(&url).await?.error_for_status()?;
        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::pin(StreamReader::new(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_item_parses_file() {
        let json = r#"{
            "id": "item-1",
            "name": "a.txt",
            "size": 10,
            "parentReference": { "path": "/drive/root:/Documents" },
            "file": { "mimeType": "text/plain" }
        }"#;
        let raw: RawItem = serde_json::from_str(json).unwrap();
        let item = raw_into_item(raw).unwrap();
        assert_eq!(item.name, "a.txt");
        assert_eq!(item.parent_path, "/Documents");
        assert!(!item.is_folder);
    }

    #[test]
    fn test_children_response_parses() {
        let json = r#"{"value":[{"id":"c1","name":"x.txt"}]}"#;
        let parsed: ChildrenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.value.len(), 1);
    }
}
