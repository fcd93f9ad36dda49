//! Delta query parsing for the source REST API
//!
//! Implements the delta query pattern: a single call returns one page of
//! changed items plus either a `next_link` (more pages follow) or a
//! `delta_link` (this was the last page, and the link encodes a cursor for
//! the next sync cycle). Following pagination across pages is the caller's
//! responsibility (the delta walker in `backup-engine`); this module only
//! fetches and parses one page at a time.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use backup_source::client::SourceHttpClient;
//! use backup_source::delta;
//! use backup_core::domain::DriveId;
//!
//! # async fn example(client: SourceHttpClient) -> anyhow::Result<()> {
//! let drive_id = DriveId::new("b!abc123".to_string())?;
//! let page = delta::fetch_delta_page(&client, &drive_id, None).await?;
//! println!("Got {} items", page.items.len());
//! # Ok(())
//! # }
//! ```

use backup_core::domain::{DomainError, DriveId, ItemId, SyncError};
use backup_core::ports::{DeltaPage, Item};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::SourceHttpClient;

/// Build the delta path for the root of a drive.
fn delta_path(drive_id: &DriveId) -> String {
    format!("/drives/{}/root/delta", drive_id.as_str())
}

// ============================================================================
// Source API response types (JSON deserialization)
// ============================================================================

/// Raw response from the delta endpoint.
#[derive(Debug, Deserialize)]
struct GraphDeltaResponse {
    #[serde(default)]
    value: Vec<GraphDriveItem>,

    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,

    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
}

/// A single item as returned by the delta endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDriveItem {
    id: String,
    #[serde(default)]
    name: String,
    size: Option<u64>,
    last_modified_date_time: Option<DateTime<Utc>>,
    #[serde(default, rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
    parent_reference: Option<GraphParentReference>,
    file: Option<GraphFileFacet>,
    folder: Option<GraphFolderFacet>,
    deleted: Option<GraphDeletedFacet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphParentReference {
    drive_id: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphFileFacet {
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphFolderFacet {
    #[allow(dead_code)]
    child_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GraphDeletedFacet {
    #[allow(dead_code)]
    state: Option<String>,
}

// ============================================================================
// DeltaParser - converts raw API responses to port-level types
// ============================================================================

/// Converts the raw JSON-deserialized response into the port-level
/// [`Item`] / [`DeltaPage`] types from `backup-core`.
pub struct DeltaParser;

/// Sentinel used for items the source reports without a modification time
/// (routinely the case for deletion tombstones).
fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is a valid timestamp")
}

impl DeltaParser {
    /// Returns `None` (with a logged warning) if the item id fails
    /// validation; such items are skipped rather than aborting the page.
    fn parse_item(item: GraphDriveItem) -> Option<Item> {
        let id = match ItemId::new(item.id.clone()) {
            Ok(id) => id,
            Err(e) => {
                warn!(raw_id = item.id, error = %e, "skipping item with invalid id");
                return None;
            }
        };

        let is_deleted = item.deleted.is_some();
        let is_folder = item.folder.is_some();

        let mime_type = item.file.as_ref().and_then(|f| f.mime_type.clone());

        let parent_path = item
            .parent_reference
            .as_ref()
            .and_then(|pr| pr.path.as_ref())
            .map(|p| Self::normalize_parent_path(p))
            .unwrap_or_default();

        let parent_drive_id = item
            .parent_reference
            .as_ref()
            .and_then(|pr| pr.drive_id.clone())
            .and_then(|id| DriveId::new(id).ok());

        Some(Item {
            id,
            name: item.name,
            size: item.size.unwrap_or(0),
            modified_time: item.last_modified_date_time.unwrap_or_else(epoch),
            mime_type,
            is_deleted,
            is_folder,
            parent_path,
            parent_drive_id,
            download_ref: item.download_url,
        })
    }

    /// Strip the `/drive/root:` prefix the API uses for the parent path,
    /// leaving a clean path relative to the drive root.
    fn normalize_parent_path(parent_path: &str) -> String {
        if let Some(rest) = parent_path.strip_prefix("/drive/root:") {
            if rest.is_empty() {
                "/".to_string()
            } else {
                rest.to_string()
            }
        } else {
            parent_path.to_string()
        }
    }

    fn parse_page(response: GraphDeltaResponse) -> DeltaPage {
        let items = response
            .value
            .into_iter()
            .filter_map(Self::parse_item)
            .collect();

        DeltaPage {
            items,
            next_link: response.next_link,
            delta_link: response.delta_link,
        }
    }
}

// ============================================================================
// Delta query functions
// ============================================================================

/// Fetch a single delta page.
///
/// `cursor` is either `None` (initial sync), a delta token previously
/// persisted in a checkpoint (resumed sync), or an absolute `next_link`/
/// `delta_link` URL from a prior page (continued pagination within one
/// walk). The caller distinguishes these cases; this function treats any
/// cursor that looks like a URL as absolute and anything else as a bare
/// token appended to the initial delta path.
pub async fn fetch_delta_page(
    client: &SourceHttpClient,
    drive_id: &DriveId,
    cursor: Option<&str>,
) -> Result<DeltaPage, SyncError> {
    let path_or_url = match cursor {
        Some(c) if c.starts_with("http") => c.to_string(),
        Some(token) => format!("{}?token={}", delta_path(drive_id), token),
        None => delta_path(drive_id),
    };

    debug!(drive_id = drive_id.as_str(), has_cursor = cursor.is_some(), "fetching delta page");

    let response = client
        .execute_with_retry(reqwest::Method::GET, &path_or_url, "delta")
        .await?;

    let raw: GraphDeltaResponse = response
        .json()
        .await
        .map_err(|e| SyncError::SourceUnavailable(format!("invalid delta page JSON: {e}")))?;

    Ok(DeltaParser::parse_page(raw))
}

/// Extract the opaque delta token from a `delta_link`/`next_link` URL, for
/// callers that want to persist just the token rather than the full URL.
pub fn extract_delta_token(link: &str) -> Result<backup_core::domain::DeltaToken, DomainError> {
    let token = url::Url::parse(link)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_else(|| link.to_string());
    backup_core::domain::DeltaToken::new(token)
}
