//! Source client port (driven/secondary port)
//!
//! Defines the typed wrapper over the source's REST surface that the
//! DeltaWalker and Discovery depend on. Implementations live in the
//! `backup-source` adapter crate.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` for the same reason the cloud provider port did
//!   in the bidirectional predecessor of this system: transport errors are
//!   adapter-specific and classified into [`crate::domain::SyncError`] by
//!   the caller, not by this trait.
//! - `delta` and `children` return one page/listing per call; the walker
//!   drives pagination itself by re-invoking with the page's `next_link`.
//!   This mirrors how the underlying REST API is actually paginated.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::domain::newtypes::{DriveId, ItemId};
use crate::domain::target::{DriveKind, DriveTarget};

/// A body reader returned by [`SourceClient::open`]. Boxed because
/// implementations stream from `reqwest::Response` in practice.
pub type BodyStream = Pin<Box<dyn AsyncRead + Send>>;

/// A raw item as reported by the source, prior to the walker resolving it
/// into a destination-shaped [`crate::domain::FileChange`].
#[derive(Debug, Clone)]
pub struct Item {
    /// Source-assigned item id.
    pub id: ItemId,
    /// File or folder name.
    pub name: String,
    /// Size in bytes (0 for folders).
    pub size: u64,
    /// Last-modified timestamp as reported by the source.
    pub modified_time: DateTime<Utc>,
    /// MIME type, if reported.
    pub mime_type: Option<String>,
    /// True if this item represents a tombstone (deleted on the source).
    pub is_deleted: bool,
    /// True if this item is a folder rather than a file.
    pub is_folder: bool,
    /// Parent path as reported by the source, including any root sentinel
    /// the source prefixes (e.g. `/drive/root:`); the walker strips it.
    pub parent_path: String,
    /// Drive id of the parent reference, when the source includes one.
    /// Authoritative for synthesizing a download URL when `download_ref`
    /// is absent.
    pub parent_drive_id: Option<DriveId>,
    /// Opaque download reference, when the source's delta page included
    /// one directly.
    pub download_ref: Option<String>,
}

/// One page of a delta (or fallback listing) response.
///
/// Exactly one of `next_link` or `delta_link` is set on a terminal page;
/// intermediate pages set `next_link`.
#[derive(Debug, Clone, Default)]
pub struct DeltaPage {
    /// Items on this page (files and folders; deleted items included).
    pub items: Vec<Item>,
    /// Short-lived continuation link. Not durable; never persisted as a
    /// cursor.
    pub next_link: Option<String>,
    /// Durable cursor, present only on the terminal page of a walk.
    pub delta_link: Option<String>,
}

/// Typed wrapper over the source REST surface.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// List the drives of the given kind available to the configured
    /// credentials (subject to Discovery's allow-list, applied by the
    /// caller).
    async fn list_drives(&self, kind: DriveKind) -> anyhow::Result<Vec<DriveTarget>>;

    /// Fetch one delta page. `cursor` is `None` for a fresh `/delta` at
    /// root, or a prior page's `next_link`/`delta_link` to continue or
    /// resume a walk.
    async fn delta(&self, target: &DriveTarget, cursor: Option<&str>) -> anyhow::Result<DeltaPage>;

    /// List the immediate children of a folder, optionally filtered
    /// server-side by `modified_after`. Used by the fallback walk.
    async fn children(
        &self,
        target: &DriveTarget,
        folder_id: &ItemId,
        modified_after: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<Item>>;

    /// Resolve a single item by id, used to fill in a missing download
    /// reference.
    async fn get_item(&self, target: &DriveTarget, item_id: &ItemId) -> anyhow::Result<Item>;

    /// Open a streaming reader over an item's content.
    async fn open(&self, target: &DriveTarget, item: &Item) -> anyhow::Result<BodyStream>;
}
