//! Delta walker
//!
//! Drives one drive target's delta/change-tracking query to completion,
//! emitting a [`FileChange`] wrapped in [`crate::worker_pool::WorkItem`]
//! per observed file onto a bounded channel.
//!
//! ## States
//!
//! - **Fresh** - no prior cursor; starts a `/delta` query at the drive
//!   root.
//! - **Resume** - a prior [`DeltaCursor`] exists; the walk continues from
//!   its token.
//! - **Paging** - follows `next_link` across pages until a page carries a
//!   terminal `delta_link`.
//! - **Fallback** - the resume cursor was rejected as expired. Recursively
//!   lists the drive from the root, emitting files modified after the
//!   cursor's `last_backup_time`, then performs one fresh `/delta` fetch
//!   purely to obtain a new durable cursor (items on that fetch are not
//!   re-emitted, since the recursive listing already covered them).
//!
//! The walk never persists anything itself; it only reports the terminal
//! token (or an error) back to its caller, which decides whether to
//! persist it.

use std::sync::Arc;

use backup_core::domain::{DeltaCursor, DeltaToken, DriveTarget, FileChange, FullPath, ItemId, SyncError};
use backup_core::ports::{DeltaPage, Item, SourceClient};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::worker_pool::WorkItem;

/// Default depth limit for the recursive fallback walk.
pub const DEFAULT_MAX_FALLBACK_DEPTH: usize = 10;

/// Outcome of a completed (or aborted) walk.
#[derive(Debug)]
pub struct WalkOutcome {
    /// The new durable cursor, set only when the walk reached a terminal
    /// `delta_link` without error.
    pub new_cursor: Option<DeltaToken>,
    /// The error that aborted the walk, if any.
    pub error: Option<SyncError>,
}

/// Drives the delta/change-tracking query for a single drive target.
pub struct DeltaWalker {
    source: Arc<dyn SourceClient>,
    max_fallback_depth: usize,
}

impl DeltaWalker {
    /// Construct a walker with the default fallback depth.
    #[must_use]
    pub fn new(source: Arc<dyn SourceClient>) -> Self {
        Self {
            source,
            max_fallback_depth: DEFAULT_MAX_FALLBACK_DEPTH,
        }
    }

    /// Construct a walker with a custom fallback depth limit.
    #[must_use]
    pub fn with_max_fallback_depth(source: Arc<dyn SourceClient>, max_fallback_depth: usize) -> Self {
        Self {
            source,
            max_fallback_depth,
        }
    }

    /// Run the walk to completion, sending every observed file onto `tx`.
    ///
    /// `cursor` is `None` for a fresh sync, `Some` to resume from a prior
    /// checkpoint. The channel's receiver side is expected to be a
    /// [`crate::worker_pool::WorkerPool`]; this function does not signal
    /// shutdown on `tx` — that is the caller's responsibility once the
    /// walk returns.
    pub async fn run(&self, target: &DriveTarget, cursor: Option<DeltaCursor>, tx: mpsc::Sender<WorkItem>) -> WalkOutcome {
        let result = match cursor {
            None => {
                debug!(target = target.id.as_str(), "starting fresh delta walk");
                self.page(target, None, true, &tx).await
            }
            Some(ref resume) => {
                debug!(target = target.id.as_str(), "resuming delta walk from cursor");
                match self.page(target, Some(resume.delta_token.as_str()), true, &tx).await {
                    Err(SyncError::DeltaExpired(_)) => {
                        info!(target = target.id.as_str(), "delta cursor expired, falling back to full listing");
                        self.fallback(target, resume, &tx).await
                    }
                    other => other,
                }
            }
        };

        match result {
            Ok(token) => WalkOutcome {
                new_cursor: Some(token),
                error: None,
            },
            Err(error) => WalkOutcome {
                new_cursor: None,
                error: Some(error),
            },
        }
    }

    /// Follow one delta query (and its pagination) to a terminal
    /// `delta_link`, emitting items along the way when `emit` is true.
    async fn page(
        &self,
        target: &DriveTarget,
        start_cursor: Option<&str>,
        emit: bool,
        tx: &mpsc::Sender<WorkItem>,
    ) -> Result<DeltaToken, SyncError> {
        let mut cursor = start_cursor.map(str::to_string);
        loop {
            let page: DeltaPage = self
                .source
                .delta(target, cursor.as_deref())
                .await
                .map_err(classify)?;

            if emit {
                for item in page.items {
                    self.emit_item(target, item, tx).await;
                }
            }

            if let Some(next_link) = page.next_link {
                cursor = Some(next_link);
                continue;
            }
            if let Some(delta_link) = page.delta_link {
                return DeltaToken::new(delta_link)
                    .map_err(|e| SyncError::SourceUnavailable(format!("invalid delta link: {e}")));
            }
            return Err(SyncError::SourceUnavailable(
                "delta page carried neither next_link nor delta_link".to_string(),
            ));
        }
    }

    /// Recursive full-listing fallback after a 410, then a fresh `/delta`
    /// fetch (unemitted) to re-establish a durable cursor.
    async fn fallback(
        &self,
        target: &DriveTarget,
        expired: &DeltaCursor,
        tx: &mpsc::Sender<WorkItem>,
    ) -> Result<DeltaToken, SyncError> {
        let root = ItemId::new("root".to_string()).expect("\"root\" is always a valid item id");
        self.walk_folder(target, root, expired.last_backup_time, 0, tx).await?;
        self.page(target, None, false, tx).await
    }

    fn walk_folder<'a>(
        &'a self,
        target: &'a DriveTarget,
        folder_id: ItemId,
        since: DateTime<Utc>,
        depth: usize,
        tx: &'a mpsc::Sender<WorkItem>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), SyncError>> + Send + 'a>> {
        Box::pin(async move {
            if depth > self.max_fallback_depth {
                warn!(
                    target = target.id.as_str(),
                    folder = folder_id.as_str(),
                    depth,
                    "fallback walk hit max depth, not descending further"
                );
                return Ok(());
            }

            let children = self.children_with_fallback(target, &folder_id, since).await?;

            for item in children {
                if item.is_deleted {
                    continue;
                }
                if item.is_folder {
                    self.walk_folder(target, item.id, since, depth + 1, tx).await?;
                } else if item.modified_time > since {
                    self.emit_item(target, item, tx).await;
                }
            }

            Ok(())
        })
    }

    /// List a folder's children, attempting the server-side
    /// `modified_after` filter first and falling back to an unfiltered
    /// listing (with client-side filtering done by the caller) if the
    /// source rejects it.
    async fn children_with_fallback(
        &self,
        target: &DriveTarget,
        folder_id: &ItemId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Item>, SyncError> {
        match self.source.children(target, folder_id, Some(since)).await {
            Ok(items) => Ok(items),
            Err(e) => match e.downcast::<SyncError>() {
                Ok(SyncError::FilterUnsupported(_)) => {
                    debug!(folder = folder_id.as_str(), "server-side $filter unsupported, listing unfiltered");
                    self.source
                        .children(target, folder_id, None)
                        .await
                        .map_err(classify)
                }
                Ok(other) => Err(other),
                Err(e) => Err(SyncError::SourceUnavailable(e.to_string())),
            },
        }
    }

    async fn emit_item(&self, target: &DriveTarget, item: Item, tx: &mpsc::Sender<WorkItem>) {
        if item.is_deleted || item.is_folder {
            return;
        }

        let full_path = match FullPath::build(&target.path_prefix, &item.parent_path, &item.name) {
            Ok(path) => path,
            Err(e) => {
                warn!(item_id = item.id.as_str(), error = %e, "skipping item with unbuildable path");
                return;
            }
        };

        let change = FileChange {
            item_id: item.id,
            name: item.name,
            full_path,
            size: item.size,
            modified_time: item.modified_time,
            mime_type: item.mime_type,
            download_ref: item.download_ref,
        };

        if tx.send(WorkItem::Change(change)).await.is_err() {
            debug!("worker pool receiver dropped, walker stopping early");
        }
    }
}

/// Classify an adapter-level `anyhow::Error` back into the domain's
/// `SyncError` taxonomy, falling back to `SourceUnavailable` for anything
/// the adapter didn't already tag.
fn classify(e: anyhow::Error) -> SyncError {
    match e.downcast::<SyncError>() {
        Ok(sync_error) => sync_error,
        Err(e) => SyncError::SourceUnavailable(e.to_string()),
    }
}
