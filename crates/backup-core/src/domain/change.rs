//! `FileChange` — the record produced by DeltaWalker and consumed by exactly
//! one worker, then discarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{FullPath, ItemId};

/// A single file observed by the DeltaWalker, ready for the WorkerPool.
///
/// `full_path` is POSIX-style, rooted at the target's `path_prefix`, and
/// never carries a leading `/`. `modified_time` compares lexicographically
/// against other RFC3339 UTC timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Source-assigned item id.
    pub item_id: ItemId,
    /// File name (last path component).
    pub name: String,
    /// Full destination-relative path.
    pub full_path: FullPath,
    /// Size in bytes as reported by the source.
    pub size: u64,
    /// Last-modified timestamp, RFC3339 UTC.
    pub modified_time: DateTime<Utc>,
    /// MIME type, if the source reported one.
    pub mime_type: Option<String>,
    /// Download reference (URL or opaque token); may be absent if the
    /// delta page didn't include one, in which case the walker synthesizes
    /// one from the drive id and item id.
    pub download_ref: Option<String>,
}

impl FileChange {
    /// RFC3339 UTC string form of `modified_time`, the exact value stored
    /// in the destination object's `source-modified-time` metadata.
    #[must_use]
    pub fn modified_time_rfc3339(&self) -> String {
        self.modified_time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}
