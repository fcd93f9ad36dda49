//! Persisted checkpoint records.
//!
//! `DeltaCursor` and `SourceCheckpoint` are the two JSON document shapes the
//! Checkpoint component reads and writes through the `Blob` port. Both are
//! plain data: validation of their contents lives at the newtype level
//! (`DeltaToken`), not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::DeltaToken;

/// Per-drive cursor: a delta token plus the timestamp of the backup run
/// that produced it. Created on the first successful walk of a target;
/// updated only when a walk reaches a "no more pages" terminal state;
/// never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaCursor {
    /// Identifier of the drive this cursor belongs to (user id or drive id,
    /// mirroring the field the source associates the cursor with).
    #[serde(rename = "user_id_or_drive_id", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// The opaque delta token (or delta link URL).
    pub delta_token: DeltaToken,
    /// UTC time of the backup run that produced this token.
    pub last_backup_time: DateTime<Utc>,
    /// UTC time this checkpoint document was written.
    pub last_updated: DateTime<Utc>,
}

/// Per-source checkpoint: written only after a source completes a run with
/// at least one successful upload across all of its targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCheckpoint {
    /// Name of the source this checkpoint belongs to.
    pub source_name: String,
    /// UTC time of the most recent run that uploaded at least one file.
    pub last_backup_time: DateTime<Utc>,
    /// Aggregate counters from that run.
    pub stats: BackupStats,
}

/// Aggregate counters for a single run, merged only at target/source join
/// points — never touched concurrently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupStats {
    /// Files the worker pool examined (uploaded + skipped + errored).
    pub files_processed: u64,
    /// Files actually uploaded.
    pub files_uploaded: u64,
    /// Files skipped because the destination already had a matching copy.
    pub files_skipped: u64,
    /// Total bytes streamed to the destination.
    pub bytes_transferred: u64,
    /// Count of per-file errors recorded against the target.
    pub errors: u64,
}

impl BackupStats {
    /// Merge another run's counters into this one.
    pub fn merge(&mut self, other: &BackupStats) {
        self.files_processed += other.files_processed;
        self.files_uploaded += other.files_uploaded;
        self.files_skipped += other.files_skipped;
        self.bytes_transferred += other.bytes_transferred;
        self.errors += other.errors;
    }
}
