//! Checkpoint persistence
//!
//! Reads and writes the two checkpoint document shapes
//! ([`DeltaCursor`], [`SourceCheckpoint`]) through a [`Blob`]
//! destination, under the reserved `.backup-metadata/` prefix. Never
//! advances the cursor itself — callers decide when a walk is terminal;
//! this module only serializes and persists.

use backup_core::domain::{DeltaCursor, SourceCheckpoint};
use backup_core::ports::Blob;
use tracing::warn;

/// Key of the per-drive delta cursor document.
fn delta_cursor_key(source: &str, target_id: &str) -> String {
    format!(".backup-metadata/{source}_delta_tokens/{target_id}.json")
}

/// Key of the per-source last-backup checkpoint document.
fn last_backup_key(source: &str) -> String {
    format!(".backup-metadata/{source}_last_backup.json")
}

/// Load the delta cursor for a target. Missing or malformed documents are
/// treated as no prior cursor (logged as a warning in the malformed case).
pub async fn load_delta_cursor(
    blob: &dyn Blob,
    source: &str,
    target_id: &str,
) -> anyhow::Result<Option<DeltaCursor>> {
    let key = delta_cursor_key(source, target_id);
    match blob.get_json(&key).await? {
        None => Ok(None),
        Some(value) => match serde_json::from_value::<DeltaCursor>(value) {
            Ok(cursor) => Ok(Some(cursor)),
            Err(e) => {
                warn!(key = %key, error = %e, "malformed delta cursor, treating as absent");
                Ok(None)
            }
        },
    }
}

/// Persist a delta cursor. Callers must only call this once a walk has
/// reached a terminal `delta_link` and the worker pool has fully drained.
pub async fn save_delta_cursor(
    blob: &dyn Blob,
    source: &str,
    target_id: &str,
    cursor: &DeltaCursor,
) -> anyhow::Result<()> {
    let key = delta_cursor_key(source, target_id);
    let value = serde_json::to_value(cursor)?;
    blob.put_json(&key, &value).await
}

/// Load the per-source last-backup checkpoint, if one exists.
pub async fn load_source_checkpoint(
    blob: &dyn Blob,
    source: &str,
) -> anyhow::Result<Option<SourceCheckpoint>> {
    let key = last_backup_key(source);
    match blob.get_json(&key).await? {
        None => Ok(None),
        Some(value) => match serde_json::from_value::<SourceCheckpoint>(value) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(e) => {
                warn!(key = %key, error = %e, "malformed source checkpoint, treating as absent");
                Ok(None)
            }
        },
    }
}

/// Persist a source-level checkpoint. Callers must only call this when at
/// least one upload occurred during the source's run.
pub async fn save_source_checkpoint(
    blob: &dyn Blob,
    checkpoint: &SourceCheckpoint,
) -> anyhow::Result<()> {
    let key = last_backup_key(&checkpoint.source_name);
    let value = serde_json::to_value(checkpoint)?;
    blob.put_json(&key, &value).await
}
