//! Worker pool
//!
//! Consumes a [`DeltaWalker`]'s output over a bounded channel and turns
//! each file into a skip-check-then-upload pipeline against a [`Blob`]
//! destination. Shutdown is explicit: once the walker finishes producing,
//! the caller enqueues [`WorkItem::Shutdown`] once per worker so every
//! worker observes a sentinel rather than relying on the channel closing.

use std::collections::HashMap;
use std::sync::Arc;

use backup_core::domain::{BackupStats, DeltaCursor, DeltaToken, DriveTarget, FileChange, SyncError};
use backup_core::ports::{Blob, HeadResult, Item, SourceClient};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::walker::DeltaWalker;

/// One unit handed from the walker to the worker pool.
#[derive(Debug)]
pub enum WorkItem {
    /// A file observed during the walk.
    Change(FileChange),
    /// Sentinel: this worker should stop pulling from the channel.
    Shutdown,
}

/// Tunables for a single [`WorkerPool::run`] invocation.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent upload workers.
    pub workers: usize,
    /// When true, skip-check but never call `put`.
    pub dry_run: bool,
    /// Destination storage class passed through to `Blob::put`, if any.
    pub storage_class: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            dry_run: false,
            storage_class: None,
        }
    }
}

/// Result of running a target through the pool to completion.
#[derive(Debug)]
pub struct PoolOutcome {
    /// Aggregated counters across every worker.
    pub stats: BackupStats,
    /// New delta cursor, set only when the walk was clean.
    pub new_cursor: Option<DeltaToken>,
    /// True when the walk produced no error and every worker returned
    /// without panicking. Callers should only persist `new_cursor` when
    /// this is true.
    pub clean: bool,
}

/// Bounded producer/consumer pipeline between a [`DeltaWalker`] and a
/// [`Blob`] destination.
pub struct WorkerPool {
    source: Arc<dyn SourceClient>,
    blob: Arc<dyn Blob>,
    config: PoolConfig,
}

impl WorkerPool {
    /// Construct a pool over the given source and destination.
    #[must_use]
    pub fn new(source: Arc<dyn SourceClient>, blob: Arc<dyn Blob>, config: PoolConfig) -> Self {
        Self { source, blob, config }
    }

    /// Walk `target` to completion, feeding every observed file through
    /// `self.config.workers` concurrent upload workers.
    pub async fn run(&self, walker: &DeltaWalker, target: &DriveTarget, cursor: Option<DeltaCursor>) -> PoolOutcome {
        let workers = self.config.workers.max(1);
        let (tx, rx) = mpsc::channel(workers * 2);
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let rx = Arc::clone(&rx);
            let source = Arc::clone(&self.source);
            let blob = Arc::clone(&self.blob);
            let config = self.config.clone();
            let target = target.clone();
            handles.push(tokio::spawn(async move {
                run_worker(worker_id, rx, source, blob, config, target).await
            }));
        }

        let walk_outcome = walker.run(target, cursor, tx.clone()).await;

        for _ in 0..workers {
            // Best-effort: if every worker has already exited on a fatal
            // error the channel is closed and the send fails harmlessly.
            let _ = tx.send(WorkItem::Shutdown).await;
        }
        drop(tx);

        let mut stats = BackupStats::default();
        let mut worker_ok = true;
        for handle in handles {
            match handle.await {
                Ok(worker_stats) => stats.merge(&worker_stats),
                Err(e) => {
                    warn!(error = %e, "worker task panicked");
                    worker_ok = false;
                }
            }
        }

        let clean = worker_ok && walk_outcome.error.is_none();
        PoolOutcome {
            stats,
            new_cursor: if clean { walk_outcome.new_cursor } else { None },
            clean,
        }
    }
}

/// One worker's pull loop: pop [`WorkItem`]s until a [`WorkItem::Shutdown`]
/// sentinel, running the per-file pipeline for each [`WorkItem::Change`].
async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    source: Arc<dyn SourceClient>,
    blob: Arc<dyn Blob>,
    config: PoolConfig,
    target: DriveTarget,
) -> BackupStats {
    let mut stats = BackupStats::default();
    loop {
        let item = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        match item {
            None | Some(WorkItem::Shutdown) => break,
            Some(WorkItem::Change(change)) => {
                process_change(worker_id, &source, &blob, &config, &target, change, &mut stats).await;
            }
        }
    }
    stats
}

async fn process_change(
    worker_id: usize,
    source: &Arc<dyn SourceClient>,
    blob: &Arc<dyn Blob>,
    config: &PoolConfig,
    target: &DriveTarget,
    change: FileChange,
    stats: &mut BackupStats,
) {
    stats.files_processed += 1;
    let key = change.full_path.as_str().to_string();

    match blob.head(&key).await {
        Ok(HeadResult::Present { metadata, .. }) => {
            if metadata.get("source-modified-time").map(String::as_str) == Some(change.modified_time_rfc3339().as_str()) {
                debug!(worker_id, key = %key, "unchanged, skipping");
                stats.files_skipped += 1;
                return;
            }
        }
        Ok(HeadResult::Absent) => {}
        Err(e) => {
            warn!(worker_id, key = %key, error = %e, "head failed, attempting upload anyway");
        }
    }

    if config.dry_run {
        info!(worker_id, key = %key, "dry run, not uploading");
        stats.files_uploaded += 1;
        stats.bytes_transferred += change.size;
        return;
    }

    if let Err(e) = upload(source, blob, config, target, &change, &key).await {
        warn!(worker_id, key = %key, error = %e, "upload failed");
        stats.errors += 1;
        return;
    }

    stats.files_uploaded += 1;
    stats.bytes_transferred += change.size;
}

async fn upload(
    source: &Arc<dyn SourceClient>,
    blob: &Arc<dyn Blob>,
    config: &PoolConfig,
    target: &DriveTarget,
    change: &FileChange,
    key: &str,
) -> anyhow::Result<()> {
    let item = item_from_change(change);
    let body = source.open(target, &item).await.map_err(classify)?;

    let mut metadata = HashMap::new();
    metadata.insert("source-modified-time".to_string(), change.modified_time_rfc3339());
    metadata.insert(
        "original-path-encoded".to_string(),
        base64_encode(change.full_path.as_str()),
    );
    metadata.insert("source".to_string(), "onedrive-backup".to_string());
    metadata.insert("encoding".to_string(), "base64-utf8".to_string());

    let content_type = change.mime_type.as_deref().unwrap_or("application/octet-stream");

    blob.put(
        key,
        body,
        change.size,
        content_type,
        metadata,
        config.storage_class.as_deref(),
    )
    .await
    .map_err(|e| SyncError::DestinationError(e.to_string()).into())
}

/// Reconstruct the minimal [`Item`] that [`SourceClient::open`] actually
/// reads (`id` and `download_ref`). The remaining fields are irrelevant to
/// `open`'s behavior and are filled with harmless defaults.
fn item_from_change(change: &FileChange) -> Item {
    Item {
        id: change.item_id.clone(),
        name: change.name.clone(),
        size: change.size,
        modified_time: change.modified_time,
        mime_type: change.mime_type.clone(),
        is_deleted: false,
        is_folder: false,
        parent_path: String::new(),
        parent_drive_id: None,
        download_ref: change.download_ref.clone(),
    }
}

fn classify(e: anyhow::Error) -> anyhow::Error {
    match e.downcast::<SyncError>() {
        Ok(sync_error) => sync_error.into(),
        Err(e) => SyncError::SourceUnavailable(e.to_string()).into(),
    }
}

fn base64_encode(s: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use backup_core::domain::{DriveId, DriveKind, FullPath, ItemId};
    use backup_core::ports::source_client::BodyStream;
    use backup_core::ports::DeltaPage;
    use chrono::Utc;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncRead;

    struct FakeSource {
        opens: AtomicUsize,
    }

    #[async_trait]
    impl SourceClient for FakeSource {
        async fn list_drives(&self, _kind: DriveKind) -> anyhow::Result<Vec<DriveTarget>> {
            unimplemented!()
        }

        async fn delta(&self, _target: &DriveTarget, _cursor: Option<&str>) -> anyhow::Result<DeltaPage> {
            Ok(DeltaPage {
                items: Vec::new(),
                next_link: None,
                delta_link: Some("https://example/delta?token=done".to_string()),
            })
        }

        async fn children(
            &self,
            _target: &DriveTarget,
            _folder_id: &ItemId,
            _modified_after: Option<chrono::DateTime<Utc>>,
        ) -> anyhow::Result<Vec<Item>> {
            Ok(Vec::new())
        }

        async fn get_item(&self, _target: &DriveTarget, _item_id: &ItemId) -> anyhow::Result<Item> {
            unimplemented!()
        }

        async fn open(&self, _target: &DriveTarget, _item: &Item) -> anyhow::Result<BodyStream> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let cursor = std::io::Cursor::new(b"hello".to_vec());
            Ok(Box::pin(cursor) as Pin<Box<dyn AsyncRead + Send>>)
        }
    }

    #[derive(Default)]
    struct FakeBlob {
        puts: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Blob for FakeBlob {
        async fn head(&self, _key: &str) -> anyhow::Result<HeadResult> {
            Ok(HeadResult::Absent)
        }

        async fn put(
            &self,
            key: &str,
            _body: backup_core::ports::blob::BodyStream,
            _size: u64,
            _content_type: &str,
            _metadata: HashMap<String, String>,
            _storage_class: Option<&str>,
        ) -> anyhow::Result<()> {
            self.puts.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn put_json(&self, _key: &str, _value: &serde_json::Value) -> anyhow::Result<()> {
            Ok(())
        }

        async fn get_json(&self, _key: &str) -> anyhow::Result<Option<serde_json::Value>> {
            Ok(None)
        }
    }

    fn target() -> DriveTarget {
        DriveTarget::new(
            DriveId::new("drive-1".to_string()).unwrap(),
            "Alice".to_string(),
            DriveKind::Personal,
            "alice".to_string(),
        )
    }

    #[tokio::test]
    async fn test_empty_walk_is_clean_with_no_uploads() {
        let source: Arc<dyn SourceClient> = Arc::new(FakeSource { opens: AtomicUsize::new(0) });
        let blob: Arc<dyn Blob> = Arc::new(FakeBlob::default());
        let walker = DeltaWalker::new(Arc::clone(&source));
        let pool = WorkerPool::new(source, blob, PoolConfig { workers: 4, ..Default::default() });

        let outcome = pool.run(&walker, &target(), None).await;

        assert!(outcome.clean);
        assert_eq!(outcome.stats.files_uploaded, 0);
        assert_eq!(outcome.new_cursor.unwrap().as_str(), "https://example/delta?token=done");
    }

    #[test]
    fn test_item_from_change_keeps_open_relevant_fields() {
        let change = FileChange {
            item_id: ItemId::new("f1".to_string()).unwrap(),
            name: "a.txt".to_string(),
            full_path: FullPath::new("alice/a.txt".to_string()).unwrap(),
            size: 5,
            modified_time: Utc::now(),
            mime_type: Some("text/plain".to_string()),
            download_ref: Some("https://example/content".to_string()),
        };
        let item = item_from_change(&change);
        assert_eq!(item.id.as_str(), "f1");
        assert_eq!(item.download_ref.as_deref(), Some("https://example/content"));
        assert!(!item.is_folder);
        assert!(!item.is_deleted);
    }
}
