//! Sync engine
//!
//! [`SyncEngine`] is the top-level orchestrator: for each configured job,
//! it resolves the job's destination, walks each named source's targets
//! through Discovery (the source's `list_drives`, filtered by the
//! source's allow-list), runs one [`WorkerPool`] per target, and persists
//! checkpoints as targets and sources complete.
//!
//! This module holds no concrete adapter. The caller (the CLI) wires a
//! [`SourceClient`] per configured source name and a [`Blob`] per
//! configured destination name into [`SyncEngine::new`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use backup_core::config::{Config, DestinationConfig, JobConfig, SourceConfig, SourceKind, UserFilter};
use backup_core::domain::{BackupStats, DeltaCursor, DriveKind, DriveTarget, SourceCheckpoint};
use backup_core::ports::{Blob, SourceClient};
use chrono::Utc;
use tracing::{info, warn};

use crate::checkpoint;
use crate::walker::DeltaWalker;
use crate::worker_pool::{PoolConfig, WorkerPool};

fn source_drive_kind(kind: SourceKind) -> DriveKind {
    match kind {
        SourceKind::Personal => DriveKind::Personal,
        SourceKind::Team => DriveKind::Team,
    }
}

fn target_allowed(target: &DriveTarget, filter: &UserFilter) -> bool {
    match filter {
        UserFilter::All(_) => true,
        UserFilter::List(names) => names.iter().any(|name| {
            name.eq_ignore_ascii_case(&target.display_name) || name.eq_ignore_ascii_case(target.id.as_str())
        }),
    }
}

/// Top-level orchestrator over one loaded [`Config`].
pub struct SyncEngine {
    config: Config,
    sources: HashMap<String, Arc<dyn SourceClient>>,
    destinations: HashMap<String, Arc<dyn Blob>>,
}

impl SyncEngine {
    /// Construct an engine over a validated config and its wired
    /// collaborators. `sources`/`destinations` are keyed by the `name`
    /// fields of [`SourceConfig`]/[`DestinationConfig`].
    #[must_use]
    pub fn new(
        config: Config,
        sources: HashMap<String, Arc<dyn SourceClient>>,
        destinations: HashMap<String, Arc<dyn Blob>>,
    ) -> Self {
        Self {
            config,
            sources,
            destinations,
        }
    }

    /// Run every enabled job, aggregating statistics across all of them.
    pub async fn run_all_enabled(&self) -> Result<BackupStats> {
        let mut stats = BackupStats::default();
        let job_names: Vec<String> = self
            .config
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| job.enabled)
            .map(|(i, _)| job_label(i))
            .collect();
        for name in job_names {
            let job_stats = self.run_job(&name).await?;
            stats.merge(&job_stats);
        }
        Ok(stats)
    }

    /// Run a single job, identified by its positional label (`job-0`,
    /// `job-1`, ...) since [`JobConfig`] carries no name of its own.
    #[tracing::instrument(skip(self), fields(job = %job_name))]
    pub async fn run_job(&self, job_name: &str) -> Result<BackupStats> {
        let index = job_index(job_name)?;
        let job = self
            .config
            .jobs
            .get(index)
            .ok_or_else(|| anyhow!("no such job: {job_name}"))?;

        if !job.enabled {
            info!(job = job_name, "job disabled, skipping");
            return Ok(BackupStats::default());
        }

        let dest_config = self.find_destination(&job.destination)?;
        let destination = self
            .destinations
            .get(&job.destination)
            .ok_or_else(|| anyhow!("no destination wired for '{}'", job.destination))?;

        let mut stats = BackupStats::default();
        for source_name in &job.sources {
            let source_stats = self
                .run_source(source_name, job, dest_config, destination.as_ref())
                .await?;
            stats.merge(&source_stats);
        }
        Ok(stats)
    }

    async fn run_source(
        &self,
        source_name: &str,
        job: &JobConfig,
        dest_config: &DestinationConfig,
        destination: &dyn Blob,
    ) -> Result<BackupStats> {
        let source_config = self.find_source(source_name)?;
        let source_client = self
            .sources
            .get(source_name)
            .ok_or_else(|| anyhow!("no source client wired for '{source_name}'"))?;

        let kind = source_drive_kind(source_config.kind);
        let targets = source_client
            .list_drives(kind)
            .await
            .with_context(|| format!("listing drives for source '{source_name}'"))?;

        let mut stats = BackupStats::default();
        let mut any_uploaded = false;

        for target in targets {
            if !target_allowed(&target, &source_config.users) {
                continue;
            }

            let target_stats = self
                .run_target(source_name, job, dest_config, destination, source_client, &target)
                .await;
            if target_stats.files_uploaded > 0 {
                any_uploaded = true;
            }
            stats.merge(&target_stats);
        }

        if any_uploaded {
            let checkpoint = SourceCheckpoint {
                source_name: source_name.to_string(),
                last_backup_time: Utc::now(),
                stats,
            };
            checkpoint::save_source_checkpoint(destination, &checkpoint).await?;
            Ok(checkpoint.stats)
        } else {
            Ok(stats)
        }
    }

    async fn run_target(
        &self,
        source_name: &str,
        job: &JobConfig,
        dest_config: &DestinationConfig,
        destination: &dyn Blob,
        source_client: &Arc<dyn SourceClient>,
        target: &DriveTarget,
    ) -> BackupStats {
        let cursor = match checkpoint::load_delta_cursor(destination, source_name, target.id.as_str()).await {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!(target = target.id.as_str(), error = %e, "failed to load delta cursor, treating as fresh");
                None
            }
        };

        let walker = DeltaWalker::new(Arc::clone(source_client));
        let pool_config = PoolConfig {
            workers: self.config.concurrency.max_parallel_workers,
            dry_run: job.dry_run,
            storage_class: Some(dest_config.storage_class.clone()),
        };
        // WorkerPool needs an owned `Arc<dyn Blob>`; the engine's map already
        // holds one per destination name, so the caller is expected to have
        // wired the same Arc it passed as `destination` here. We clone it
        // from the map rather than constructing a new Arc from a reference.
        let blob = match self.destinations.get(&job.destination) {
            Some(blob) => Arc::clone(blob),
            None => {
                warn!(destination = job.destination.as_str(), "destination vanished mid-run");
                return BackupStats::default();
            }
        };

        let pool = WorkerPool::new(Arc::clone(source_client), blob, pool_config);
        let outcome = pool.run(&walker, target, cursor.clone()).await;

        if outcome.clean {
            if let Some(new_cursor) = outcome.new_cursor {
                let next = DeltaCursor {
                    owner_id: Some(target.id.as_str().to_string()),
                    delta_token: new_cursor,
                    last_backup_time: cursor.map(|c| c.last_backup_time).unwrap_or_else(Utc::now),
                    last_updated: Utc::now(),
                };
                if let Err(e) = checkpoint::save_delta_cursor(destination, source_name, target.id.as_str(), &next).await {
                    warn!(target = target.id.as_str(), error = %e, "failed to persist delta cursor");
                }
            }
        } else {
            warn!(target = target.id.as_str(), "target did not complete cleanly, cursor not advanced");
        }

        outcome.stats
    }

    fn find_source(&self, name: &str) -> Result<&SourceConfig> {
        self.config
            .sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| anyhow!("no such source configured: {name}"))
    }

    fn find_destination(&self, name: &str) -> Result<&DestinationConfig> {
        self.config
            .destinations
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| anyhow!("no such destination configured: {name}"))
    }
}

fn job_label(index: usize) -> String {
    format!("job-{index}")
}

fn job_index(label: &str) -> Result<usize> {
    label
        .strip_prefix("job-")
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| anyhow!("invalid job label: {label}"))
}
