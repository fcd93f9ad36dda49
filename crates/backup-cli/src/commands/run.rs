//! Run command - execute configured backup jobs
//!
//! Loads configuration, wires concrete source/destination adapters for
//! every source and destination the selected job(s) reference, and runs
//! them through a [`backup_engine::SyncEngine`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use backup_core::config::Config;
use backup_engine::SyncEngine;
use clap::Args;
use tracing::info;

use crate::composition::{build_destination, build_source_client};
use crate::output::{get_formatter, OutputFormat};
use crate::ConfigError;

/// Run one or all enabled backup jobs.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Run only this job, addressed as `job-<index>`; all enabled jobs
    /// run when omitted.
    pub job: Option<String>,
}

impl RunCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let config = Config::load(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))
            .map_err(ConfigError::wrap)?;

        let errors = config.validate();
        if !errors.is_empty() {
            for error in &errors {
                formatter.error(&error.to_string());
            }
            return Err(ConfigError::new("configuration is invalid").into());
        }

        let mut sources = HashMap::new();
        for source in &config.sources {
            sources.insert(source.name.clone(), build_source_client(source)?);
        }

        let mut destinations = HashMap::new();
        for destination in &config.destinations {
            destinations.insert(destination.name.clone(), build_destination(destination).await?);
        }

        let engine = SyncEngine::new(config, sources, destinations);

        info!(job = ?self.job, "starting backup run");
        formatter.info("Starting backup run...");

        let stats = match &self.job {
            Some(job_name) => engine.run_job(job_name).await?,
            None => engine.run_all_enabled().await?,
        };

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::json!({
                "files_processed": stats.files_processed,
                "files_uploaded": stats.files_uploaded,
                "files_skipped": stats.files_skipped,
                "bytes_transferred": stats.bytes_transferred,
                "errors": stats.errors,
            });
            formatter.print_json(&json);
        } else if stats.errors == 0 {
            formatter.success(&format!(
                "Backup complete: {} uploaded, {} skipped, {} processed",
                stats.files_uploaded, stats.files_skipped, stats.files_processed
            ));
        } else {
            formatter.error(&format!(
                "Backup finished with {} error(s): {} uploaded, {} skipped, {} processed",
                stats.errors, stats.files_uploaded, stats.files_skipped, stats.files_processed
            ));
        }

        if stats.errors > 0 {
            anyhow::bail!("{} file(s) failed to back up", stats.errors);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_arg_parses_optional_job_name() {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            run: RunCommand,
        }

        let harness = Harness::parse_from(["backup-cli", "job-0"]);
        assert_eq!(harness.run.job.as_deref(), Some("job-0"));

        let harness = Harness::parse_from(["backup-cli"]);
        assert_eq!(harness.run.job, None);
    }
}
