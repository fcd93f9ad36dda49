//! Status command - read back checkpoint JSONs from a destination
//!
//! Reports the per-source checkpoint (`{source}_last_backup.json`)
//! written by `SyncEngine` after a source completes a run with at least
//! one upload. Only reads from the destination's `Blob`; no source
//! credentials are required.

use std::path::Path;

use anyhow::{Context, Result};
use backup_core::config::Config;
use backup_engine::checkpoint::load_source_checkpoint;
use clap::Args;
use tracing::info;

use crate::composition::build_destination;
use crate::output::{get_formatter, OutputFormat};
use crate::ConfigError;

/// Show backup status read back from a destination.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Destination to read checkpoints from, matched against
    /// `DestinationConfig::name`.
    pub destination: String,
    /// Restrict the report to a single source name; all configured
    /// sources are reported when omitted.
    pub source: Option<String>,
}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let config = Config::load(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))
            .map_err(ConfigError::wrap)?;

        let dest_config = config
            .destinations
            .iter()
            .find(|d| d.name == self.destination)
            .ok_or_else(|| ConfigError::new(format!("unknown destination {:?}", self.destination)))?;

        let blob = build_destination(dest_config).await?;

        let source_names: Vec<&str> = match &self.source {
            Some(name) => vec![name.as_str()],
            None => config.sources.iter().map(|s| s.name.as_str()).collect(),
        };

        info!(destination = %self.destination, "reading back checkpoints");

        let mut rows = Vec::new();
        for name in source_names {
            let checkpoint = load_source_checkpoint(blob.as_ref(), name).await?;
            rows.push((name.to_string(), checkpoint));
        }

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::json!({
                "destination": self.destination,
                "sources": rows.iter().map(|(name, checkpoint)| match checkpoint {
                    Some(c) => serde_json::json!({
                        "source": name,
                        "last_backup_time": c.last_backup_time.to_rfc3339(),
                        "files_processed": c.stats.files_processed,
                        "files_uploaded": c.stats.files_uploaded,
                        "files_skipped": c.stats.files_skipped,
                        "bytes_transferred": c.stats.bytes_transferred,
                        "errors": c.stats.errors,
                    }),
                    None => serde_json::json!({ "source": name, "last_backup_time": null }),
                }).collect::<Vec<_>>(),
            });
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!("Status for destination {:?}", self.destination));
        formatter.info("");
        formatter.info("Source          Last backup           Uploaded  Skipped  Errors");
        formatter.info("--------------- ---------------------- --------- -------- -------");
        for (name, checkpoint) in &rows {
            match checkpoint {
                Some(c) => formatter.info(&format!(
                    "{:<15} {:<22} {:<9} {:<8} {}",
                    name,
                    c.last_backup_time.format("%Y-%m-%d %H:%M:%S UTC"),
                    c.stats.files_uploaded,
                    c.stats.files_skipped,
                    c.stats.errors,
                )),
                None => formatter.info(&format!("{name:<15} (never backed up)")),
            }
        }

        Ok(())
    }
}
