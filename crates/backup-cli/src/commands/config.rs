//! Config command - View and validate configuration
//!
//! Provides the `backup-cli config` CLI command:
//! 1. Shows the loaded configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors

use std::path::Path;

use anyhow::{Context, Result};
use backup_core::config::Config;
use clap::Subcommand;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};
use crate::ConfigError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the loaded configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(format, config_path).await,
            ConfigCommand::Validate => self.execute_validate(format, config_path).await,
        }
    }

    async fn execute_show(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let config = Config::load(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))
            .map_err(ConfigError::wrap)?;

        info!(config_path = %config_path.display(), "showing configuration");

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::to_value(&config).context("failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config).context("failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    async fn execute_validate(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let config = Config::load(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))
            .map_err(ConfigError::wrap)?;

        info!(config_path = %config_path.display(), "validating configuration");

        let errors = config.validate();

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::json!({
                "valid": errors.is_empty(),
                "errors": errors.iter().map(|e| serde_json::json!({
                    "field": e.field,
                    "message": e.message,
                })).collect::<Vec<_>>(),
            });
            formatter.print_json(&json);
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
        } else {
            formatter.error(&format!("Configuration has {} error(s):", errors.len()));
            for error in &errors {
                formatter.info(&format!("  {error}"));
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError::new("configuration is invalid"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_validate_accepts_well_formed_config() {
        let file = write_config(
            r#"
sources:
  - name: main
    type: personal
destinations:
  - name: cold
    kind: s3
    bucket: backups
jobs:
  - sources: [main]
    destination: cold
concurrency:
  max_parallel_workers: 20
retry:
  attempts: 5
  base_delay_secs: 1
transfer:
  chunk_size_bytes: 8388608
  copy_buffer_bytes: 65536
logging:
  level: info
"#,
        );
        let cmd = ConfigCommand::Validate;
        assert!(cmd.execute(OutputFormat::Json, file.path()).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_rejects_dangling_job_reference() {
        let file = write_config(
            r#"
sources: []
destinations: []
jobs:
  - sources: [missing]
    destination: missing
concurrency:
  max_parallel_workers: 20
retry:
  attempts: 5
  base_delay_secs: 1
transfer:
  chunk_size_bytes: 8388608
  copy_buffer_bytes: 65536
logging:
  level: info
"#,
        );
        let cmd = ConfigCommand::Validate;
        let err = cmd.execute(OutputFormat::Json, file.path()).await.unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[tokio::test]
    async fn test_missing_file_is_a_config_error() {
        let cmd = ConfigCommand::Show;
        let err = cmd
            .execute(OutputFormat::Human, Path::new("/nonexistent/config.yaml"))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
