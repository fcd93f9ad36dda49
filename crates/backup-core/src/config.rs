//! Configuration module for the sync engine.
//!
//! Provides typed configuration structs that map to the YAML job
//! description, with loading, validation, and defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sources to read from.
    pub sources: Vec<SourceConfig>,
    /// Destinations to write to.
    pub destinations: Vec<DestinationConfig>,
    /// Jobs binding sources to a destination.
    pub jobs: Vec<JobConfig>,
    /// Worker pool / concurrency settings.
    pub concurrency: ConcurrencyConfig,
    /// HTTP retry settings shared by all source clients.
    pub retry: RetryConfig,
    /// Streaming transfer settings.
    pub transfer: TransferConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// The kind of drives a source exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Personal (one-drive-per-user) drives.
    Personal,
    /// Shared team drives.
    Team,
}

/// Which users' drives a `personal` source should discover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserFilter {
    /// Discover every user's personal drive.
    All(AllUsers),
    /// Discover only the listed emails or drive names (case-insensitive).
    List(Vec<String>),
}

/// Marker type so `UserFilter::All` can round-trip through the literal
/// string `"all"` in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllUsers {
    /// The literal `all` value.
    All,
}

impl Default for UserFilter {
    fn default() -> Self {
        UserFilter::All(AllUsers::All)
    }
}

/// One configured source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Name used to refer to this source from a job.
    pub name: String,
    /// Personal or team.
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// User/drive allow-list for discovery.
    #[serde(default)]
    pub users: UserFilter,
}

/// The kind of object store a destination writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    /// S3-compatible object store.
    S3,
    /// Azure Blob Storage container.
    Azure,
}

/// One configured destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Name used to refer to this destination from a job.
    pub name: String,
    /// S3 or Azure.
    pub kind: DestinationKind,
    /// Bucket name (S3) or container name (Azure).
    pub bucket: String,
    /// Key prefix under which all of this destination's objects live.
    #[serde(default)]
    pub prefix: String,
    /// Region, meaningful for S3 destinations.
    #[serde(default)]
    pub region: Option<String>,
    /// Storage class applied to uploaded objects.
    #[serde(default = "default_storage_class")]
    pub storage_class: String,
}

fn default_storage_class() -> String {
    "GLACIER_IR".to_string()
}

/// A job binds a set of sources to one destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Names of the sources feeding this job, matched against
    /// [`SourceConfig::name`].
    pub sources: Vec<String>,
    /// Name of the destination this job writes to.
    pub destination: String,
    /// Whether the job runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// If true, walk and head-check but never upload.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

/// Worker pool concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Number of workers per target (N in the `2N` queue capacity).
    pub max_parallel_workers: usize,
}

/// HTTP retry / backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts for a retryable call (429/5xx/network).
    pub attempts: u32,
    /// Base delay in seconds; doubled on each retry up to a 60s cap.
    pub base_delay_secs: u64,
}

/// Streaming chunk sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Upload-side chunk size in bytes (resumable session chunking).
    pub chunk_size_bytes: usize,
    /// Copy buffer size in bytes used while streaming source -> destination.
    pub copy_buffer_bytes: usize,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional log file path; stderr is used when absent.
    pub file: Option<std::path::PathBuf>,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_parallel_workers: 20,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay_secs: 1,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: 8 * 1024 * 1024,
            copy_buffer_bytes: 64 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"concurrency.max_parallel_workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.concurrency.max_parallel_workers == 0 {
            errors.push(ValidationError {
                field: "concurrency.max_parallel_workers".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.retry.attempts == 0 {
            errors.push(ValidationError {
                field: "retry.attempts".into(),
                message: "must be greater than 0".into(),
            });
        }
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!("must be one of {VALID_LOG_LEVELS:?}"),
            });
        }

        let source_names: std::collections::HashSet<&str> =
            self.sources.iter().map(|s| s.name.as_str()).collect();
        let destination_names: std::collections::HashSet<&str> =
            self.destinations.iter().map(|d| d.name.as_str()).collect();

        for (idx, job) in self.jobs.iter().enumerate() {
            if !destination_names.contains(job.destination.as_str()) {
                errors.push(ValidationError {
                    field: format!("jobs[{idx}].destination"),
                    message: format!("unknown destination {:?}", job.destination),
                });
            }
            for source in &job.sources {
                if !source_names.contains(source.as_str()) {
                    errors.push(ValidationError {
                        field: format!("jobs[{idx}].sources"),
                        message: format!("unknown source {source:?}"),
                    });
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            sources: vec![SourceConfig {
                name: "main".to_string(),
                kind: SourceKind::Personal,
                users: UserFilter::All(AllUsers::All),
            }],
            destinations: vec![DestinationConfig {
                name: "cold".to_string(),
                kind: DestinationKind::S3,
                bucket: "backups".to_string(),
                prefix: String::new(),
                region: Some("us-east-1".to_string()),
                storage_class: default_storage_class(),
            }],
            jobs: vec![JobConfig {
                sources: vec!["main".to_string()],
                destination: "cold".to_string(),
                enabled: true,
                dry_run: false,
            }],
            concurrency: ConcurrencyConfig::default(),
            retry: RetryConfig::default(),
            transfer: TransferConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_has_no_errors() {
        assert!(valid_config().validate().is_empty());
    }

    #[test]
    fn test_job_referencing_unknown_destination_is_rejected() {
        let mut config = valid_config();
        config.jobs[0].destination = "missing".to_string();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "jobs[0].destination"));
    }

    #[test]
    fn test_job_referencing_unknown_source_is_rejected() {
        let mut config = valid_config();
        config.jobs[0].sources = vec!["missing".to_string()];
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "jobs[0].sources"));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let mut config = valid_config();
        config.concurrency.max_parallel_workers = 0;
        let errors = config.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "concurrency.max_parallel_workers"));
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut config = valid_config();
        config.logging.level = "verbose".to_string();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn test_load_or_default_falls_back_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(config.concurrency.max_parallel_workers, 20);
    }

    #[test]
    fn test_user_filter_all_round_trips() {
        let filter = UserFilter::All(AllUsers::All);
        let yaml = serde_yaml::to_string(&filter).unwrap();
        let parsed: UserFilter = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(filter, parsed);
    }

    #[test]
    fn test_user_filter_list_round_trips() {
        let filter = UserFilter::List(vec!["a@example.com".to_string()]);
        let yaml = serde_yaml::to_string(&filter).unwrap();
        let parsed: UserFilter = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(filter, parsed);
    }
}
