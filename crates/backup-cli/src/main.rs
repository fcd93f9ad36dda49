//! Backup engine CLI - command-line interface for the incremental backup engine
//!
//! Provides commands for:
//! - Running configured backup jobs
//! - Validating and inspecting configuration
//! - Showing backup status read back from a destination

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod composition;
mod output;

use commands::config::ConfigCommand;
use commands::run::RunCommand;
use commands::status::StatusCommand;
use output::OutputFormat;

/// Marks an error as a configuration problem, so `main` can map it to
/// exit code 2 rather than the generic job-failure exit code 1.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    pub fn new(message: impl Into<String>) -> anyhow::Error {
        Self(message.into()).into()
    }

    pub fn wrap(err: anyhow::Error) -> anyhow::Error {
        Self(err.to_string()).into()
    }
}

#[derive(Debug, Parser)]
#[command(name = "backup-cli", version, about = "Incremental backup engine")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one or all enabled backup jobs
    Run(RunCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Show backup status read back from a destination
    Status(StatusCommand),
}

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("\u{2717} Error: {e}");
            if e.downcast_ref::<ConfigError>().is_some() {
                2
            } else {
                1
            }
        }
    };
    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Run(cmd) => cmd.execute(format, &config_path).await,
        Commands::Config(cmd) => cmd.execute(format, &config_path).await,
        Commands::Status(cmd) => cmd.execute(format, &config_path).await,
    }
}

/// `~/.config/backup-engine/config.yaml`, or `./config.yaml` if no home
/// directory can be resolved.
fn default_config_path() -> std::path::PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("backup-engine").join("config.yaml"))
        .unwrap_or_else(|| std::path::PathBuf::from("config.yaml"))
}
