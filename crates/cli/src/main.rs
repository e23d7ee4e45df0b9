//! Main entry point for the clinicq CLI
//!
//! Replays booking scenarios through the clinic queue engine and prints the
//! resulting orderings, admissions and summaries.

mod commands;
mod output;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clinicq_engine::logging::{parse_log_level, setup_logging, LoggingConfig};
use clinicq_engine::QueueEngineConfig;
use tracing::debug;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Clinic patient queue replay tool", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, env = "CLINICQ_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    format: OutputFormat,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON scenario file
    Replay {
        /// Scenario file
        scenario: PathBuf,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    async fn execute(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;

        let mut logging = LoggingConfig::from_settings(&config.logging, "clinicq")?;
        if let Some(level) = &self.log_level {
            logging.level = parse_log_level(level)?;
        }
        if self.json_logs {
            logging = logging.with_json();
        }
        setup_logging(&logging)?;

        match self.command {
            Commands::Replay { scenario } => commands::replay::execute(&scenario, config, self.format).await,
            Commands::Config => commands::config::execute(&config),
        }
    }
}

/// Explicit path, then the user config directory, then built-in defaults
fn load_config(explicit: Option<&Path>) -> Result<QueueEngineConfig> {
    if let Some(path) = explicit {
        return QueueEngineConfig::load(path).with_context(|| format!("failed to load config {}", path.display()));
    }

    if let Some(path) = dirs::config_dir().map(|dir| dir.join("clinicq").join("config.toml")) {
        if path.is_file() {
            debug!("Using config from {}", path.display());
            return QueueEngineConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()));
        }
    }

    Ok(QueueEngineConfig::default())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.execute().await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}
