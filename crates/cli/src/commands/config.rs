//! Config command - print the effective configuration

use anyhow::Result;
use clinicq_engine::QueueEngineConfig;

/// Execute config command
pub fn execute(config: &QueueEngineConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
