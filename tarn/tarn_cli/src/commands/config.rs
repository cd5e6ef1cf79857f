//! Pool configuration commands

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use tarn_pool::PoolConfig;

/// Arguments for the check-config command
#[derive(Args)]
pub struct CheckConfigArgs {
    /// Path to a TOML pool configuration
    path: PathBuf,
}

/// Implementation of the check-config command
pub fn execute(args: &CheckConfigArgs) -> Result<()> {
    let config = load(&args.path)?;

    let limit = match config.limit() {
        Some(max) => max.to_string(),
        None => "unbounded".to_string(),
    };

    println!("Configuration OK: {}", args.path.display());
    println!("  initial_size = {}", config.initial_size);
    println!("  policy = {}", config.policy);
    println!("  limit = {}", limit);
    Ok(())
}

/// Read, parse and validate a pool configuration file
pub fn load(path: &Path) -> Result<PoolConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    PoolConfig::from_toml_str(&text)
        .with_context(|| format!("invalid pool configuration in {}", path.display()))
}
