//! Sources command

use anyhow::{Context, Result};

use crate::config::CliConfig;

/// List the named sources
pub fn run(config_path: &str) -> Result<()> {
    let config = CliConfig::load(config_path).context("Failed to load configuration")?;

    if config.sources.is_empty() {
        println!("No sources configured in {}", config_path);
        return Ok(());
    }
    for (name, source) in &config.sources {
        println!("{}\t{}", name, config.resolve_reference(&source.reference));
    }
    Ok(())
}
