//! Detect command

use anyhow::{Context, Result};
use dispenser_core::FormatTag;

use crate::config::CliConfig;

/// Run the detect command
pub fn run(config_path: &str, reference: &str, format: Option<FormatTag>) -> Result<()> {
    let config = CliConfig::load(config_path).context("Failed to load configuration")?;
    let mut options = config.defaults.clone();
    if format.is_some() {
        options.format = format;
    }

    let mut source = super::open_source(reference, options)?;
    println!("kind\t{}", source.kind());
    println!("table\t{}", source.table_name());

    let targets = source.targets().context("Failed to resolve targets")?;
    if targets.is_empty() {
        tracing::warn!("{} matched nothing", source.description());
    }
    for target in &targets {
        let format = target
            .detect(source.options())
            .with_context(|| format!("Failed to inspect {}", target.id()))?;
        let format = match (format, target.is_native()) {
            (Some(format), _) => format.to_string(),
            (None, true) => "native".to_string(),
            (None, false) => "sniffed when read".to_string(),
        };
        println!("{}\t{}", target.id(), format);
    }
    Ok(())
}
