//! Read command

use anyhow::{Context, Result, bail};
use std::io::{BufWriter, Write};

use crate::config::{CliConfig, SourceOverrides};

/// Run the read command
pub fn run(
    config_path: &str,
    reference: Option<&str>,
    source_name: Option<&str>,
    overrides: SourceOverrides,
    pretty: bool,
) -> Result<()> {
    let config = CliConfig::load(config_path).context("Failed to load configuration")?;

    let (reference, options) = match (source_name, reference) {
        (Some(name), _) => config.source(name)?,
        (None, Some(reference)) => (reference.to_string(), config.defaults.clone()),
        (None, None) => bail!("Either a reference or --source is required"),
    };
    let options = overrides.apply(options);

    let source = super::open_source(&reference, options)?;
    let description = source.description().to_string();
    tracing::debug!("Reading {} source {}", source.kind(), description);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut count = 0usize;
    for record in source {
        let record = record.with_context(|| format!("Failed to read {}", description))?;
        if pretty {
            serde_json::to_writer_pretty(&mut out, &record)?;
        } else {
            serde_json::to_writer(&mut out, &record)?;
        }
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush()?;

    tracing::info!("Read {} records from {}", count, description);
    Ok(())
}
