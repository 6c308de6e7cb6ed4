//! CLI command implementations

pub mod detect;
pub mod read;
pub mod sources;

use anyhow::{Context, Result};
use dispenser_core::{Reference, Source, SourceOptions};

/// Build a source from a command-line reference; `-` is standard input
pub fn open_source(reference: &str, options: SourceOptions) -> Result<Source> {
    let reference = if reference == "-" {
        Reference::reader(std::io::stdin())
    } else {
        Reference::from(reference)
    };
    Source::with_options(reference, options).context("Failed to open source")
}
