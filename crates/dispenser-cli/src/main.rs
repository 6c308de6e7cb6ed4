//! Dispenser CLI
//!
//! Reads any supported source and prints its records as JSON lines.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dispenser_core::FormatTag;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::SourceOverrides;

/// Dispenser - read rowlike data from anywhere as JSON records
#[derive(Parser)]
#[command(name = "dispenser")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "dispenser.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records of a source as JSON lines
    Read {
        /// Path, glob pattern, URL, inline data, or `-` for standard input
        #[arg(required_unless_present = "source", conflicts_with = "source")]
        reference: Option<String>,

        /// Read a source named in the configuration file
        #[arg(short, long)]
        source: Option<String>,

        #[command(flatten)]
        options: ReadOptions,

        /// Pretty-print each record
        #[arg(long)]
        pretty: bool,
    },

    /// Show how a reference would be read
    Detect {
        /// Path, glob pattern, URL, inline data, or `-` for standard input
        reference: String,

        /// Format to report instead of detecting it
        #[arg(short, long)]
        format: Option<FormatTag>,
    },

    /// List the sources named in the configuration file
    Sources,
}

#[derive(Args)]
struct ReadOptions {
    /// Maximum number of records per target
    #[arg(short, long)]
    limit: Option<usize>,

    /// Format override (csv, json, yaml, pickle, xml, xls, literal-python)
    #[arg(short, long)]
    format: Option<FormatTag>,

    /// CSV field delimiter
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Worksheet to read from spreadsheets
    #[arg(long)]
    sheet: Option<String>,
}

impl From<ReadOptions> for SourceOverrides {
    fn from(options: ReadOptions) -> Self {
        Self {
            limit: options.limit,
            format: options.format,
            delimiter: options.delimiter,
            sheet: options.sheet,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout carries the records
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Read {
            reference,
            source,
            options,
            pretty,
        } => {
            commands::read::run(
                &cli.config,
                reference.as_deref(),
                source.as_deref(),
                options.into(),
                pretty,
            )?;
        }
        Commands::Detect { reference, format } => {
            commands::detect::run(&cli.config, &reference, format)?;
        }
        Commands::Sources => {
            commands::sources::run(&cli.config)?;
        }
    }

    Ok(())
}
