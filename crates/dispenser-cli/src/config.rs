//! Configuration file parsing
//!
//! `dispenser.yaml` holds default read options and named sources:
//!
//! ```yaml
//! defaults:
//!   limit: 100
//!   csv:
//!     delimiter: ";"
//! sources:
//!   orders:
//!     reference: exports/orders-*.csv
//!     limit: 10
//!   feed:
//!     reference: https://example.com/feed.json
//! ```
//!
//! Relative file references resolve against the directory of the
//! configuration file.

use anyhow::{Context, Result};
use dispenser_core::classify::{is_url, looks_like_inline_data};
use dispenser_core::{FormatTag, SourceOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Contents of `dispenser.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Options applied to every read
    #[serde(default)]
    pub defaults: SourceOptions,

    /// Named sources
    #[serde(default)]
    pub sources: BTreeMap<String, NamedSource>,

    /// Directory the configuration file was loaded from
    #[serde(skip)]
    pub base_path: PathBuf,
}

/// A source declared in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedSource {
    /// Path, glob pattern, URL or inline data
    pub reference: String,

    /// Options that differ from the defaults
    #[serde(flatten)]
    pub overrides: SourceOverrides,
}

/// Read options that are only applied when set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceOverrides {
    /// Maximum number of records per target
    pub limit: Option<usize>,
    /// Format override
    pub format: Option<FormatTag>,
    /// CSV field delimiter
    pub delimiter: Option<char>,
    /// Spreadsheet worksheet
    pub sheet: Option<String>,
}

impl SourceOverrides {
    /// Layer these overrides on top of `options`
    pub fn apply(&self, mut options: SourceOptions) -> SourceOptions {
        if let Some(limit) = self.limit {
            options.limit = Some(limit);
        }
        if let Some(format) = self.format {
            options.format = Some(format);
        }
        if let Some(delimiter) = self.delimiter {
            options.csv.delimiter = delimiter;
        }
        if let Some(sheet) = &self.sheet {
            options.sheet = Some(sheet.clone());
        }
        options
    }
}

impl CliConfig {
    /// Load configuration from a file or from `dispenser.yaml` in a directory.
    ///
    /// A missing file is not an error: every read then uses built-in defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_path = if path.is_dir() {
            path.join("dispenser.yaml")
        } else {
            path.to_path_buf()
        };
        let base_path = config_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        if !config_path.exists() {
            tracing::debug!("No configuration at {}, using defaults", config_path.display());
            return Ok(Self {
                base_path,
                ..Self::default()
            });
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let mut config: CliConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        config.base_path = base_path;
        Ok(config)
    }

    /// Look up a named source, returning its resolved reference and options
    pub fn source(&self, name: &str) -> Result<(String, SourceOptions)> {
        let named = self.sources.get(name).with_context(|| {
            let known: Vec<&str> = self.sources.keys().map(String::as_str).collect();
            format!("Unknown source '{}' (configured: {})", name, known.join(", "))
        })?;
        let reference = self.resolve_reference(&named.reference);
        Ok((reference, named.overrides.apply(self.defaults.clone())))
    }

    /// Resolve a file reference against the configuration directory
    ///
    /// Standard input, URLs, absolute paths and inline data pass through.
    pub fn resolve_reference(&self, reference: &str) -> String {
        if reference == "-"
            || reference.contains('\n')
            || looks_like_inline_data(reference)
            || is_url(reference)
            || Path::new(reference).is_absolute()
        {
            return reference.to_string();
        }
        self.base_path.join(reference).to_string_lossy().into_owned()
    }
}
