//! The source facade
//!
//! A [`Source`] is built from a [`Reference`] and [`SourceOptions`]. The
//! reference is classified immediately, so an unusable reference fails at
//! construction. Targets are resolved and opened only when the records are
//! iterated.
//!
//! Sources over paths, globs, URLs, inline text, collections and JSON values
//! can be iterated any number of times; each pass re-resolves the reference.
//! Sources over a handle or an iterator can be iterated once, and a second
//! attempt fails with [`Error::ExhaustedSource`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::classify::{Reference, SourceKind, classify, resolve};
use crate::collection::Collection;
use crate::concat::Concat;
use crate::error::{Error, Result};
use crate::format::FormatTag;
use crate::limit::Limited;
use crate::record::Record;
use crate::target::{RecordStream, Target, TargetList};

// ============================================================================
// Options
// ============================================================================

/// Options controlling how a source is read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Maximum number of records read from each target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Format to decode every target as, bypassing detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatTag>,

    /// CSV settings
    #[serde(default)]
    pub csv: CsvOptions,

    /// Worksheet to read from spreadsheets; the first sheet when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,

    /// Number of leading bytes inspected when sniffing content
    #[serde(default = "default_sniff_bytes")]
    pub sniff_bytes: usize,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            limit: None,
            format: None,
            csv: CsvOptions::default(),
            sheet: None,
            sniff_bytes: default_sniff_bytes(),
        }
    }
}

fn default_sniff_bytes() -> usize {
    8192
}

impl SourceOptions {
    /// Cap the records read from each target
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Force a format instead of detecting it
    pub fn with_format(mut self, format: FormatTag) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the CSV field delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.csv.delimiter = delimiter;
        self
    }

    /// Select the worksheet read from spreadsheets
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

/// CSV settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Field delimiter, a single ASCII character
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

// ============================================================================
// Source
// ============================================================================

static NEXT_TABLE: AtomicUsize = AtomicUsize::new(1);

/// Where the reference is kept between iterations
enum Origin {
    Text(String),
    Path(PathBuf),
    Value(Value),
    Collection(Rc<dyn Collection>),
    OneShot(Option<Reference>),
}

impl Origin {
    fn new(reference: Reference) -> Self {
        match reference {
            Reference::Text(text) => Self::Text(text),
            Reference::Path(path) => Self::Path(path),
            Reference::Value(value) => Self::Value(value),
            Reference::Collection(collection) => Self::Collection(collection),
            one_shot @ (Reference::Handle { .. } | Reference::Sequence(_)) => {
                Self::OneShot(Some(one_shot))
            }
        }
    }

    fn take(&mut self, description: &str) -> Result<Reference> {
        match self {
            Self::Text(text) => Ok(Reference::Text(text.clone())),
            Self::Path(path) => Ok(Reference::Path(path.clone())),
            Self::Value(value) => Ok(Reference::Value(value.clone())),
            Self::Collection(collection) => Ok(Reference::Collection(Rc::clone(collection))),
            Self::OneShot(reference) => reference.take().ok_or_else(|| Error::ExhaustedSource {
                reference: description.to_string(),
            }),
        }
    }
}

/// A lazy stream of records over any supported reference
///
/// # Example
///
/// ```rust,ignore
/// let source = Source::with_options("data/*.csv", SourceOptions::default().with_limit(10))?;
/// for record in source {
///     println!("{:?}", record?);
/// }
/// ```
pub struct Source {
    origin: Origin,
    kind: SourceKind,
    description: String,
    table_name: String,
    options: SourceOptions,
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("reference", &self.description)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish()
    }
}

impl Source {
    /// Create a source with default options
    pub fn new(reference: impl Into<Reference>) -> Result<Self> {
        Self::with_options(reference, SourceOptions::default())
    }

    /// Create a source
    pub fn with_options(reference: impl Into<Reference>, options: SourceOptions) -> Result<Self> {
        let reference = reference.into();
        let kind = classify(&reference)?;
        let description = reference.describe();
        let table_name = table_name(&reference, kind);
        debug!(reference = %description, %kind, "Classified source");

        Ok(Self {
            origin: Origin::new(reference),
            kind,
            description,
            table_name,
            options,
        })
    }

    /// Kind of the reference
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Printable form of the reference
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Options the source reads with
    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    /// Name for the data, e.g. when loading it into a table: the file stem of
    /// a path, the name of a collection or named handle, otherwise `TableN`
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// True when the source can no longer be iterated
    pub fn is_exhausted(&self) -> bool {
        matches!(self.origin, Origin::OneShot(None))
    }

    /// Resolve the reference into its targets.
    ///
    /// Consumes one-shot references.
    pub fn targets(&mut self) -> Result<TargetList> {
        let reference = self.origin.take(&self.description)?;
        let targets = resolve(reference)?;
        debug!(reference = %self.description, targets = targets.len(), "Resolved targets");
        Ok(targets)
    }

    /// Start a pass over the records
    pub fn records(&mut self) -> Result<Records> {
        let targets = self.targets()?;
        Ok(Records::new(targets, self.options.clone()))
    }
}

impl IntoIterator for Source {
    type Item = Result<Record>;
    type IntoIter = Records;

    fn into_iter(mut self) -> Records {
        self.records().unwrap_or_else(Records::failed)
    }
}

fn table_name(reference: &Reference, kind: SourceKind) -> String {
    let named = match (reference, kind) {
        (Reference::Path(path), SourceKind::Path) => file_stem(path),
        (Reference::Text(text), SourceKind::Path)
        | (Reference::Value(Value::String(text)), SourceKind::Path) => file_stem(Path::new(text)),
        (Reference::Handle { name, .. }, _) => name.as_deref().and_then(|n| file_stem(Path::new(n))),
        (Reference::Collection(collection), _) => Some(collection.name().to_string()),
        _ => None,
    };
    named.unwrap_or_else(|| format!("Table{}", NEXT_TABLE.fetch_add(1, Ordering::Relaxed)))
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

// ============================================================================
// Records
// ============================================================================

type Activate = Box<dyn FnMut(Target) -> Result<Option<Limited<RecordStream>>>>;

/// One pass over a source's records
///
/// Records of each target are yielded in order, targets in resolution order.
/// The first error ends the pass.
pub struct Records {
    inner: Concat<std::vec::IntoIter<Target>, Activate, Limited<RecordStream>>,
    failure: Option<Error>,
}

impl Records {
    fn new(targets: TargetList, options: SourceOptions) -> Self {
        let limit = options.limit;
        let activate: Activate = Box::new(move |target: Target| {
            if limit == Some(0) {
                debug!(source = %target.id(), "Skipping target, limit is 0");
                return Ok(None);
            }
            let stream = target.open(&options)?;
            Ok(Some(Limited::new(stream, limit)))
        });

        Self {
            inner: Concat::new(targets.into_iter(), activate),
            failure: None,
        }
    }

    fn failed(error: Error) -> Self {
        let mut records = Self::new(Vec::new(), SourceOptions::default());
        records.failure = Some(error);
        records
    }
}

impl Iterator for Records {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.failure.take() {
            return Some(Err(error));
        }
        self.inner.next()
    }
}
