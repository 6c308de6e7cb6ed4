//! Source classification and target resolution
//!
//! [`classify`] decides what kind of source a [`Reference`] is, and
//! [`resolve`] expands it into the ordered [`TargetList`] the source will
//! read. Classification is decided in priority order, first match wins:
//!
//! 1. native data (an iterator of values, a JSON array or object) is a
//!    `sequence`
//! 2. a [`Collection`] is a `collection`
//! 3. an open reader is a `handle`
//! 4. text starting with `http://` or `https://` is a `url`
//! 5. single-line text naming an existing filesystem entry is a `path`
//! 6. single-line text with glob metacharacters is a `glob`
//! 7. any other text is a `string`, the text itself being the payload
//!
//! Anything else fails with [`Error::UnresolvableSource`].

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::record::{Record, kind_of, rows};
use crate::target::{Accessor, Target, TargetList};

/// The input a source is built from
pub enum Reference {
    /// A path, glob pattern, URL or inline data
    Text(String),
    /// A filesystem path or glob pattern
    Path(PathBuf),
    /// An open, readable stream; the name, when known, is used as a format hint
    Handle {
        /// File name the stream came from, if any
        name: Option<String>,
        /// The stream itself
        reader: Box<dyn Read>,
    },
    /// A document collection
    Collection(Rc<dyn Collection>),
    /// Native records produced by an iterator
    Sequence(Box<dyn Iterator<Item = Value>>),
    /// A JSON value: arrays and objects are native records, strings are text
    Value(Value),
}

impl Reference {
    /// Wrap an anonymous reader
    pub fn reader(reader: impl Read + 'static) -> Self {
        Self::Handle {
            name: None,
            reader: Box::new(reader),
        }
    }

    /// Wrap a reader together with the file name it came from
    pub fn named_reader(name: impl Into<String>, reader: impl Read + 'static) -> Self {
        Self::Handle {
            name: Some(name.into()),
            reader: Box::new(reader),
        }
    }

    /// Wrap a collection
    pub fn collection(collection: impl Collection + 'static) -> Self {
        Self::Collection(Rc::new(collection))
    }

    /// Wrap an iterator of native values
    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self::Sequence(Box::new(items.into_iter()))
    }

    /// Short printable form used in errors and logs
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => abbreviate(text),
            Self::Path(path) => path.display().to_string(),
            Self::Handle { name, .. } => name.clone().unwrap_or_else(|| "<handle>".to_string()),
            Self::Collection(collection) => format!("collection {}", collection.name()),
            Self::Sequence(_) => "<sequence>".to_string(),
            Self::Value(Value::String(text)) => abbreviate(text),
            Self::Value(value) => abbreviate(&value.to_string()),
        }
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Self::Text(_) => "Text",
            Self::Path(_) => "Path",
            Self::Handle { .. } => "Handle",
            Self::Collection(_) => "Collection",
            Self::Sequence(_) => "Sequence",
            Self::Value(_) => "Value",
        };
        f.debug_tuple(variant).field(&self.describe()).finish()
    }
}

impl From<&str> for Reference {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Reference {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&Path> for Reference {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Reference {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Value> for Reference {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<Record>> for Reference {
    fn from(records: Vec<Record>) -> Self {
        Self::sequence(records.into_iter().map(Value::Object))
    }
}

fn abbreviate(text: &str) -> String {
    const MAX: usize = 60;
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > MAX || line.len() < text.trim_end().len() {
        let head: String = line.chars().take(MAX).collect();
        format!("{:?}...", head)
    } else {
        format!("{:?}", line)
    }
}

/// The kind of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// One existing file
    Path,
    /// A wildcard pattern over files
    Glob,
    /// An open stream
    Handle,
    /// A document collection
    Collection,
    /// Inline text data
    String,
    /// A remote resource
    Url,
    /// Native in-memory records
    Sequence,
}

impl SourceKind {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Glob => "glob",
            Self::Handle => "handle",
            Self::Collection => "collection",
            Self::String => "string",
            Self::Url => "url",
            Self::Sequence => "sequence",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a reference
pub fn classify(reference: &Reference) -> Result<SourceKind> {
    match reference {
        Reference::Sequence(_) => Ok(SourceKind::Sequence),
        Reference::Value(Value::Array(_) | Value::Object(_)) => Ok(SourceKind::Sequence),
        Reference::Value(Value::String(text)) => classify_text(text),
        Reference::Value(other) => Err(Error::UnresolvableSource {
            reference: other.to_string(),
            reason: format!("{} is not a data source", kind_of(other)),
        }),
        Reference::Collection(_) => Ok(SourceKind::Collection),
        Reference::Handle { .. } => Ok(SourceKind::Handle),
        Reference::Text(text) => classify_text(text),
        Reference::Path(path) => Ok(classify_path(path)),
    }
}

fn classify_text(text: &str) -> Result<SourceKind> {
    if text.trim().is_empty() {
        return Err(Error::UnresolvableSource {
            reference: format!("{:?}", text),
            reason: "empty reference".to_string(),
        });
    }
    if is_url(text) {
        return Ok(SourceKind::Url);
    }
    if !text.contains('\n') {
        if Path::new(text).exists() {
            return Ok(SourceKind::Path);
        }
        if is_glob_pattern(text) {
            return Ok(SourceKind::Glob);
        }
    }
    Ok(SourceKind::String)
}

fn classify_path(path: &Path) -> SourceKind {
    let is_glob = path
        .to_str()
        .is_some_and(|text| !path.exists() && is_glob_pattern(text));
    if is_glob {
        SourceKind::Glob
    } else {
        SourceKind::Path
    }
}

/// True when the text is an `http://` or `https://` URL
pub fn is_url(text: &str) -> bool {
    let text = text.trim();
    let lower = text.get(..8).unwrap_or(text).to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !text.contains(char::is_whitespace)
}

/// True when the text opens like inline JSON, a Python literal or XML
pub fn looks_like_inline_data(text: &str) -> bool {
    let first = text.trim_start().chars().next();
    matches!(first, Some('{' | '[' | '(' | '<' | '"' | '\''))
}

/// True when single-line text reads as a glob pattern rather than data
pub fn is_glob_pattern(text: &str) -> bool {
    if text.contains('\n') || !text.contains(['*', '?', '[']) {
        return false;
    }
    // Inline data can contain `[` or `?`
    if looks_like_inline_data(text) {
        return false;
    }
    glob::Pattern::new(text).is_ok()
}

/// Expand a reference into the targets it reads, in order
pub fn resolve(reference: Reference) -> Result<TargetList> {
    let kind = classify(&reference)?;
    let targets = match reference {
        Reference::Text(text) | Reference::Value(Value::String(text)) => {
            text_targets(text, kind)?
        }
        Reference::Path(path) => match kind {
            SourceKind::Glob => glob_targets(&path.to_string_lossy())?,
            _ => vec![Target::path(path)],
        },
        Reference::Handle { name, reader } => {
            let id = name.clone().unwrap_or_else(|| "<handle>".to_string());
            vec![Target::new(id, kind, Accessor::Handle { name, reader })]
        }
        Reference::Collection(collection) => {
            let id = format!("collection {}", collection.name());
            vec![Target::new(id, kind, Accessor::Collection(collection))]
        }
        Reference::Sequence(items) => {
            vec![Target::new("<sequence>", kind, Accessor::Sequence(items))]
        }
        Reference::Value(value) => {
            let items = Box::new(rows(value));
            vec![Target::new("<sequence>", kind, Accessor::Sequence(items))]
        }
    };
    Ok(targets)
}

fn text_targets(text: String, kind: SourceKind) -> Result<TargetList> {
    Ok(match kind {
        SourceKind::Url => vec![Target::new(text.trim(), kind, Accessor::Url(text.trim().to_string()))],
        SourceKind::Path => vec![Target::path(PathBuf::from(text))],
        SourceKind::Glob => glob_targets(&text)?,
        _ => vec![Target::new("<string>", kind, Accessor::Text(text))],
    })
}

fn glob_targets(pattern: &str) -> Result<TargetList> {
    Ok(expand_glob(pattern)?.into_iter().map(Target::path).collect())
}

/// Expand a glob pattern to the matching files, in alphabetical order.
///
/// Directories and unreadable entries are skipped. No match is an empty list,
/// not an error.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|e| Error::UnresolvableSource {
        reference: pattern.to_string(),
        reason: format!("invalid glob pattern: {}", e),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_dir() => {
                warn!("Skipping directory {} matched by {}", path.display(), pattern);
            }
            Ok(path) => paths.push(path),
            Err(e) => warn!("Skipping unreadable match for {}: {}", pattern, e),
        }
    }
    debug!(pattern, matches = paths.len(), "Expanded glob");
    Ok(paths)
}
