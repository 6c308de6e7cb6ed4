//! Targets: single, individually decodable units of input
//!
//! A [`Target`] knows its identity, its source kind and how to reach its
//! content. Opening a target picks its format (override, then name hint,
//! then content sniffing), selects the decoder for that format and returns
//! a lazy record stream. Failures carry the target identity.

use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

use crate::classify::SourceKind;
use crate::collection::Collection;
use crate::decoders;
use crate::error::{BoxError, Error, Result};
use crate::fetch;
use crate::format::{FormatTag, sniff};
use crate::record::{Record, into_record};
use crate::source::SourceOptions;

/// Lazy stream of records from one target
pub type RecordStream = Box<dyn Iterator<Item = Result<Record>>>;

/// Ordered targets produced by resolving one reference
pub type TargetList = Vec<Target>;

/// How a target's content is reached
pub(crate) enum Accessor {
    Path(PathBuf),
    Handle {
        name: Option<String>,
        reader: Box<dyn Read>,
    },
    Text(String),
    Url(String),
    Collection(Rc<dyn Collection>),
    Sequence(Box<dyn Iterator<Item = Value>>),
}

/// One concrete unit of input
pub struct Target {
    id: String,
    kind: SourceKind,
    accessor: Accessor,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Target {
    pub(crate) fn new(id: impl Into<String>, kind: SourceKind, accessor: Accessor) -> Self {
        Self {
            id: id.into(),
            kind,
            accessor,
        }
    }

    pub(crate) fn path(path: PathBuf) -> Self {
        Self::new(path.display().to_string(), SourceKind::Path, Accessor::Path(path))
    }

    /// Identity used in logs and errors: a path, URL or placeholder name
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Kind of the target
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Name whose extension can hint at the format
    pub fn name_hint(&self) -> Option<&str> {
        match &self.accessor {
            Accessor::Path(path) => path.to_str(),
            Accessor::Handle { name, .. } => name.as_deref(),
            Accessor::Url(url) => Some(url_path(url)),
            _ => None,
        }
    }

    /// True for targets holding native records, which are never decoded
    pub fn is_native(&self) -> bool {
        matches!(
            self.accessor,
            Accessor::Collection(_) | Accessor::Sequence(_)
        )
    }

    /// Report the format this target would be decoded as.
    ///
    /// Never consumes the target. Returns `None` for native targets and for
    /// streams whose format can only be known by reading them (unnamed
    /// handles, URLs without a known extension).
    pub fn detect(&self, options: &SourceOptions) -> Result<Option<FormatTag>> {
        if self.is_native() {
            return Ok(None);
        }
        if let Some(format) = options.format {
            return Ok(Some(format));
        }
        if let Some(format) = self.name_hint().and_then(FormatTag::from_name) {
            return Ok(Some(format));
        }

        match &self.accessor {
            Accessor::Path(path) => {
                let sample = read_sample(path, options.sniff_bytes)
                    .map_err(|e| Error::io(&self.id, e))?;
                Ok(Some(sniff(&sample)))
            }
            Accessor::Text(text) => {
                let bytes = text.as_bytes();
                Ok(Some(sniff(&bytes[..bytes.len().min(options.sniff_bytes)])))
            }
            _ => Ok(None),
        }
    }

    /// Open the target and start decoding it
    pub(crate) fn open(self, options: &SourceOptions) -> Result<RecordStream> {
        info!(source = %self.id, kind = %self.kind, "Reading data from {}", self.id);
        let id = self.id;

        match self.accessor {
            Accessor::Sequence(items) => Ok(Box::new(items.map(move |item| {
                into_record(item).map_err(|e| Error::decode(&id, None, e.into()))
            }))),
            Accessor::Collection(collection) => {
                let cursor = collection
                    .find()
                    .map_err(|e| Error::decode(&id, None, e))?;
                Ok(Box::new(cursor.map(move |document| {
                    document.map_err(|e| Error::decode(&id, None, e))
                })))
            }
            Accessor::Path(path) => {
                let file = File::open(&path).map_err(|e| Error::io(&id, e))?;
                let hint = options
                    .format
                    .or_else(|| path.to_str().and_then(FormatTag::from_name));
                decode_stream(id, Box::new(file), hint, options)
            }
            Accessor::Handle { name, reader } => {
                let hint = options
                    .format
                    .or_else(|| name.as_deref().and_then(FormatTag::from_name));
                decode_stream(id, reader, hint, options)
            }
            Accessor::Text(text) => {
                let reader = std::io::Cursor::new(text.into_bytes());
                decode_stream(id, Box::new(reader), options.format, options)
            }
            Accessor::Url(url) => {
                let fetched = fetch::fetch(&url)?;
                let hint = options
                    .format
                    .or_else(|| FormatTag::from_name(url_path(&url)))
                    .or_else(|| {
                        fetched
                            .content_type
                            .as_deref()
                            .and_then(FormatTag::from_content_type)
                    });
                decode_stream(id, fetched.reader, hint, options)
            }
        }
    }
}

fn read_sample(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut sample = Vec::new();
    File::open(path)?.take(limit as u64).read_to_end(&mut sample)?;
    Ok(sample)
}

fn decode_stream(
    id: String,
    reader: Box<dyn Read>,
    hint: Option<FormatTag>,
    options: &SourceOptions,
) -> Result<RecordStream> {
    let (reader, format) = match hint {
        Some(format) => (reader, format),
        None => {
            // Pipes can return short reads, so fill the whole sample first
            let mut reader = reader;
            let mut sample = Vec::with_capacity(options.sniff_bytes);
            reader
                .by_ref()
                .take(options.sniff_bytes as u64)
                .read_to_end(&mut sample)
                .map_err(|e| Error::io(&id, e))?;
            let format = sniff(&sample);
            let replay: Box<dyn Read> = Box::new(Cursor::new(sample).chain(reader));
            (replay, format)
        }
    };
    let input = BufReader::new(reader);
    debug!(source = %id, format = %format, "Decoding");

    let decoder = decoders::decoder_for(format)?;
    let rows = decoder
        .decode(Box::new(input), options)
        .map_err(|e| Error::decode(&id, Some(format), e))?;
    Ok(Box::new(rows.map(move |row| {
        row.and_then(|value| into_record(value).map_err(BoxError::from))
            .map_err(|e| Error::decode(&id, Some(format), e))
    })))
}

/// Path component of a URL, without query or fragment
fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    rest.find('/').map_or("", |start| &rest[start..])
}
