//! Format decoders
//!
//! One decoder per [`FormatTag`], selected once per target through
//! [`decoder_for`]. A decoder turns a buffered byte stream into a lazy
//! sequence of decoded rows; the target layer turns rows into records and
//! attaches the target identity to failures.
//!
//! Decoders for optional collaborators (`yaml`, `excel`) are only present
//! when the matching cargo feature is enabled. Asking for one that is not
//! compiled in fails with [`crate::Error::MissingDependency`] at that point, never
//! earlier.

use serde_json::Value;
use std::io::BufRead;

use crate::error::{BoxError, Result};
use crate::format::FormatTag;
use crate::source::SourceOptions;

mod delimited;
mod json;
mod literal;
mod pickle;
#[cfg(feature = "excel")]
mod spreadsheet;
mod xml;
#[cfg(feature = "yaml")]
mod yaml;

pub use delimited::CsvDecoder;
pub use json::JsonDecoder;
pub use literal::{LiteralDecoder, LiteralError, parse as parse_literal};
pub use pickle::PickleDecoder;
#[cfg(feature = "excel")]
pub use spreadsheet::SpreadsheetDecoder;
pub use xml::XmlDecoder;
#[cfg(feature = "yaml")]
pub use yaml::YamlDecoder;

/// Lazily decoded rows; each row should be a mapping
pub type RawRows = Box<dyn Iterator<Item = std::result::Result<Value, BoxError>>>;

/// A format collaborator
pub trait Decoder: Sync {
    /// Format this decoder reads
    fn format(&self) -> FormatTag;

    /// Start decoding `input`. Failures that happen before the first row is
    /// produced are returned here; later failures are yielded by the rows.
    fn decode(
        &self,
        input: Box<dyn BufRead>,
        options: &SourceOptions,
    ) -> std::result::Result<RawRows, BoxError>;
}

/// Decoder used when the content matched no known format
pub struct UnknownDecoder;

impl Decoder for UnknownDecoder {
    fn format(&self) -> FormatTag {
        FormatTag::Unknown
    }

    fn decode(
        &self,
        _input: Box<dyn BufRead>,
        _options: &SourceOptions,
    ) -> std::result::Result<RawRows, BoxError> {
        Err("content does not match any supported format".into())
    }
}

/// Select the decoder for a format
pub fn decoder_for(format: FormatTag) -> Result<&'static dyn Decoder> {
    match format {
        FormatTag::Csv => Ok(&CsvDecoder),
        FormatTag::Json => Ok(&JsonDecoder),
        FormatTag::Pickle => Ok(&PickleDecoder),
        FormatTag::Xml => Ok(&XmlDecoder),
        FormatTag::LiteralPython => Ok(&LiteralDecoder),
        FormatTag::Unknown => Ok(&UnknownDecoder),
        #[cfg(feature = "yaml")]
        FormatTag::Yaml => Ok(&YamlDecoder),
        #[cfg(not(feature = "yaml"))]
        FormatTag::Yaml => Err(crate::Error::MissingDependency {
            capability: "yaml",
            feature: "yaml",
        }),
        #[cfg(feature = "excel")]
        FormatTag::Xls => Ok(&SpreadsheetDecoder),
        #[cfg(not(feature = "excel"))]
        FormatTag::Xls => Err(crate::Error::MissingDependency {
            capability: "spreadsheet",
            feature: "excel",
        }),
    }
}
