//! Format detection
//!
//! Detection is a pure function from an optional name hint and a content
//! sample to a [`FormatTag`]. It never fails: when the cues are ambiguous it
//! returns a best guess and leaves failure to the decoder.
//!
//! Precedence, highest first:
//!
//! 1. an explicit override (handled by the caller)
//! 2. a known file extension (the last extension of the name wins)
//! 3. a `Content-Type` hint (URL targets only)
//! 4. content sniffing of the first bytes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Serialization format of a target's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatTag {
    /// Comma separated values with a header row
    Csv,
    /// JSON document or JSON lines
    #[serde(alias = "jsonl", alias = "ndjson")]
    Json,
    /// YAML, possibly multi-document
    #[serde(alias = "yml")]
    Yaml,
    /// Python pickle
    #[serde(alias = "pkl")]
    Pickle,
    /// XML document
    Xml,
    /// Spreadsheet workbook (xls, xlsx, ods)
    #[serde(alias = "xlsx", alias = "excel")]
    Xls,
    /// Python literal expression
    #[serde(alias = "python", alias = "py")]
    LiteralPython,
    /// Content that matched no known format
    Unknown,
}

impl FormatTag {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Pickle => "pickle",
            Self::Xml => "xml",
            Self::Xls => "xls",
            Self::LiteralPython => "literal-python",
            Self::Unknown => "unknown",
        }
    }

    /// Map a file extension (with or without the leading dot) to a format
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "json" | "jsonl" | "ndjson" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "pkl" | "pickle" => Some(Self::Pickle),
            "xml" => Some(Self::Xml),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Some(Self::Xls),
            "py" => Some(Self::LiteralPython),
            _ => None,
        }
    }

    /// Map the extension of a file name or URL path to a format
    pub fn from_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Map a MIME type (parameters are ignored) to a format
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "text/csv" => Some(Self::Csv),
            "application/json" | "text/json" | "application/x-ndjson" => Some(Self::Json),
            "application/yaml" | "application/x-yaml" | "text/yaml" | "text/x-yaml" => {
                Some(Self::Yaml)
            }
            "application/xml" | "text/xml" => Some(Self::Xml),
            "application/python-pickle" => Some(Self::Pickle),
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.oasis.opendocument.spreadsheet" => Some(Self::Xls),
            _ => None,
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "literal-python" | "python" => Ok(Self::LiteralPython),
            "excel" => Ok(Self::Xls),
            "unknown" => Ok(Self::Unknown),
            other => Self::from_extension(other).ok_or_else(|| format!("unknown format '{}'", s)),
        }
    }
}

/// Detect the format from an optional name hint and a content sample
pub fn detect(name: Option<&str>, sample: &[u8]) -> FormatTag {
    name.and_then(FormatTag::from_name)
        .unwrap_or_else(|| sniff(sample))
}

const PICKLE_OPCODE: u8 = 0x80;
const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

static PYTHON_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(True|False|None)\b").expect("valid regex"));

static YAML_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_ .-]*:(\s|$)").expect("valid regex"));

/// Guess the format from the first bytes of the content
pub fn sniff(sample: &[u8]) -> FormatTag {
    if sample.len() >= 2 && sample[0] == PICKLE_OPCODE && (2..=5).contains(&sample[1]) {
        return FormatTag::Pickle;
    }
    if sample.starts_with(&OLE2_MAGIC) || sample.starts_with(&ZIP_MAGIC) {
        return FormatTag::Xls;
    }

    let text = match std::str::from_utf8(sample) {
        Ok(text) => text,
        // The sample may end in the middle of a multi-byte character
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&sample[..e.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return FormatTag::Unknown,
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.is_empty() {
        return FormatTag::Csv;
    }

    let mut chars = text.chars();
    match chars.next() {
        Some('<') => {
            if text.starts_with("<?xml")
                || chars
                    .next()
                    .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '!')
            {
                return FormatTag::Xml;
            }
        }
        Some('{') | Some('[') => {
            return if looks_pythonic(text) {
                FormatTag::LiteralPython
            } else {
                FormatTag::Json
            };
        }
        Some('(') => return FormatTag::LiteralPython,
        _ => {}
    }
    if text.starts_with("OrderedDict(") || text.starts_with("dict(") {
        return FormatTag::LiteralPython;
    }
    if looks_like_yaml(text) {
        return FormatTag::Yaml;
    }
    if parses_as_csv(text) {
        FormatTag::Csv
    } else {
        FormatTag::LiteralPython
    }
}

/// Python literals quote with `'` and spell constants differently from JSON
fn looks_pythonic(text: &str) -> bool {
    match text.chars().find(|c| *c == '"' || *c == '\'') {
        Some(quote) => quote == '\'',
        None => PYTHON_KEYWORD.is_match(text),
    }
}

fn looks_like_yaml(text: &str) -> bool {
    if text.starts_with("---") {
        return true;
    }
    let first = text
        .lines()
        .map(str::trim_end)
        .find(|line| !line.is_empty() && !line.starts_with('#'));
    match first {
        Some(line) => {
            line == "-" || line.starts_with("- ") || (YAML_KEY.is_match(line) && !line.contains(','))
        }
        None => false,
    }
}

fn parses_as_csv(text: &str) -> bool {
    // A truncated sample has a partial last line; judge complete lines only
    let body = match text.rfind('\n') {
        Some(end) if !text.ends_with('\n') => &text[..=end],
        _ => text,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(body.as_bytes());
    reader.headers().is_ok() && reader.records().all(|record| record.is_ok())
}
