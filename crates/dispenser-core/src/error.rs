//! Error types for dispenser-core

use thiserror::Error;

use crate::format::FormatTag;

/// Result type alias for dispenser-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a format collaborator or a collection cursor
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving or reading a source
#[derive(Error, Debug)]
pub enum Error {
    /// The reference could not be classified into any supported source kind
    #[error("cannot resolve data source {reference}: {reason}")]
    UnresolvableSource {
        /// Printable form of the reference
        reference: String,
        /// Why classification failed
        reason: String,
    },

    /// A target's content does not parse under its detected or overridden format
    #[error("failed to decode {target}{}: {source}", describe_format(.format))]
    Decode {
        /// Identity of the target being decoded
        target: String,
        /// Format the target was decoded as; `None` for native data
        format: Option<FormatTag>,
        /// Underlying decoder failure
        #[source]
        source: BoxError,
    },

    /// An optional format collaborator is not compiled in
    #[error("{capability} support is unavailable; rebuild with the `{feature}` feature")]
    MissingDependency {
        /// Capability that was requested (e.g. "yaml")
        capability: &'static str,
        /// Cargo feature that provides it
        feature: &'static str,
    },

    /// A one-shot source was iterated a second time
    #[error("source {reference} was already consumed and cannot be iterated again")]
    ExhaustedSource {
        /// Printable form of the reference
        reference: String,
    },

    /// A target could not be opened or read
    #[error("cannot read {target}: {source}")]
    Io {
        /// Identity of the target
        target: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A URL could not be retrieved
    #[error("cannot fetch {url}: {message}")]
    Fetch {
        /// URL that was requested
        url: String,
        /// Description of the failure
        message: String,
    },
}

impl Error {
    /// Identity of the target this error is about, if it concerns a single target
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Decode { target, .. } | Self::Io { target, .. } => Some(target),
            Self::Fetch { url, .. } => Some(url),
            _ => None,
        }
    }

    /// True for errors raised while decoding a target's content
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub(crate) fn decode(target: &str, format: Option<FormatTag>, source: BoxError) -> Self {
        Self::Decode {
            target: target.to_string(),
            format,
            source,
        }
    }

    pub(crate) fn io(target: &str, source: std::io::Error) -> Self {
        Self::Io {
            target: target.to_string(),
            source,
        }
    }
}

fn describe_format(format: &Option<FormatTag>) -> String {
    match format {
        Some(format) => format!(" as {}", format),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_names_target_and_format() {
        let err = Error::decode("data/a.json", Some(FormatTag::Json), "unexpected end".into());
        assert_eq!(
            err.to_string(),
            "failed to decode data/a.json as json: unexpected end"
        );
        assert_eq!(err.target(), Some("data/a.json"));
        assert!(err.is_decode());
    }

    #[test]
    fn test_native_decode_error_omits_format() {
        let err = Error::decode("<sequence>", None, "row is a number".into());
        assert_eq!(err.to_string(), "failed to decode <sequence>: row is a number");
    }

    #[test]
    fn test_missing_dependency_message() {
        let err = Error::MissingDependency {
            capability: "yaml",
            feature: "yaml",
        };
        assert!(err.to_string().contains("`yaml` feature"));
        assert!(err.target().is_none());
    }
}
