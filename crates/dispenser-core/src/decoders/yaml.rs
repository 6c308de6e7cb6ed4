//! YAML decoding
//!
//! Every document in the stream is decoded in turn. A sequence document yields
//! one row per element, a mapping document is a single row and an empty
//! document yields nothing.

use serde::Deserialize;
use serde_json::Value;
use std::io::BufRead;

use super::{Decoder, RawRows};
use crate::error::BoxError;
use crate::format::FormatTag;
use crate::record::{RowIter, rows};
use crate::source::SourceOptions;

/// Decoder for single and multi-document YAML
pub struct YamlDecoder;

impl Decoder for YamlDecoder {
    fn format(&self) -> FormatTag {
        FormatTag::Yaml
    }

    fn decode(
        &self,
        input: Box<dyn BufRead>,
        _options: &SourceOptions,
    ) -> Result<RawRows, BoxError> {
        Ok(Box::new(YamlRows {
            documents: serde_yaml::Deserializer::from_reader(input),
            pending: None,
            failed: false,
        }))
    }
}

struct YamlRows {
    documents: serde_yaml::Deserializer<'static>,
    pending: Option<RowIter>,
    failed: bool,
}

impl Iterator for YamlRows {
    type Item = Result<Value, BoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.as_mut().and_then(Iterator::next) {
                return Some(Ok(row));
            }
            self.pending = None;

            if self.failed {
                return None;
            }
            let document = self.documents.next()?;
            match Value::deserialize(document) {
                Ok(value) => self.pending = Some(rows(value)),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(text: &str) -> Vec<Result<Value, BoxError>> {
        let input: Box<dyn BufRead> = Box::new(std::io::Cursor::new(text.as_bytes().to_vec()));
        YamlDecoder
            .decode(input, &SourceOptions::default())
            .unwrap()
            .collect()
    }

    fn values(text: &str) -> Vec<Value> {
        decode(text).into_iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_sequence_of_mappings() {
        assert_eq!(
            values("- name: a\n  n: 1\n- name: b\n  n: 2\n"),
            vec![json!({"name": "a", "n": 1}), json!({"name": "b", "n": 2})]
        );
    }

    #[test]
    fn test_single_mapping() {
        assert_eq!(values("name: a\nok: true\n"), vec![json!({"name": "a", "ok": true})]);
    }

    #[test]
    fn test_multiple_documents() {
        assert_eq!(
            values("---\na: 1\n---\na: 2\n"),
            vec![json!({"a": 1}), json!({"a": 2})]
        );
    }

    #[test]
    fn test_key_order_preserved() {
        let row = values("zeta: 1\nalpha: 2\n").remove(0);
        let keys: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_invalid_yaml_fails() {
        let out = decode("a: [1, 2\n");
        assert!(out.last().unwrap().is_err());
    }
}
