//! JSON decoding
//!
//! Accepts a single document or a stream of concatenated documents (JSON
//! lines). A top-level array contributes one row per element.

use serde_json::de::IoRead;
use serde_json::{StreamDeserializer, Value};
use std::io::BufRead;

use super::{Decoder, RawRows};
use crate::error::BoxError;
use crate::format::FormatTag;
use crate::record::{RowIter, rows};
use crate::source::SourceOptions;

/// Decoder for JSON documents and JSON lines
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn format(&self) -> FormatTag {
        FormatTag::Json
    }

    fn decode(
        &self,
        input: Box<dyn BufRead>,
        _options: &SourceOptions,
    ) -> Result<RawRows, BoxError> {
        let documents = serde_json::Deserializer::from_reader(input).into_iter::<Value>();
        Ok(Box::new(JsonRows {
            documents,
            pending: None,
            failed: false,
        }))
    }
}

struct JsonRows {
    documents: StreamDeserializer<'static, IoRead<Box<dyn BufRead>>, Value>,
    pending: Option<RowIter>,
    failed: bool,
}

impl Iterator for JsonRows {
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
            match self.documents.next()? {
                Ok(document) => self.pending = Some(rows(document)),
                Err(e) => {
                    // The stream cannot resynchronise after a syntax error
                    self.failed = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}
