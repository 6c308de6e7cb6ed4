//! Pickle decoding
//!
//! The whole stream is one pickled object. Dicts, lists and tuples map onto
//! their JSON counterparts; a list or tuple at the top level yields one row
//! per element.

use serde_pickle::DeOptions;
use serde_json::Value;
use std::io::BufRead;

use super::{Decoder, RawRows};
use crate::error::BoxError;
use crate::format::FormatTag;
use crate::record::rows;
use crate::source::SourceOptions;

/// Decoder for Python pickle streams
pub struct PickleDecoder;

impl Decoder for PickleDecoder {
    fn format(&self) -> FormatTag {
        FormatTag::Pickle
    }

    fn decode(
        &self,
        input: Box<dyn BufRead>,
        _options: &SourceOptions,
    ) -> Result<RawRows, BoxError> {
        let value: Value = serde_pickle::from_reader(input, DeOptions::new())?;
        Ok(Box::new(rows(value).map(Ok)))
    }
}
