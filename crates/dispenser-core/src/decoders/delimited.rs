//! CSV decoding
//!
//! The first row is the header row. Every later row becomes a record whose
//! values are strings, keyed by header in header order. Short rows are padded
//! with `null`; a row with more fields than the header is a decode error.

use csv::{StringRecord, StringRecordsIntoIter};
use serde_json::Value;
use std::io::BufRead;

use super::{Decoder, RawRows};
use crate::error::BoxError;
use crate::format::FormatTag;
use crate::record::Record;
use crate::source::SourceOptions;

/// Decoder for delimited text with a header row
pub struct CsvDecoder;

impl Decoder for CsvDecoder {
    fn format(&self) -> FormatTag {
        FormatTag::Csv
    }

    fn decode(
        &self,
        input: Box<dyn BufRead>,
        options: &SourceOptions,
    ) -> Result<RawRows, BoxError> {
        let delimiter = options.csv.delimiter;
        if !delimiter.is_ascii() {
            return Err(format!("delimiter {:?} is not a single-byte character", delimiter).into());
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter as u8)
            .flexible(true)
            .from_reader(input);
        let headers = reader.headers()?.clone();
        Ok(Box::new(CsvRows {
            headers,
            records: reader.into_records(),
        }))
    }
}

struct CsvRows {
    headers: StringRecord,
    records: StringRecordsIntoIter<Box<dyn BufRead>>,
}

impl CsvRows {
    fn to_row(&self, record: StringRecord) -> Result<Value, BoxError> {
        if record.len() > self.headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(format!(
                "line {}: found {} fields but the header has {}",
                line,
                record.len(),
                self.headers.len()
            )
            .into());
        }

        let mut row = Record::new();
        for (index, header) in self.headers.iter().enumerate() {
            let value = record
                .get(index)
                .map(|field| Value::String(field.to_string()))
                .unwrap_or(Value::Null);
            row.insert(header.to_string(), value);
        }
        Ok(Value::Object(row))
    }
}

impl Iterator for CsvRows {
    type Item = Result<Value, BoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(record.map_err(BoxError::from).and_then(|r| self.to_row(r)))
    }
}
