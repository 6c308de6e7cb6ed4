//! Spreadsheet decoding (xls, xlsx, xlsb, ods)
//!
//! Reads one worksheet: the configured sheet, or the first sheet of the
//! workbook. The first row supplies the field names.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::{Number, Value};
use std::io::{BufRead, Cursor, Read};

use super::{Decoder, RawRows};
use crate::error::BoxError;
use crate::format::FormatTag;
use crate::record::Record;
use crate::source::SourceOptions;

/// Decoder for workbook files
pub struct SpreadsheetDecoder;

impl Decoder for SpreadsheetDecoder {
    fn format(&self) -> FormatTag {
        FormatTag::Xls
    }

    fn decode(
        &self,
        mut input: Box<dyn BufRead>,
        options: &SourceOptions,
    ) -> Result<RawRows, BoxError> {
        // Workbook containers need random access
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;

        let mut workbook =
            open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| e.to_string())?;
        let sheet = match &options.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or("workbook has no sheets")?,
        };
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| format!("sheet {:?}: {}", sheet, e))?;

        let mut lines = range.rows();
        let headers: Vec<String> = match lines.next() {
            Some(first) => first.iter().map(|cell| cell.to_string()).collect(),
            None => return Ok(Box::new(std::iter::empty())),
        };

        let rows: Vec<Value> = lines
            .map(|line| {
                let mut row = Record::new();
                for (index, header) in headers.iter().enumerate() {
                    let value = line.get(index).map(cell_value).unwrap_or(Value::Null);
                    row.insert(header.clone(), value);
                }
                Value::Object(row)
            })
            .collect();
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}
