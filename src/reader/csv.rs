//! CSV reader.
//!
//! The header row is required and must name every schema field; columns may appear in any
//! order and extra columns are ignored. Blank cells become [`Value::Null`].

use std::io::Read;
use std::path::Path;

use crate::error::IngestionResult;
use crate::types::{DataSet, DataType, Schema, Value};

use super::{Cell, missing_column};

pub fn read_csv_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let rdr = ::csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    read_csv(rdr, schema)
}

/// Read CSV from any byte source (e.g. an in-memory buffer).
pub fn read_csv_from_reader<R: Read>(input: R, schema: &Schema) -> IngestionResult<DataSet> {
    let rdr = ::csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    read_csv(rdr, schema)
}

fn read_csv<R: Read>(mut rdr: ::csv::Reader<R>, schema: &Schema) -> IngestionResult<DataSet> {
    let headers = rdr.headers()?.clone();
    let positions = schema
        .fields
        .iter()
        .map(|field| {
            headers.iter().position(|h| h.trim() == field.name).ok_or_else(|| {
                missing_column(&field.name, format!(". headers={:?}", headers.iter().collect::<Vec<_>>()))
            })
        })
        .collect::<IngestionResult<Vec<usize>>>()?;

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        // Line 1 is the header.
        let line = idx + 2;
        let row = schema
            .fields
            .iter()
            .zip(&positions)
            .map(|(field, &pos)| {
                let cell = Cell { row: line, column: &field.name };
                parse_cell(cell, field.data_type, record.get(pos).unwrap_or(""))
            })
            .collect::<IngestionResult<Vec<Value>>>()?;
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn parse_cell(cell: Cell<'_>, data_type: DataType, raw: &str) -> IngestionResult<Value> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(text.to_owned())),
        DataType::Int64 => text
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| cell.error(raw, e.to_string())),
        DataType::Float64 => text
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| cell.error(raw, e.to_string())),
        DataType::Bool => match text.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" => Ok(Value::Bool(true)),
            "false" | "f" | "0" | "no" | "n" => Ok(Value::Bool(false)),
            _ => Err(cell.error(raw, "expected bool (true/false/1/0/yes/no)")),
        },
    }
}
