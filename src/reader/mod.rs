//! File readers that turn one data file into a [`DataSet`].
//!
//! Ingesters call [`read_path`], which picks a reader from the file extension unless a
//! [`DataFormat`] is forced. Format-specific entrypoints live in [`csv`], [`json`] and
//! [`parquet`].

pub mod csv;
pub mod json;
pub mod parquet;

use std::fmt;
use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, Schema, Value};

/// File formats understood by the readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// JSON array-of-objects, a single object, or newline-delimited objects.
    Json,
    /// Apache Parquet.
    Parquet,
}

impl DataFormat {
    /// Map a file extension (case-insensitive) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// Parse a format name as written in a `format` flag.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// Format implied by a path's extension, if any.
    pub fn for_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Parquet => "parquet",
        };
        f.write_str(name)
    }
}

/// Load `path` into a [`DataSet`] shaped by `schema`.
///
/// With `format == None` the reader is chosen from the file extension; a path without a
/// recognised extension yields [`IngestionError::UnsupportedFormat`].
pub fn read_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    format: Option<DataFormat>,
) -> IngestionResult<DataSet> {
    let path = path.as_ref();
    let format = match format {
        Some(f) => f,
        None => DataFormat::for_path(path).ok_or_else(|| IngestionError::UnsupportedFormat {
            message: format!("cannot infer format from path ({})", path.display()),
        })?,
    };

    match format {
        DataFormat::Csv => csv::read_csv_path(path, schema),
        DataFormat::Json => json::read_json_path(path, schema),
        DataFormat::Parquet => parquet::read_parquet_path(path, schema),
    }
}

/// Location of a cell being converted, used to build [`IngestionError::ParseError`]s.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cell<'a> {
    pub row: usize,
    pub column: &'a str,
}

impl Cell<'_> {
    pub(crate) fn error(&self, raw: impl fmt::Display, message: impl Into<String>) -> IngestionError {
        IngestionError::ParseError {
            row: self.row,
            column: self.column.to_string(),
            raw: raw.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn int_from_u64(&self, raw: impl fmt::Display, v: u64) -> IngestionResult<Value> {
        i64::try_from(v)
            .map(Value::Int64)
            .map_err(|_| self.error(raw, "u64 out of range for i64"))
    }
}

pub(crate) fn missing_column(name: &str, context: impl fmt::Display) -> IngestionError {
    IngestionError::SchemaMismatch {
        message: format!("missing required column '{name}'{context}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection_is_case_insensitive() {
        assert_eq!(DataFormat::for_path(Path::new("a/B.CSV")), Some(DataFormat::Csv));
        assert_eq!(DataFormat::for_path(Path::new("events.jsonl")), Some(DataFormat::Json));
        assert_eq!(DataFormat::for_path(Path::new("t.pq")), Some(DataFormat::Parquet));
        assert_eq!(DataFormat::for_path(Path::new("notes.txt")), None);
        assert_eq!(DataFormat::for_path(Path::new("no_extension")), None);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let schema = Schema::new(vec![]);
        let err = read_path("events.tfevents", &schema, None).unwrap_err();
        assert!(matches!(err, IngestionError::UnsupportedFormat { .. }));
    }
}
