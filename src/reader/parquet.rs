//! Parquet reader, built on the row-oriented record API.

use std::collections::HashSet;
use std::path::Path;

use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field as ParquetField;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, DataType, Schema, Value};

use super::{Cell, missing_column};

/// Read a Parquet file. Every schema field must exist as a leaf column path.
pub fn read_parquet_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;

    let leaves: HashSet<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.path().string())
        .collect();
    if let Some(field) = schema.fields.iter().find(|f| !leaves.contains(&f.name)) {
        return Err(missing_column(&field.name, ""));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.into_iter().enumerate() {
        let record = record?;
        let row_num = idx + 1;
        let row = schema
            .fields
            .iter()
            .map(|field| {
                let value = record
                    .get_column_iter()
                    .find(|(name, _)| name.as_str() == field.name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| IngestionError::SchemaMismatch {
                        message: format!("row {row_num} missing required column '{}'", field.name),
                    })?;
                convert(Cell { row: row_num, column: &field.name }, field.data_type, value)
            })
            .collect::<IngestionResult<Vec<Value>>>()?;
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn convert(cell: Cell<'_>, data_type: DataType, f: &ParquetField) -> IngestionResult<Value> {
    use ParquetField as P;

    if matches!(f, P::Null) {
        return Ok(Value::Null);
    }

    match (data_type, f) {
        (DataType::Utf8, P::Str(s)) => Ok(Value::Utf8(s.clone())),
        (DataType::Bool, P::Bool(b)) => Ok(Value::Bool(*b)),
        (DataType::Int64, P::Byte(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, P::Short(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, P::Int(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, P::Long(v)) => Ok(Value::Int64(*v)),
        (DataType::Int64, P::UByte(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, P::UShort(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, P::UInt(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, P::ULong(v)) => cell.int_from_u64(f, *v),
        (DataType::Float64, P::Float(v)) => Ok(Value::Float64(f64::from(*v))),
        (DataType::Float64, P::Double(v)) => Ok(Value::Float64(*v)),
        (expected, _) => Err(cell.error(f, format!("expected {}", type_label(expected)))),
    }
}

fn type_label(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Utf8 => "string",
        DataType::Bool => "bool",
        DataType::Int64 => "integer",
        DataType::Float64 => "number",
    }
}
