//! JSON reader.
//!
//! Accepts a JSON array of objects, a single object, or newline-delimited objects. Schema
//! field names containing dots address nested objects (`user.name`).

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as Json};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, DataType, Schema, Value};

use super::Cell;

pub fn read_json_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let text = fs::read_to_string(path)?;
    read_json_str(&text, schema)
}

pub fn read_json_str(input: &str, schema: &Schema) -> IngestionResult<DataSet> {
    let documents = split_documents(input)?;
    let mut rows = Vec::with_capacity(documents.len());
    for (idx, doc) in documents.iter().enumerate() {
        rows.push(object_to_row(idx + 1, doc, schema)?);
    }
    Ok(DataSet::new(schema.clone(), rows))
}

fn split_documents(input: &str) -> IngestionResult<Vec<Json>> {
    let text = input.trim();
    if text.is_empty() {
        return Err(IngestionError::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    match serde_json::from_str::<Json>(text) {
        Ok(Json::Array(items)) => Ok(items),
        Ok(obj @ Json::Object(_)) => Ok(vec![obj]),
        Ok(_) => Err(IngestionError::SchemaMismatch {
            message: "json must be an object, an array of objects, or NDJSON".to_string(),
        }),
        // Not a single document: treat as NDJSON.
        Err(_) => text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<Json>(line.trim()).map_err(|e| IngestionError::SchemaMismatch {
                    message: format!("invalid ndjson at line {}: {e}", i + 1),
                })
            })
            .collect(),
    }
}

fn object_to_row(row: usize, doc: &Json, schema: &Schema) -> IngestionResult<Vec<Value>> {
    let obj = doc.as_object().ok_or_else(|| IngestionError::SchemaMismatch {
        message: format!("row {row} is not a json object"),
    })?;

    schema
        .fields
        .iter()
        .map(|field| {
            let v = lookup(obj, &field.name).ok_or_else(|| IngestionError::SchemaMismatch {
                message: format!("row {row} missing required field '{}'", field.name),
            })?;
            convert(Cell { row, column: &field.name }, field.data_type, v)
        })
        .collect()
}

fn lookup<'a>(root: &'a Map<String, Json>, path: &str) -> Option<&'a Json> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn convert(cell: Cell<'_>, data_type: DataType, v: &Json) -> IngestionResult<Value> {
    if v.is_null() {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::Utf8 => v
            .as_str()
            .map(|s| Value::Utf8(s.to_string()))
            .ok_or_else(|| cell.error(v, "expected string")),
        DataType::Bool => v.as_bool().map(Value::Bool).ok_or_else(|| cell.error(v, "expected bool")),
        DataType::Int64 => match (v.as_i64(), v.as_u64()) {
            (Some(n), _) => Ok(Value::Int64(n)),
            (None, Some(n)) => cell.int_from_u64(v, n),
            _ => Err(cell.error(v, "expected integer number")),
        },
        DataType::Float64 => v.as_f64().map(Value::Float64).ok_or_else(|| cell.error(v, "expected number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_paths_reach_nested_objects() {
        let doc: Json = serde_json::json!({"user": {"name": "Ada", "meta": {"age": 36}}});
        let obj = doc.as_object().unwrap();
        assert_eq!(lookup(obj, "user.name"), Some(&Json::from("Ada")));
        assert_eq!(lookup(obj, "user.meta.age"), Some(&Json::from(36)));
        assert_eq!(lookup(obj, "user.name.first"), None);
        assert_eq!(lookup(obj, "missing"), None);
    }
}
