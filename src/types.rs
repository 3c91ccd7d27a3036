//! Core data model shared by readers, ingesters and data providers.
//!
//! Ingested files become in-memory [`DataSet`]s shaped by a caller-provided [`Schema`].
//! Each ingested file is published as a named run, described by [`RunInfo`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{IngesterError, IngesterResult};

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// Parse a type name as written in a `schema` flag (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "int64" | "i64" | "int" => Some(Self::Int64),
            "float64" | "f64" | "float" | "double" => Some(Self::Float64),
            "bool" | "boolean" => Some(Self::Bool),
            "utf8" | "string" | "str" => Some(Self::Utf8),
            _ => None,
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field/column name. JSON sources may use dotted paths (`user.name`).
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the expected shape of every ingested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Parse the compact `name:type[,name:type...]` form used by the `schema` flag.
    ///
    /// ```rust
    /// use data_ingester::types::{DataType, Schema};
    ///
    /// let schema = Schema::parse_spec("step:int64, loss:float64").unwrap();
    /// assert_eq!(schema.fields.len(), 2);
    /// assert_eq!(schema.fields[1].data_type, DataType::Float64);
    /// ```
    pub fn parse_spec(spec: &str) -> IngesterResult<Self> {
        let bad = |message: String| IngesterError::invalid_flag("schema", message);

        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, ty) = entry
                .split_once(':')
                .ok_or_else(|| bad(format!("expected 'name:type', got '{entry}'")))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(bad(format!("empty field name in '{entry}'")));
            }
            let data_type =
                DataType::from_name(ty).ok_or_else(|| bad(format!("unknown type '{}' for field '{name}'", ty.trim())))?;
            if !seen.insert(name.to_string()) {
                return Err(bad(format!("duplicate field '{name}'")));
            }
            fields.push(Field::new(name, data_type));
        }

        if fields.is_empty() {
            return Err(bad("schema must declare at least one field".to_string()));
        }
        Ok(Self { fields })
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Utf8(String),
}

/// In-memory tabular dataset.
///
/// Rows are stored row-major in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    pub schema: Schema,
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column, in row order. `None` if the schema has no such field.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }
}

/// Description of one ingested run, as served by a [`crate::provider::DataProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Run name, unique within a provider (`/`-separated for directory sources).
    pub name: String,
    /// Where the run was loaded from (file path).
    pub location: String,
    pub row_count: usize,
    /// Unix timestamp (seconds) of the most recent successful load.
    pub loaded_at: u64,
}
