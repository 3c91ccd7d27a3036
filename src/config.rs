//! Ingester configuration.
//!
//! [`IngesterFlags`] is the parsed set of named options every ingester factory receives. It
//! plays the role of a command-line flags namespace: values are kept as strings and each
//! ingester kind interprets the flags it cares about through the typed accessors below.
//!
//! ```rust
//! use data_ingester::config::IngesterFlags;
//!
//! let flags = IngesterFlags::new()
//!     .with("logdir", "/tmp/runs")
//!     .with("schema", "step:int64,loss:float64")
//!     .with("reload_interval", "30");
//! assert_eq!(flags.get_u64("reload_interval", 5).unwrap(), 30);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IngesterError, IngesterResult};
use crate::types::Schema;

/// Named, caller-supplied options describing an ingestion source and its behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngesterFlags {
    values: BTreeMap<String, String>,
}

impl IngesterFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Self::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a flag, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Parse flags from a flat JSON object.
    ///
    /// Strings, numbers and booleans are accepted and stored in their textual form;
    /// `null` entries are skipped. Arrays and nested objects are rejected.
    pub fn from_json_str(input: &str) -> IngesterResult<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(input)?;
        let mut values = BTreeMap::new();
        for (name, value) in raw {
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                other => {
                    return Err(IngesterError::invalid_flag(
                        &name,
                        format!("expected a scalar value, got {other}"),
                    ));
                }
            };
            values.insert(name, text);
        }
        Ok(Self { values })
    }

    /// Read and parse a JSON flags file (see [`Self::from_json_str`]).
    pub fn from_json_file(path: impl AsRef<Path>) -> IngesterResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Like [`Self::get`] but treats a blank value as absent.
    pub fn get_nonempty(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get_u64(&self, name: &str, default: u64) -> IngesterResult<u64> {
        match self.get_nonempty(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| IngesterError::invalid_flag(name, format!("expected a non-negative integer: {e}"))),
        }
    }

    pub fn get_bool(&self, name: &str, default: bool) -> IngesterResult<bool> {
        match self.get_nonempty(name) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" | "y" => Ok(true),
                "false" | "f" | "0" | "no" | "n" => Ok(false),
                _ => Err(IngesterError::invalid_flag(name, format!("expected a boolean, got '{raw}'"))),
            },
        }
    }

    /// Interpret a flag as a non-negative number of seconds (fractions allowed).
    pub fn get_duration_secs(&self, name: &str, default: Duration) -> IngesterResult<Duration> {
        let Some(raw) = self.get_nonempty(name) else {
            return Ok(default);
        };
        let secs = raw
            .parse::<f64>()
            .map_err(|e| IngesterError::invalid_flag(name, format!("expected seconds: {e}")))?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| IngesterError::invalid_flag(name, format!("expected a non-negative number of seconds, got '{raw}'")))
    }

    /// Parse the `schema` flag. Missing schema is an [`IngesterError::InvalidFlag`].
    pub fn get_schema(&self) -> IngesterResult<Schema> {
        let spec = self
            .get_nonempty("schema")
            .ok_or_else(|| IngesterError::invalid_flag("schema", "required flag is missing"))?;
        Schema::parse_spec(spec)
    }
}
