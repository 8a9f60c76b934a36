//! Reading the flat record sources of the three datasets
//!
//! Every dataset is a list of [`Record`]s, regardless of whether it was
//! provided as newline-delimited JSON or as a tab-delimited table.
//! List-like fields stay unparsed until a normalizer asks for them
//! via [`Record::list`], which routes every serialized value through
//! the same [`literal`] parser.

use std::path::Path;

use serde_json::{Map, Value};

use crate::ModlocResult;

pub mod json_lines;
pub mod literal;
pub mod tsv;

/// A single flat row of an input dataset
///
/// Keys are column names, nested JSON objects are flattened into
/// dotted names (e.g. `linkedTargets.rows`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Constructs an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of the column `key`
    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Returns the value of the column `key`
    ///
    /// Returns `None` if the column is missing or null
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.fields.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    /// Returns the value of a scalar column as text
    ///
    /// Numbers and booleans are converted to their textual representation.
    /// Returns `None` for missing or null values. Strings are kept as they
    /// are, missing-data markers of delimited tables are already null.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_text)
    }

    /// Returns the value of a list-like column
    ///
    /// Already structured values are returned as they are, serialized values
    /// are parsed with [`literal::parse`]. A structured scalar or object is
    /// treated as a list with a single element.
    ///
    /// Returns `Ok(None)` if the column is missing or null
    ///
    /// # Errors
    ///
    /// [`crate::ModlocError::MalformedLiteral`] if the serialized value cannot be parsed
    pub fn list(&self, key: &str) -> ModlocResult<Option<Vec<Value>>> {
        let parsed = match self.get(key) {
            None => return Ok(None),
            Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(None),
            Some(Value::String(raw)) => literal::parse(raw)?,
            Some(value) => value.clone(),
        };
        Ok(match parsed {
            Value::Null => None,
            Value::Array(values) => Some(values),
            other => Some(vec![other]),
        })
    }

    /// Iterates all `(column, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Returns the number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record does not contain any column
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Converts a scalar JSON value to text
///
/// Returns `None` for null, lists and objects
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Reads all records of a dataset file
///
/// Files ending in `.json`, `.jsonl` or `.ndjson` are read as newline-delimited
/// JSON, every other file as a tab-delimited table with a header row.
///
/// # Errors
///
/// - [`crate::ModlocError::CannotOpenFile`] if the file does not exist
/// - [`crate::ModlocError::InvalidInput`] if a line is not a JSON object
/// - [`crate::ModlocError::Csv`] if the table is malformed
pub fn read_records<P: AsRef<Path>>(file: P) -> ModlocResult<Vec<Record>> {
    let is_json = file
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "json" | "jsonl" | "ndjson"));
    if is_json {
        json_lines::read(file)
    } else {
        tsv::read(file)
    }
}
