//! Row type for TinyDB
//!
//! A row is an ordered map from column name to raw string value.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};

/// A row in a table, keyed by header column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row {
    fields: IndexMap<String, String>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from header columns and a raw line. Missing trailing
    /// fields become empty strings; extra fields are ignored.
    pub fn from_line(header: &[String], line: &str) -> Self {
        let mut parts = line.split(',');
        let fields = header
            .iter()
            .map(|col| (col.clone(), parts.next().unwrap_or("").to_string()))
            .collect();
        Self { fields }
    }

    /// Build a row from header columns and values in header order
    pub fn from_values(header: &[String], values: Vec<String>) -> Self {
        Self {
            fields: header.iter().cloned().zip(values).collect(),
        }
    }

    /// Get a value by column name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Set a value, keeping the column's position if it already exists
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(String::as_str)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the row has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize to the row-file line format (no trailing newline)
    pub fn to_line(&self) -> Result<String> {
        for value in self.fields.values() {
            check_value(value)?;
        }
        Ok(self.values().collect::<Vec<_>>().join(","))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// The row format has no escaping, so separators cannot appear in a value.
pub fn check_value(value: &str) -> Result<()> {
    if value.contains([',', '\n', '\r']) {
        return Err(Error::InvalidFormat(format!(
            "value '{}' contains a comma or line break",
            value.escape_debug()
        )));
    }
    Ok(())
}

/// Remove one layer of matching surrounding quotes, if present
pub fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
