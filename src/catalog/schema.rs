//! Schema definitions for TinyDB
//!
//! This module defines table schemas, column metadata and relationships.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name (upper-cased)
    pub name: String,
    /// Declared type, kept as free text
    pub data_type: String,
    /// Is this part of the primary key?
    pub primary_key: bool,
}

impl ColumnSchema {
    /// Create a new non-key column
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into().to_uppercase(),
            data_type: data_type.into(),
            primary_key: false,
        }
    }

    /// Set primary key flag
    pub fn primary_key(mut self, pk: bool) -> Self {
        self.primary_key = pk;
        self
    }
}

/// A link from a column of one table to a column of another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

impl Relationship {
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into().to_uppercase(),
            source_column: source_column.into().to_uppercase(),
            target_table: target_table.into().to_uppercase(),
            target_column: target_column.into().to_uppercase(),
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "From {}({}) to {}({})",
            self.source_table, self.source_column, self.target_table, self.target_column
        )
    }
}

/// Relationship cardinality, derived from which ends are primary keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    OneToOne,
    ManyToOne,
    Unknown,
}

impl Cardinality {
    pub fn derive(source_is_key: bool, target_is_key: bool) -> Self {
        match (source_is_key, target_is_key) {
            (true, true) => Cardinality::OneToOne,
            (true, false) | (false, true) => Cardinality::ManyToOne,
            (false, false) => Cardinality::Unknown,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::OneToOne => write!(f, "1-to-1"),
            Cardinality::ManyToOne => write!(f, "many-to-1"),
            Cardinality::Unknown => write!(f, "unknown"),
        }
    }
}

/// Table schema - everything the metadata file records about a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name (upper-cased)
    name: String,
    /// Ordered list of columns
    columns: Vec<ColumnSchema>,
    /// Column name to index mapping
    name_to_index: HashMap<String, usize>,
    /// Outgoing relationships
    relationships: Vec<Relationship>,
}

impl TableSchema {
    /// Create a new empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_uppercase(),
            columns: Vec::new(),
            name_to_index: HashMap::new(),
            relationships: Vec::new(),
        }
    }

    /// Create a schema from a list of columns
    pub fn from_columns(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        let mut schema = Self::new(name);
        for col in columns {
            schema.add_column(col);
        }
        schema
    }

    /// Add a column to the schema
    pub fn add_column(&mut self, column: ColumnSchema) {
        self.name_to_index
            .insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
    }

    /// Add an outgoing relationship
    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get column by name, case-insensitively
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.name_to_index
            .get(&name.to_uppercase())
            .map(|&idx| &self.columns[idx])
    }

    /// Get all columns
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Get column names in declared order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Get primary key column names in declared order
    pub fn primary_keys(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Check whether a column is part of the primary key
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.get_column(name).is_some_and(|c| c.primary_key)
    }

    /// Get outgoing relationships
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creation() {
        let schema = TableSchema::from_columns(
            "people",
            vec![
                ColumnSchema::new("id", "INT").primary_key(true),
                ColumnSchema::new("name", "STRING"),
            ],
        );

        assert_eq!(schema.name(), "PEOPLE");
        assert_eq!(schema.column_names(), vec!["ID", "NAME"]);
        assert!(schema.has_column("name"));
        assert!(!schema.has_column("unknown"));
        assert!(schema.is_primary_key("Id"));
        assert!(!schema.is_primary_key("NAME"));
        assert_eq!(schema.primary_keys(), vec!["ID"]);
    }

    #[test]
    fn test_relationship_display() {
        let rel = Relationship::new("orders", "pid", "people", "id");
        assert_eq!(rel.to_string(), "From ORDERS(PID) to PEOPLE(ID)");
    }

    #[test]
    fn test_cardinality() {
        assert_eq!(Cardinality::derive(true, true), Cardinality::OneToOne);
        assert_eq!(Cardinality::derive(false, true), Cardinality::ManyToOne);
        assert_eq!(Cardinality::derive(true, false), Cardinality::ManyToOne);
        assert_eq!(Cardinality::derive(false, false).to_string(), "unknown");
    }
}
