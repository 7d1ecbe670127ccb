//! Relationship definition during CREATE TABLE
//!
//! The engine asks a [`RelationshipPrompt`] which relationships the new table
//! should carry. The shell answers interactively; library callers inject a
//! fixed answer.

use crate::catalog::{Relationship, TableSchema};
use crate::error::Result;

/// A relationship as chosen by the user, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipChoice {
    /// Column of the table being created
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

impl RelationshipChoice {
    pub fn new(
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            source_column: source_column.into().to_uppercase(),
            target_table: target_table.into().to_uppercase(),
            target_column: target_column.into().to_uppercase(),
        }
    }

    /// Check the choice against the new table and the existing ones.
    /// The target column must be a primary key of the target table.
    pub fn resolve(
        &self,
        table: &TableSchema,
        others: &[TableSchema],
    ) -> std::result::Result<Relationship, String> {
        if !table.has_column(&self.source_column) {
            return Err(format!(
                "column '{}' is not part of table '{}'",
                self.source_column,
                table.name()
            ));
        }
        let target = others
            .iter()
            .find(|t| t.name() == self.target_table)
            .ok_or_else(|| format!("table '{}' does not exist", self.target_table))?;
        if !target.has_column(&self.target_column) {
            return Err(format!(
                "column '{}' does not exist in table '{}'",
                self.target_column, self.target_table
            ));
        }
        if !target.is_primary_key(&self.target_column) {
            return Err(format!(
                "column '{}' is not the primary key of table '{}'",
                self.target_column, self.target_table
            ));
        }
        Ok(Relationship::new(
            table.name(),
            &self.source_column,
            &self.target_table,
            &self.target_column,
        ))
    }
}

/// Asks which relationships a new table should have
pub trait RelationshipPrompt {
    /// `table` is the table being created, `others` every other table in
    /// the active database.
    fn relationships(
        &mut self,
        table: &TableSchema,
        others: &[TableSchema],
    ) -> Result<Vec<RelationshipChoice>>;
}

/// Never defines relationships
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRelationships;

impl RelationshipPrompt for NoRelationships {
    fn relationships(
        &mut self,
        _table: &TableSchema,
        _others: &[TableSchema],
    ) -> Result<Vec<RelationshipChoice>> {
        Ok(Vec::new())
    }
}

/// Answers from a fixed list, keyed by the name of the table being created
#[derive(Debug, Default, Clone)]
pub struct FixedRelationships {
    choices: Vec<(String, RelationshipChoice)>,
}

impl FixedRelationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a relationship for `table` when it gets created
    pub fn with(mut self, table: impl Into<String>, choice: RelationshipChoice) -> Self {
        self.choices.push((table.into().to_uppercase(), choice));
        self
    }
}

impl RelationshipPrompt for FixedRelationships {
    fn relationships(
        &mut self,
        table: &TableSchema,
        _others: &[TableSchema],
    ) -> Result<Vec<RelationshipChoice>> {
        Ok(self
            .choices
            .iter()
            .filter(|(name, _)| name == table.name())
            .map(|(_, choice)| choice.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnSchema;

    fn people() -> TableSchema {
        TableSchema::from_columns(
            "P",
            vec![
                ColumnSchema::new("ID", "INT").primary_key(true),
                ColumnSchema::new("NAME", "STRING"),
            ],
        )
    }

    fn orders() -> TableSchema {
        TableSchema::from_columns(
            "ORDERS",
            vec![
                ColumnSchema::new("OID", "INT").primary_key(true),
                ColumnSchema::new("PID", "INT"),
            ],
        )
    }

    #[test]
    fn test_resolve_valid_choice() {
        let rel = RelationshipChoice::new("pid", "p", "id")
            .resolve(&orders(), &[people()])
            .unwrap();
        assert_eq!(rel.to_string(), "From ORDERS(PID) to P(ID)");
    }

    #[test]
    fn test_resolve_rejects_bad_choices() {
        let others = [people()];
        assert!(RelationshipChoice::new("X", "P", "ID")
            .resolve(&orders(), &others)
            .is_err());
        assert!(RelationshipChoice::new("PID", "Q", "ID")
            .resolve(&orders(), &others)
            .is_err());
        let err = RelationshipChoice::new("PID", "P", "NAME")
            .resolve(&orders(), &others)
            .unwrap_err();
        assert!(err.contains("not the primary key"));
    }

    #[test]
    fn test_fixed_relationships_by_table() {
        let mut prompt =
            FixedRelationships::new().with("orders", RelationshipChoice::new("PID", "P", "ID"));

        assert!(prompt.relationships(&people(), &[]).unwrap().is_empty());
        assert_eq!(prompt.relationships(&orders(), &[]).unwrap().len(), 1);
    }
}
