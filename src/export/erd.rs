//! Entity-relationship summary

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::catalog::{Cardinality, TableSchema};
use crate::error::{Error, Result};
use crate::storage::Workspace;

/// File name of the ERD inside the database directory. The extension keeps
/// it apart from row files, so a table named ERD is never overwritten.
pub const ERD_FILE_NAME: &str = "ERD.erd";

/// Render the ERD of a database
pub fn render_erd(workspace: &Workspace, database: &str) -> Result<String> {
    let db = workspace.open(database)?;

    let mut tables = Vec::new();
    for table in db.tables().list()? {
        let schema = match db.schemas().load_for_export(&table) {
            Ok(schema) => Some(schema),
            Err(Error::MetadataMissing(_)) => None,
            Err(Error::InvalidFormat(reason)) => {
                warn!(database, table = %table, reason = %reason, "unreadable metadata, header used");
                None
            }
            Err(e) => return Err(e),
        };
        tables.push((table, schema));
    }

    let known: Vec<&TableSchema> = tables.iter().filter_map(|(_, s)| s.as_ref()).collect();
    let is_key = |table: &str, column: &str| {
        known
            .iter()
            .any(|s| s.name() == table && s.is_primary_key(column))
    };

    let mut out = format!("Entity-Relationship Diagram for database: {}\n\n", db.name());
    for (table, schema) in &tables {
        out.push_str(&format!("Table: {}\n", table));

        let (columns, keys) = match schema {
            Some(schema) => (schema.column_names(), schema.primary_keys()),
            None => (db.tables().header(table)?, Vec::new()),
        };
        out.push_str(&format!("Columns: {}\n", columns.join(", ")));
        out.push_str(&format!("Primary Keys: {}\n", keys.join(", ")));

        let relationships = schema.as_ref().map(|s| s.relationships()).unwrap_or(&[]);
        if relationships.is_empty() {
            out.push_str("No relationships found for this table.\n");
        }
        for rel in relationships {
            let cardinality = Cardinality::derive(
                is_key(&rel.source_table, &rel.source_column),
                is_key(&rel.target_table, &rel.target_column),
            );
            out.push_str(&format!(
                "Relationship: {} ({}) -> {} ({}) - Cardinality: {}\n",
                table, rel.source_column, rel.target_table, rel.target_column, cardinality
            ));
        }
        out.push('\n');
    }
    Ok(out)
}

/// Write the ERD to `ERD.erd` in the database directory
pub fn export_erd(workspace: &Workspace, database: &str) -> Result<PathBuf> {
    let text = render_erd(workspace, database)?;
    let path = workspace.database_path(database).join(ERD_FILE_NAME);
    fs::write(&path, text)?;
    info!(database, path = %path.display(), "ERD exported");
    Ok(path)
}
