//! SQL dump
//!
//! Renders every table of a database as a `CREATE TABLE` followed by one
//! multi-row `INSERT`.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::catalog::TableSchema;
use crate::error::{Error, Result};
use crate::storage::row::strip_quotes;
use crate::storage::{Database, Workspace};

/// Render a database as SQL
pub fn dump_database(workspace: &Workspace, database: &str) -> Result<String> {
    let db = workspace.open(database)?;

    let mut out = String::new();
    for table in db.tables().list()? {
        let schema = match db.schemas().load_for_export(&table) {
            Ok(schema) => schema,
            Err(Error::MetadataMissing(_)) => {
                warn!(database, table = %table, "no metadata, table skipped");
                out.push_str(&format!("-- Skipped table {}: metadata missing\n\n", table));
                continue;
            }
            Err(Error::InvalidFormat(reason)) => {
                warn!(database, table = %table, reason = %reason, "unreadable metadata, table skipped");
                out.push_str(&format!("-- Skipped table {}: metadata unreadable\n\n", table));
                continue;
            }
            Err(e) => return Err(e),
        };
        out.push_str(&create_table(&schema));
        out.push_str(&insert_rows(&db, &table)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write the dump of a database to `path`
pub fn export_sql(workspace: &Workspace, database: &str, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let sql = dump_database(workspace, database)?;
    fs::write(path, sql)?;
    info!(database, path = %path.display(), "SQL dump exported");
    Ok(())
}

fn create_table(schema: &TableSchema) -> String {
    let mut items: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| {
            if c.primary_key {
                format!("  {} {} PRIMARY KEY", c.name, c.data_type)
            } else {
                format!("  {} {}", c.name, c.data_type)
            }
        })
        .collect();
    for rel in schema.relationships() {
        items.push(format!(
            "  {} REFERENCES {}({})",
            rel.source_column, rel.target_table, rel.target_column
        ));
    }
    format!("CREATE TABLE {} (\n{}\n);\n", schema.name(), items.join(",\n"))
}

fn insert_rows(db: &Database, table: &str) -> Result<String> {
    let rows = db.tables().scan(table)?;
    let header = rows.header().to_vec();

    let mut tuples = Vec::new();
    for row in rows {
        let row = row?;
        let values: Vec<String> = row.values().map(|v| quote(strip_quotes(v))).collect();
        tuples.push(format!("({})", values.join(", ")));
    }

    if tuples.is_empty() {
        return Ok(format!("-- No data to insert for table {}\n", table));
    }
    Ok(format!(
        "INSERT INTO {} ({}) VALUES\n{};\n",
        table,
        header.join(", "),
        tuples.join(",\n")
    ))
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
