//! CREATE, USE and DROP

use std::collections::HashSet;

use tracing::{info, warn};

use super::executor::{ExecutionEngine, QueryResult};
use crate::catalog::{ColumnSchema, TableSchema};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::sql::ast::CreateTableStatement;

impl ExecutionEngine {
    pub(super) fn execute_create_database(&mut self, name: &str) -> Result<QueryResult> {
        self.workspace().create_database(name)?;
        Ok(QueryResult::with_message(format!(
            "Database {} created",
            name.to_uppercase()
        )))
    }

    pub(super) fn execute_use(&mut self, session: &mut Session, name: &str) -> Result<QueryResult> {
        if !self.workspace().database_exists(name) {
            warn!(database = name, "USE of missing database");
            return Ok(QueryResult::with_message(format!(
                "Database {} does not exist",
                name.to_uppercase()
            )));
        }
        session.set_active_database(name);
        Ok(QueryResult::with_message(format!(
            "Using database {}",
            name.to_uppercase()
        )))
    }

    pub(super) fn execute_create_table(
        &mut self,
        session: &Session,
        create: CreateTableStatement,
    ) -> Result<QueryResult> {
        let db = self.active_database(session)?;
        let table = create.table_name;

        let mut seen = HashSet::new();
        for col in &create.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::InvalidFormat(format!(
                    "duplicate column '{}' in table '{}'",
                    col.name, table
                )));
            }
        }

        if db.tables().exists(&table) || db.schemas().exists(&table) {
            return Err(Error::TableAlreadyExists(table));
        }

        let mut schema = TableSchema::from_columns(
            &table,
            create
                .columns
                .iter()
                .map(|c| ColumnSchema::new(&c.name, &c.data_type).primary_key(c.primary_key))
                .collect(),
        );

        let others: Vec<TableSchema> = db
            .schemas()
            .list()?
            .into_iter()
            .filter(|s| s.name() != schema.name())
            .collect();

        let mut notes = Vec::new();
        for choice in self.prompt().relationships(&schema, &others)? {
            match choice.resolve(&schema, &others) {
                Ok(relationship) => {
                    notes.push(format!("relationship {} defined", relationship));
                    schema.add_relationship(relationship);
                }
                Err(reason) => {
                    warn!(table = %table, reason = %reason, "relationship rejected");
                    notes.push(format!("relationship not defined: {}", reason));
                }
            }
        }

        db.tables().create(&table, &schema.column_names())?;
        db.schemas().define_table(&schema)?;
        info!(database = db.name(), table = %table, "table created");

        let mut message = format!("Table {} created", table);
        for note in notes {
            message.push_str("; ");
            message.push_str(&note);
        }
        Ok(QueryResult::with_message(message))
    }

    /// Row file and metadata are removed independently; a missing one is
    /// reported, never an error.
    pub(super) fn execute_drop_table(&mut self, session: &Session, table: &str) -> Result<QueryResult> {
        let db = self.active_database(session)?;

        let rows_removed = db.tables().remove(table)?;
        let meta_removed = db.schemas().remove(table)?;

        let message = match (rows_removed, meta_removed) {
            (true, true) => format!("Table {} dropped", table),
            (true, false) => format!("Table {} dropped; no metadata file found", table),
            (false, true) => format!("Metadata for table {} dropped; no row file found", table),
            (false, false) => format!("Table {} does not exist", table),
        };
        if rows_removed || meta_removed {
            info!(database = db.name(), table, rows_removed, meta_removed, "table dropped");
        }
        Ok(QueryResult::with_message(message))
    }
}
