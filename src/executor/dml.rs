//! INSERT, SELECT, UPDATE and DELETE
//!
//! Every read is a full scan of the row file. Values are strings; SELECT
//! conditions compare numerically, UPDATE and DELETE match by exact text.
//! A SELECT `=` against a non-numeric literal compares text instead of
//! failing with `NonNumericComparison`.

use tracing::{debug, info};

use super::executor::{ExecutionEngine, QueryResult};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::sql::ast::{
    CompareOp, Condition, DeleteStatement, InsertStatement, Projection, SelectStatement,
    UpdateStatement,
};
use crate::storage::row::{check_value, strip_quotes};
use crate::storage::{Database, Row};

impl ExecutionEngine {
    pub(super) fn execute_insert(
        &mut self,
        session: &Session,
        insert: InsertStatement,
    ) -> Result<QueryResult> {
        let db = self.active_database(session)?;
        let table = insert.table_name;

        require_table(&db, &table)?;
        let schema = db.schemas().load(&table)?;
        let header = db.tables().header(&table)?;

        let values = match &insert.columns {
            Some(columns) => {
                let mut values = vec![String::new(); header.len()];
                let mut given = vec![false; header.len()];
                for (column, value) in columns.iter().zip(&insert.values) {
                    let idx = column_index(&header, column, &table)?;
                    if given[idx] {
                        return Err(Error::InvalidFormat(format!(
                            "column '{}' given more than once",
                            column
                        )));
                    }
                    given[idx] = true;
                    values[idx] = value.clone();
                }
                for key in schema.primary_keys() {
                    if !columns.contains(&key) {
                        return Err(Error::InvalidFormat(format!(
                            "primary key column '{}' must be given a value",
                            key
                        )));
                    }
                }
                values
            }
            None => {
                if insert.values.len() != header.len() {
                    return Err(Error::InvalidFormat(format!(
                        "table '{}' has {} column(s) but {} value(s) were given",
                        table,
                        header.len(),
                        insert.values.len()
                    )));
                }
                insert.values
            }
        };
        for value in &values {
            check_value(value)?;
        }

        let keys = schema.primary_keys();
        if !keys.is_empty() {
            let new_row = Row::from_values(&header, values.clone());
            for row in db.tables().scan(&table)? {
                let row = row?;
                let duplicate = keys.iter().all(|key| {
                    strip_quotes(row.get(key).unwrap_or("")) == new_row.get(key).unwrap_or("")
                });
                if duplicate {
                    let key = keys
                        .iter()
                        .map(|k| format!("{}={}", k, new_row.get(k).unwrap_or("")))
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Err(Error::PrimaryKeyViolation { table, key });
                }
            }
        }

        db.tables().append(&table, &values)?;
        info!(database = db.name(), table = %table, "row inserted");
        Ok(QueryResult::with_affected_rows(
            1,
            format!("1 row inserted into {}", table),
        ))
    }

    pub(super) fn execute_select(
        &mut self,
        session: &Session,
        select: SelectStatement,
    ) -> Result<QueryResult> {
        let db = self.active_database(session)?;
        let table = select.table_name;

        let rows = db.tables().scan(&table)?;
        let header = rows.header().to_vec();

        let columns = match select.columns {
            Projection::Wildcard => header.clone(),
            Projection::Columns(columns) => {
                for (i, column) in columns.iter().enumerate() {
                    column_index(&header, column, &table)?;
                    if columns[..i].contains(column) {
                        return Err(Error::InvalidFormat(format!(
                            "column '{}' selected more than once",
                            column
                        )));
                    }
                }
                columns
            }
        };

        let filter = match &select.condition {
            Some(condition) => {
                column_index(&header, &condition.column, &table)?;
                Some(Filter::new(condition)?)
            }
            None => None,
        };

        let mut result = Vec::new();
        for row in rows {
            let row = row?;
            if filter.as_ref().is_some_and(|f| !f.matches(&row)) {
                continue;
            }
            let mut projected = Row::new();
            for column in &columns {
                projected.set(column.as_str(), strip_quotes(row.get(column).unwrap_or("")));
            }
            result.push(projected);
        }

        debug!(table = %table, rows = result.len(), "select finished");
        Ok(QueryResult::with_rows(columns, result))
    }

    pub(super) fn execute_update(
        &mut self,
        session: &Session,
        update: UpdateStatement,
    ) -> Result<QueryResult> {
        let db = self.active_database(session)?;
        let table = update.table_name;

        require_table(&db, &table)?;
        let schema = db.schemas().load(&table)?;
        for assignment in &update.assignments {
            if schema.is_primary_key(&assignment.column) {
                return Err(Error::PrimaryKeyImmutable(assignment.column.clone()));
            }
        }

        let header = db.tables().header(&table)?;
        for assignment in &update.assignments {
            column_index(&header, &assignment.column, &table)?;
            check_value(&assignment.value)?;
        }
        column_index(&header, &update.condition.column, &table)?;

        let condition = update.condition;
        let assignments = update.assignments;
        let updated = db.tables().mutate(
            &table,
            |row| stored_equals(row, &condition),
            |mut row| {
                for assignment in &assignments {
                    row.set(assignment.column.as_str(), assignment.value.as_str());
                }
                Some(row)
            },
        )?;

        if updated == 0 {
            return Ok(QueryResult::with_message(format!(
                "No rows matched in {}",
                table
            )));
        }
        info!(database = db.name(), table = %table, updated, "rows updated");
        Ok(QueryResult::with_affected_rows(
            updated,
            format!("{} row(s) updated in {}", updated, table),
        ))
    }

    pub(super) fn execute_delete(
        &mut self,
        session: &Session,
        delete: DeleteStatement,
    ) -> Result<QueryResult> {
        let db = self.active_database(session)?;
        let table = delete.table_name;

        require_table(&db, &table)?;
        let header = db.tables().header(&table)?;
        column_index(&header, &delete.condition.column, &table)?;

        let condition = delete.condition;
        let deleted = db
            .tables()
            .mutate(&table, |row| stored_equals(row, &condition), |_| None)?;

        if deleted == 0 {
            return Ok(QueryResult::with_message(format!(
                "No rows matched in {}",
                table
            )));
        }
        info!(database = db.name(), table = %table, deleted, "rows deleted");
        Ok(QueryResult::with_affected_rows(
            deleted,
            format!("{} row(s) deleted from {}", deleted, table),
        ))
    }
}

fn require_table(db: &Database, table: &str) -> Result<()> {
    if db.tables().exists(table) {
        Ok(())
    } else {
        Err(Error::TableNotFound(table.to_string()))
    }
}

fn column_index(header: &[String], column: &str, table: &str) -> Result<usize> {
    header
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| Error::ColumnNotFound(column.to_string(), table.to_string()))
}

/// UPDATE/DELETE matching: the stored value, with or without one layer of
/// quotes, must equal the literal exactly.
fn stored_equals(row: &Row, condition: &Condition) -> bool {
    row.get(&condition.column)
        .is_some_and(|raw| raw == condition.value || strip_quotes(raw) == condition.value)
}

/// SELECT condition
struct Filter {
    column: String,
    op: CompareOp,
    literal: String,
    number: Option<f64>,
}

impl Filter {
    /// Ordering comparisons need a numeric literal; `=` falls back to text
    /// equality when either side is not a number.
    fn new(condition: &Condition) -> Result<Self> {
        let number = condition.value.trim().parse::<f64>().ok();
        if condition.op != CompareOp::Eq && number.is_none() {
            return Err(Error::NonNumericComparison(condition.value.clone()));
        }
        Ok(Self {
            column: condition.column.clone(),
            op: condition.op,
            literal: condition.value.clone(),
            number,
        })
    }

    fn matches(&self, row: &Row) -> bool {
        let Some(raw) = row.get(&self.column) else {
            return false;
        };
        let value = strip_quotes(raw);
        let parsed = value.trim().parse::<f64>().ok();

        match (self.op, parsed, self.number) {
            (CompareOp::Eq, Some(v), Some(t)) => v == t,
            (CompareOp::Eq, _, _) => value == self.literal,
            (CompareOp::Lt, Some(v), Some(t)) => v < t,
            (CompareOp::Gt, Some(v), Some(t)) => v > t,
            (CompareOp::Lte, Some(v), Some(t)) => v <= t,
            (CompareOp::Gte, Some(v), Some(t)) => v >= t,
            _ => false,
        }
    }
}
