//! Statement Executor for TinyDB
//!
//! This module dispatches parsed statements to the per-verb executors and
//! defines the result type they return.

use serde::Serialize;
use tracing::debug;

use super::relationship::{NoRelationships, RelationshipPrompt};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::sql::Statement;
use crate::storage::{Database, Row, Workspace};

/// Query result
#[derive(Debug, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    pub affected_rows: usize,
    /// Message
    pub message: Option<String>,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            message: None,
        }
    }

    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result set
    pub fn with_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let message = if rows.is_empty() {
            "No rows found".to_string()
        } else {
            format!("{} row(s) returned", rows.len())
        };
        Self {
            columns,
            rows,
            affected_rows: 0,
            message: Some(message),
        }
    }
}

/// Execution Engine
pub struct ExecutionEngine {
    /// Data root
    workspace: Workspace,
    /// Asked for relationships on CREATE TABLE
    prompt: Box<dyn RelationshipPrompt>,
}

impl ExecutionEngine {
    /// Create a new execution engine over a data root
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            prompt: Box::new(NoRelationships),
        }
    }

    /// Use `prompt` to define relationships on CREATE TABLE
    pub fn with_prompt(mut self, prompt: impl RelationshipPrompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Execute a statement immediately
    pub fn execute(&mut self, session: &mut Session, statement: Statement) -> Result<QueryResult> {
        debug!(verb = statement.verb(), "executing statement");

        match statement {
            Statement::CreateDatabase(name) => self.execute_create_database(&name),
            Statement::CreateTable(create) => self.execute_create_table(session, create),
            Statement::Use(name) => self.execute_use(session, &name),
            Statement::Insert(insert) => self.execute_insert(session, insert),
            Statement::Select(select) => self.execute_select(session, select),
            Statement::Update(update) => self.execute_update(session, update),
            Statement::Delete(delete) => self.execute_delete(session, delete),
            Statement::DropTable(name) => self.execute_drop_table(session, &name),
            Statement::BeginTransaction | Statement::Commit | Statement::Rollback => {
                Err(Error::InvalidFormat(format!(
                    "{} must go through the command processor",
                    statement.verb()
                )))
            }
        }
    }

    /// The session's active database
    pub(super) fn active_database(&self, session: &Session) -> Result<Database> {
        self.workspace.open(session.require_database()?)
    }

    pub(super) fn prompt(&mut self) -> &mut dyn RelationshipPrompt {
        self.prompt.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql;
    use crate::transaction::TransactionBuffer;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ExecutionEngine, Session) {
        let dir = TempDir::new().unwrap();
        let engine = ExecutionEngine::new(Workspace::new(dir.path().join("databases")));
        let session = Session::new(TransactionBuffer::new(dir.path().join("buffer.txt")));
        (dir, engine, session)
    }

    fn run(engine: &mut ExecutionEngine, session: &mut Session, input: &str) -> Result<QueryResult> {
        engine.execute(session, sql::parse(input)?)
    }

    #[test]
    fn test_requires_active_database() {
        let (_dir, mut engine, mut session) = setup();

        for input in [
            "CREATE TABLE P (id INT (pk))",
            "INSERT INTO P VALUES (1)",
            "SELECT * FROM P",
            "UPDATE P SET a = 1 WHERE id = 1",
            "DELETE FROM P WHERE id = 1",
            "DROP TABLE P",
        ] {
            assert!(
                matches!(
                    run(&mut engine, &mut session, input),
                    Err(Error::NoActiveDatabase)
                ),
                "{}",
                input
            );
        }
    }

    #[test]
    fn test_insert_and_select() {
        let (_dir, mut engine, mut session) = setup();

        run(&mut engine, &mut session, "CREATE DATABASE T").unwrap();
        run(&mut engine, &mut session, "USE T").unwrap();
        run(
            &mut engine,
            &mut session,
            "CREATE TABLE P (id INT (pk), name STRING)",
        )
        .unwrap();

        let result = run(
            &mut engine,
            &mut session,
            "INSERT INTO P (id, name) VALUES (1, 'Ann')",
        )
        .unwrap();
        assert_eq!(result.affected_rows, 1);

        let result = run(&mut engine, &mut session, "SELECT * FROM P").unwrap();
        assert_eq!(result.columns, vec!["ID", "NAME"]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get("ID"), Some("1"));
        assert_eq!(result.rows[0].get("NAME"), Some("Ann"));
    }

    #[test]
    fn test_transaction_control_is_rejected() {
        let (_dir, mut engine, mut session) = setup();
        assert!(matches!(
            engine.execute(&mut session, Statement::Commit),
            Err(Error::InvalidFormat(_))
        ));
    }
}
