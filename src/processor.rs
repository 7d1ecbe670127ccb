//! Command processor
//!
//! Entry point for raw statements. Outside a transaction a statement is
//! parsed and executed at once. Inside one, mutating statements are
//! buffered and replayed in order at COMMIT.

use tracing::{info, warn};

use crate::audit::{AuditSink, JsonFileSink, LogCategory, NullSink};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{ExecutionEngine, QueryResult, RelationshipPrompt};
use crate::session::Session;
use crate::sql::{self, Statement};
use crate::storage::Workspace;
use crate::transaction::{DataSnapshot, TransactionBuffer};

/// Routes statements to the engine or the session's transaction
pub struct CommandProcessor {
    engine: ExecutionEngine,
    audit: Box<dyn AuditSink>,
    atomic_commit: bool,
}

impl CommandProcessor {
    pub fn new(engine: ExecutionEngine) -> Self {
        Self {
            engine,
            audit: Box::new(NullSink),
            atomic_commit: false,
        }
    }

    /// Processor over the configured data root, auditing to the configured
    /// log directory
    pub fn from_config(config: &Config) -> Self {
        Self::new(ExecutionEngine::new(Workspace::new(&config.data_dir)))
            .with_audit(JsonFileSink::new(&config.log_dir))
            .with_atomic_commit(config.atomic_commit)
    }

    /// A fresh session with its own transaction buffer, named after the
    /// configured one
    pub fn session(config: &Config) -> Result<Session> {
        Ok(Session::new(TransactionBuffer::unique(
            &config.transaction_buffer,
        )?))
    }

    pub fn with_audit(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit = Box::new(sink);
        self
    }

    pub fn with_atomic_commit(mut self, enabled: bool) -> Self {
        self.atomic_commit = enabled;
        self
    }

    pub fn with_prompt(mut self, prompt: impl RelationshipPrompt + 'static) -> Self {
        self.engine = self.engine.with_prompt(prompt);
        self
    }

    pub fn workspace(&self) -> &Workspace {
        self.engine.workspace()
    }

    /// Process one raw statement
    pub fn process(&mut self, session: &mut Session, input: &str) -> Result<QueryResult> {
        let input = input.trim();
        let Some(verb) = sql::leading_verb(input) else {
            return Ok(QueryResult::empty());
        };

        if session.transaction().is_active() {
            return self.process_in_transaction(session, &verb, input);
        }

        if verb == "COMMIT" || verb == "ROLLBACK" {
            return Err(Error::NoActiveTransaction);
        }

        match sql::parse(input)? {
            Statement::BeginTransaction => {
                session.transaction_mut().begin()?;
                self.audit
                    .record(LogCategory::Transaction, "BEGIN: Transaction started");
                Ok(QueryResult::with_message("Transaction started"))
            }
            statement => self.execute_audited(session, statement, input),
        }
    }

    fn process_in_transaction(
        &mut self,
        session: &mut Session,
        verb: &str,
        input: &str,
    ) -> Result<QueryResult> {
        match verb {
            "COMMIT" => match sql::parse(input)? {
                Statement::Commit => self.commit(session),
                _ => Err(Error::InvalidFormat(format!("invalid COMMIT: {}", input))),
            },
            "ROLLBACK" => match sql::parse(input)? {
                Statement::Rollback => {
                    let discarded = session.transaction_mut().rollback()?;
                    self.audit
                        .record(LogCategory::Transaction, "ROLLBACK: Transaction rolled back");
                    Ok(QueryResult::with_message(format!(
                        "Transaction rolled back; {} statement(s) discarded",
                        discarded
                    )))
                }
                _ => Err(Error::InvalidFormat(format!("invalid ROLLBACK: {}", input))),
            },
            "BEGIN" => {
                session.transaction_mut().begin()?;
                Ok(QueryResult::with_message("Transaction already in progress"))
            }
            "SELECT" => {
                let statement = sql::parse(input)?;
                self.execute_audited(session, statement, input)
            }
            "INSERT" | "UPDATE" | "DELETE" => {
                let statement = sql::parse(input)?;
                if statement.verb() != verb {
                    return Err(Error::InvalidFormat(format!(
                        "invalid {} statement: {}",
                        verb, input
                    )));
                }
                self.buffer(session, input)
            }
            _ => self.buffer(session, input),
        }
    }

    fn buffer(&mut self, session: &mut Session, input: &str) -> Result<QueryResult> {
        session.transaction_mut().buffer_statement(input)?;
        self.audit.record(
            LogCategory::Transaction,
            &format!("EXECUTE: Operation added to transaction: {}", input),
        );
        Ok(QueryResult::with_message(format!(
            "Operation added to transaction: {}",
            input
        )))
    }

    /// Replay the buffer. The first failure ends the replay; with atomic
    /// commit enabled the whole data root and the session's active database
    /// are restored to their state before COMMIT.
    fn commit(&mut self, session: &mut Session) -> Result<QueryResult> {
        let statements = session.transaction_mut().take_for_commit()?;
        let database_before = session.active_database().map(String::from);

        let snapshot = if self.atomic_commit && !statements.is_empty() {
            Some(DataSnapshot::capture(self.workspace().root())?)
        } else {
            None
        };

        for statement in &statements {
            let outcome = sql::parse(statement)
                .and_then(|parsed| self.engine.execute(session, parsed));

            if let Err(e) = outcome {
                warn!(statement = %statement, error = %e, "replay failed");
                if let Some(snapshot) = &snapshot {
                    if let Err(restore_error) = snapshot.restore() {
                        warn!(error = %restore_error, "failed to restore snapshot");
                    }
                    session.restore_active_database(database_before.clone());
                }
                self.audit.record(
                    LogCategory::Transaction,
                    &format!("COMMIT: Transaction failed, rolled back at {}: {}", statement, e),
                );
                return Err(Error::TransactionAborted {
                    statement: statement.clone(),
                    source: Box::new(e),
                });
            }
            self.audit.record(LogCategory::Query, statement);
        }

        info!(statements = statements.len(), "transaction committed");
        self.audit
            .record(LogCategory::Transaction, "COMMIT: Transaction committed");
        Ok(QueryResult::with_affected_rows(
            statements.len(),
            format!(
                "Transaction committed; {} statement(s) applied",
                statements.len()
            ),
        ))
    }

    fn execute_audited(
        &mut self,
        session: &mut Session,
        statement: Statement,
        input: &str,
    ) -> Result<QueryResult> {
        let category = match &statement {
            Statement::Insert(_)
            | Statement::Select(_)
            | Statement::Update(_)
            | Statement::Delete(_) => LogCategory::Query,
            Statement::CreateDatabase(_) | Statement::CreateTable(_) => LogCategory::Event,
            _ => LogCategory::General,
        };

        match self.engine.execute(session, statement) {
            Ok(result) => {
                let message = match &result.message {
                    Some(message) => format!("{}: {}", input, message),
                    None => input.to_string(),
                };
                self.audit.record(category, &message);
                Ok(result)
            }
            Err(e) => {
                self.audit
                    .record(LogCategory::General, &format!("{} failed: {}", input, e));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        processor: CommandProcessor,
        session: Session,
        audit: Arc<MemorySink>,
    }

    impl Fixture {
        fn new(atomic_commit: bool) -> Self {
            let dir = TempDir::new().unwrap();
            let config = Config::with_home(dir.path()).atomic_commit(atomic_commit);
            let audit = Arc::new(MemorySink::new());
            let processor = CommandProcessor::from_config(&config).with_audit(audit.clone());
            let session = CommandProcessor::session(&config).unwrap();
            let mut f = Self {
                dir,
                processor,
                session,
                audit,
            };
            for input in [
                "CREATE DATABASE T;",
                "USE T;",
                "CREATE TABLE P (id INT (pk), name STRING);",
                "INSERT INTO P (id, name) VALUES (1, 'Ann');",
            ] {
                f.run(input).unwrap();
            }
            f
        }

        fn run(&mut self, input: &str) -> Result<QueryResult> {
            self.processor.process(&mut self.session, input)
        }

        fn ids(&mut self) -> Vec<String> {
            self.run("SELECT id FROM P")
                .unwrap()
                .rows
                .iter()
                .map(|r| r.get("ID").unwrap_or("").to_string())
                .collect()
        }

        fn row_file(&self) -> std::path::PathBuf {
            self.dir.path().join("tinydb/databases/T/P.txt")
        }
    }

    #[test]
    fn test_commit_applies_buffered_statements() {
        let mut f = Fixture::new(false);

        f.run("BEGIN TRANSACTION;").unwrap();
        f.run("INSERT INTO P (id, name) VALUES (2, 'Bo');").unwrap();
        f.run("UPDATE P SET name = 'Ann B' WHERE id = 1;").unwrap();
        assert_eq!(f.ids(), vec!["1"]);

        let result = f.run("COMMIT;").unwrap();
        assert_eq!(result.affected_rows, 2);
        assert_eq!(f.ids(), vec!["1", "2"]);
        assert!(!f.session.transaction().is_active());
        assert!(f.session.transaction().buffer().read().unwrap().is_empty());
    }

    #[test]
    fn test_rollback_discards() {
        let mut f = Fixture::new(false);

        f.run("BEGIN TRANSACTION;").unwrap();
        f.run("INSERT INTO P (id, name) VALUES (2, 'Bo');").unwrap();
        f.run("ROLLBACK;").unwrap();

        assert_eq!(f.ids(), vec!["1"]);
        assert!(matches!(f.run("COMMIT"), Err(Error::NoActiveTransaction)));
        assert!(matches!(f.run("ROLLBACK"), Err(Error::NoActiveTransaction)));
    }

    #[test]
    fn test_malformed_statement_is_not_buffered() {
        let mut f = Fixture::new(false);

        f.run("BEGIN TRANSACTION").unwrap();
        assert!(f.run("INSERT INTO P (id, name) VALUES (2)").is_err());
        assert!(f.run("DELETE FROM P").is_err());
        assert!(f.session.transaction().is_active());
        assert!(f.session.transaction().pending().unwrap().is_empty());

        f.run("DROP TABLE Q").unwrap();
        assert_eq!(f.session.transaction().pending().unwrap(), vec!["DROP TABLE Q"]);
    }

    #[test]
    fn test_nested_begin_is_a_warning() {
        let mut f = Fixture::new(false);

        f.run("BEGIN TRANSACTION").unwrap();
        f.run("INSERT INTO P VALUES (2, 'Bo')").unwrap();
        let result = f.run("BEGIN TRANSACTION").unwrap();
        assert!(result.message.unwrap().contains("already in progress"));
        assert_eq!(f.session.transaction().pending().unwrap().len(), 1);
    }

    #[test]
    fn test_commit_failure_keeps_earlier_effects() {
        let mut f = Fixture::new(false);

        f.run("BEGIN TRANSACTION").unwrap();
        f.run("INSERT INTO P VALUES (2, 'Bo')").unwrap();
        f.run("INSERT INTO P VALUES (1, 'Dup')").unwrap();
        f.run("INSERT INTO P VALUES (3, 'Cy')").unwrap();

        match f.run("COMMIT") {
            Err(Error::TransactionAborted { statement, source }) => {
                assert_eq!(statement, "INSERT INTO P VALUES (1, 'Dup')");
                assert!(matches!(*source, Error::PrimaryKeyViolation { .. }));
            }
            other => panic!("expected TransactionAborted, got {:?}", other),
        }

        assert!(!f.session.transaction().is_active());
        assert_eq!(f.ids(), vec!["1", "2"]);
        assert!(f
            .audit
            .messages(LogCategory::Transaction)
            .iter()
            .any(|m| m.contains("Transaction failed, rolled back")));
    }

    #[test]
    fn test_atomic_commit_restores_database() {
        let mut f = Fixture::new(true);
        let before = fs::read(f.row_file()).unwrap();

        f.run("BEGIN TRANSACTION").unwrap();
        f.run("INSERT INTO P VALUES (2, 'Bo')").unwrap();
        f.run("CREATE TABLE Q (x INT (pk))").unwrap();
        f.run("INSERT INTO P VALUES (1, 'Dup')").unwrap();

        assert!(matches!(f.run("COMMIT"), Err(Error::TransactionAborted { .. })));
        assert_eq!(fs::read(f.row_file()).unwrap(), before);
        assert!(!f.dir.path().join("tinydb/databases/T/Q.txt").exists());
    }

    #[test]
    fn test_unknown_verb_fails_at_commit() {
        let mut f = Fixture::new(false);

        f.run("BEGIN TRANSACTION").unwrap();
        f.run("FROB P").unwrap();
        assert!(matches!(f.run("COMMIT"), Err(Error::TransactionAborted { .. })));
    }

    #[test]
    fn test_select_runs_immediately_in_transaction() {
        let mut f = Fixture::new(false);

        f.run("BEGIN TRANSACTION").unwrap();
        let result = f.run("SELECT * FROM P WHERE id = 1").unwrap();
        assert_eq!(result.rows.len(), 1);
        assert!(f.session.transaction().pending().unwrap().is_empty());
    }

    #[test]
    fn test_audit_categories() {
        let f = Fixture::new(false);
        assert_eq!(f.audit.messages(LogCategory::Event).len(), 2);
        assert_eq!(f.audit.messages(LogCategory::General).len(), 1);
        assert_eq!(f.audit.messages(LogCategory::Query).len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let mut f = Fixture::new(false);
        let result = f.run("   ").unwrap();
        assert!(result.message.is_none());
    }
}
