//! Transaction Manager
//!
//! Handles the transaction lifecycle (Begin, Commit, Rollback). Statements
//! are not applied while a transaction is active; they are buffered and
//! replayed by the command processor at COMMIT.

use tracing::{debug, info, warn};

use super::buffer::TransactionBuffer;
use crate::error::{Error, Result};

/// Transaction State
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Active,
}

/// Transaction Manager
#[derive(Debug)]
pub struct TransactionManager {
    state: TransactionState,
    buffer: TransactionBuffer,
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new(buffer: TransactionBuffer) -> Self {
        Self {
            state: TransactionState::Idle,
            buffer,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    pub fn buffer(&self) -> &TransactionBuffer {
        &self.buffer
    }

    /// Begin a transaction. Returns false, changing nothing, when one is
    /// already active.
    pub fn begin(&mut self) -> Result<bool> {
        if self.is_active() {
            warn!("BEGIN TRANSACTION while a transaction is active");
            return Ok(false);
        }
        self.buffer.truncate()?;
        self.state = TransactionState::Active;
        info!("transaction started");
        Ok(true)
    }

    /// Append a statement to the open transaction
    pub fn buffer_statement(&mut self, statement: &str) -> Result<()> {
        if !self.is_active() {
            return Err(Error::NoActiveTransaction);
        }
        self.buffer.append(statement)?;
        debug!(statement, "statement buffered");
        Ok(())
    }

    /// Statements buffered so far
    pub fn pending(&self) -> Result<Vec<String>> {
        if !self.is_active() {
            return Err(Error::NoActiveTransaction);
        }
        self.buffer.read()
    }

    /// End the transaction for COMMIT and hand back its statements for
    /// replay. The buffer is emptied and the state is Idle afterwards,
    /// whatever the outcome of the replay.
    pub fn take_for_commit(&mut self) -> Result<Vec<String>> {
        let statements = self.pending()?;
        self.finish()?;
        info!(statements = statements.len(), "transaction committing");
        Ok(statements)
    }

    /// Discard the transaction. Returns the number of dropped statements.
    pub fn rollback(&mut self) -> Result<usize> {
        let discarded = self.pending()?.len();
        self.finish()?;
        info!(discarded, "transaction rolled back");
        Ok(discarded)
    }

    fn finish(&mut self) -> Result<()> {
        self.state = TransactionState::Idle;
        self.buffer.truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> TransactionManager {
        TransactionManager::new(TransactionBuffer::new(dir.path().join("buffer.txt")))
    }

    #[test]
    fn test_transaction_lifecycle() {
        let dir = TempDir::new().unwrap();
        let mut tm = manager(&dir);
        assert_eq!(tm.state(), TransactionState::Idle);

        assert!(tm.begin().unwrap());
        assert!(tm.is_active());
        tm.buffer_statement("INSERT INTO P VALUES (1)").unwrap();
        tm.buffer_statement("DELETE FROM P WHERE ID = 1").unwrap();

        let statements = tm.take_for_commit().unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(tm.state(), TransactionState::Idle);
        assert!(tm.buffer().read().unwrap().is_empty());
    }

    #[test]
    fn test_nested_begin_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut tm = manager(&dir);

        tm.begin().unwrap();
        tm.buffer_statement("INSERT INTO P VALUES (1)").unwrap();
        assert!(!tm.begin().unwrap());
        assert_eq!(tm.pending().unwrap().len(), 1);
    }

    #[test]
    fn test_rollback_discards() {
        let dir = TempDir::new().unwrap();
        let mut tm = manager(&dir);

        tm.begin().unwrap();
        tm.buffer_statement("INSERT INTO P VALUES (1)").unwrap();
        assert_eq!(tm.rollback().unwrap(), 1);
        assert!(!tm.is_active());
        assert!(tm.buffer().read().unwrap().is_empty());
    }

    #[test]
    fn test_idle_operations_fail() {
        let dir = TempDir::new().unwrap();
        let mut tm = manager(&dir);

        assert!(matches!(tm.take_for_commit(), Err(Error::NoActiveTransaction)));
        assert!(matches!(tm.rollback(), Err(Error::NoActiveTransaction)));
        assert!(matches!(
            tm.buffer_statement("INSERT INTO P VALUES (1)"),
            Err(Error::NoActiveTransaction)
        ));
    }

    #[test]
    fn test_begin_truncates_stale_buffer() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("buffer.txt"), "INSERT INTO P VALUES (9)\n").unwrap();

        let mut tm = manager(&dir);
        tm.begin().unwrap();
        assert!(tm.pending().unwrap().is_empty());
    }
}
