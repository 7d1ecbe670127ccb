//! Session state
//!
//! A session owns what one user has selected: the active database and the
//! open transaction. Nothing here is process-global, so independent sessions
//! can coexist in one process.

use tracing::debug;

use crate::error::{Error, Result};
use crate::transaction::{TransactionBuffer, TransactionManager};

#[derive(Debug)]
pub struct Session {
    active_database: Option<String>,
    transaction: TransactionManager,
}

impl Session {
    pub fn new(buffer: TransactionBuffer) -> Self {
        Self {
            active_database: None,
            transaction: TransactionManager::new(buffer),
        }
    }

    /// Name of the database selected with USE
    pub fn active_database(&self) -> Option<&str> {
        self.active_database.as_deref()
    }

    /// The active database, or `NoActiveDatabase`
    pub fn require_database(&self) -> Result<&str> {
        self.active_database().ok_or(Error::NoActiveDatabase)
    }

    pub fn set_active_database(&mut self, name: impl Into<String>) {
        let name = name.into().to_uppercase();
        debug!(database = %name, "active database changed");
        self.active_database = Some(name);
    }

    /// Put back the selection saved before an undone COMMIT
    pub fn restore_active_database(&mut self, name: Option<String>) {
        debug!(database = ?name, "active database restored");
        self.active_database = name;
    }

    pub fn transaction(&self) -> &TransactionManager {
        &self.transaction
    }

    pub fn transaction_mut(&mut self) -> &mut TransactionManager {
        &mut self.transaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_active_database() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(TransactionBuffer::new(dir.path().join("buf.txt")));

        assert!(matches!(session.require_database(), Err(Error::NoActiveDatabase)));
        session.set_active_database("shop");
        assert_eq!(session.require_database().unwrap(), "SHOP");
        assert!(!session.transaction().is_active());

        session.restore_active_database(None);
        assert!(session.active_database().is_none());
    }
}
