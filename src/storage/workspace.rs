//! Database directories
//!
//! The workspace is the data root. Every database is a directory beneath it
//! holding the row and metadata files of its tables.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use super::table::TableStore;
use crate::catalog::SchemaStore;
use crate::error::{Error, Result};

/// The data root holding all databases
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a database
    pub fn database_path(&self, name: &str) -> PathBuf {
        self.root.join(name.to_uppercase())
    }

    pub fn database_exists(&self, name: &str) -> bool {
        self.database_path(name).is_dir()
    }

    /// Create a database directory
    pub fn create_database(&self, name: &str) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.database_path(name);
        match fs::create_dir(&path) {
            Ok(()) => {
                info!(database = %name.to_uppercase(), path = %path.display(), "database created");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(Error::DatabaseAlreadyExists(name.to_uppercase()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open an existing database
    pub fn open(&self, name: &str) -> Result<Database> {
        if !self.database_exists(name) {
            return Err(Error::DatabaseNotFound(name.to_uppercase()));
        }
        Ok(Database::new(name, self.database_path(name)))
    }

    /// Names of all databases, sorted
    pub fn list_databases(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Handle to one database directory
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    path: PathBuf,
    tables: TableStore,
    schemas: SchemaStore,
}

impl Database {
    fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_uppercase(),
            tables: TableStore::new(&path),
            schemas: SchemaStore::new(&path),
            path,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Row files
    pub fn tables(&self) -> &TableStore {
        &self.tables
    }

    /// Metadata files
    pub fn schemas(&self) -> &SchemaStore {
        &self.schemas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_open_database() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path().join("databases"));

        workspace.create_database("shop").unwrap();
        assert!(workspace.database_exists("SHOP"));
        assert!(dir.path().join("databases").join("SHOP").is_dir());

        let db = workspace.open("Shop").unwrap();
        assert_eq!(db.name(), "SHOP");
        assert_eq!(db.tables().list().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_create_database_twice() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());

        workspace.create_database("T").unwrap();
        assert!(matches!(
            workspace.create_database("t"),
            Err(Error::DatabaseAlreadyExists(name)) if name == "T"
        ));
    }

    #[test]
    fn test_open_missing_database() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        assert!(matches!(
            workspace.open("NOPE"),
            Err(Error::DatabaseNotFound(_))
        ));
    }

    #[test]
    fn test_list_databases() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path().join("missing"));
        assert!(workspace.list_databases().unwrap().is_empty());

        workspace.create_database("B").unwrap();
        workspace.create_database("A").unwrap();
        assert_eq!(workspace.list_databases().unwrap(), vec!["A", "B"]);
    }
}
