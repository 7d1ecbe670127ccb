//! Transaction buffer file
//!
//! Statements issued inside a transaction are kept one per line until COMMIT
//! or ROLLBACK empties the file. Every session needs its own file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};
use tracing::debug;

use crate::error::Result;

/// Durable, ordered list of buffered statements
#[derive(Debug)]
pub struct TransactionBuffer {
    path: PathBuf,
    /// Set for buffers created by [`TransactionBuffer::unique`]; removes the
    /// file when the buffer is dropped
    _guard: Option<TempPath>,
}

impl TransactionBuffer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _guard: None,
        }
    }

    /// A buffer file of its own next to `base`, named
    /// `<stem>_<random>.<ext>`. The file is deleted with the buffer.
    pub fn unique(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        let dir = match base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let stem = base
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("transaction_buffer");
        let suffix = base
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let temp = Builder::new()
            .prefix(&format!("{}_", stem))
            .suffix(&suffix)
            .tempfile_in(dir)?
            .into_temp_path();

        debug!(path = %temp.display(), "transaction buffer created");
        Ok(Self {
            path: temp.to_path_buf(),
            _guard: Some(temp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empty the buffer, creating the file if needed
    pub fn truncate(&self) -> Result<()> {
        self.ensure_parent()?;
        fs::write(&self.path, "")?;
        Ok(())
    }

    /// Append one statement. Line breaks inside it become spaces.
    pub fn append(&self, statement: &str) -> Result<()> {
        self.ensure_parent()?;
        let line = statement
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Buffered statements in the order they were issued
    pub fn read(&self) -> Result<Vec<String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read() {
        let dir = TempDir::new().unwrap();
        let buffer = TransactionBuffer::new(dir.path().join("tx").join("buffer.txt"));

        assert!(buffer.read().unwrap().is_empty());
        buffer.truncate().unwrap();
        buffer.append("INSERT INTO P VALUES (1, 'Ann');").unwrap();
        buffer.append("UPDATE P\n  SET name = 'Bo'\n  WHERE id = 1;").unwrap();

        assert_eq!(
            buffer.read().unwrap(),
            vec![
                "INSERT INTO P VALUES (1, 'Ann');",
                "UPDATE P SET name = 'Bo' WHERE id = 1;"
            ]
        );

        buffer.truncate().unwrap();
        assert!(buffer.read().unwrap().is_empty());
        assert!(buffer.path().exists());
    }

    #[test]
    fn test_unique_buffers_are_separate() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("transaction_buffer.txt");
        let first = TransactionBuffer::unique(&base).unwrap();
        let second = TransactionBuffer::unique(&base).unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(first.path().parent(), Some(dir.path()));
        assert!(first
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("transaction_buffer_") && n.ends_with(".txt")));

        first.append("INSERT INTO P VALUES (1);").unwrap();
        second.truncate().unwrap();
        assert_eq!(first.read().unwrap(), vec!["INSERT INTO P VALUES (1);"]);

        let path = first.path().to_path_buf();
        drop(first);
        assert!(!path.exists());
    }
}
