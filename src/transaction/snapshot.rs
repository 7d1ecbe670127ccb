//! Data directory snapshots
//!
//! Used by atomic COMMIT: every database under the data root is captured
//! before replay and written back if replay fails, so statements that switch
//! databases with USE or create new ones are covered too.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;

/// In-memory copy of a directory tree
#[derive(Debug, Clone)]
pub struct DataSnapshot {
    root: PathBuf,
    dirs: HashSet<PathBuf>,
    files: Vec<(PathBuf, Vec<u8>)>,
}

impl DataSnapshot {
    /// Capture every directory and regular file below `root`. A missing
    /// root is created first and captured as empty.
    pub fn capture(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let mut snapshot = Self {
            root: root.clone(),
            dirs: HashSet::new(),
            files: Vec::new(),
        };
        snapshot.capture_dir(&root)?;
        debug!(
            root = %root.display(),
            dirs = snapshot.dirs.len(),
            files = snapshot.files.len(),
            "snapshot captured"
        );
        Ok(snapshot)
    }

    fn capture_dir(&mut self, dir: &Path) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.dirs.insert(path.clone());
                self.capture_dir(&path)?;
            } else if file_type.is_file() {
                let contents = fs::read(&path)?;
                self.files.push((path, contents));
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Put the tree back to the captured state. Files and directories
    /// created since the capture are removed.
    pub fn restore(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let captured: HashSet<&Path> = self.files.iter().map(|(p, _)| p.as_path()).collect();
        self.remove_new_entries(&self.root, &captured)?;

        for dir in &self.dirs {
            fs::create_dir_all(dir)?;
        }
        for (path, contents) in &self.files {
            fs::write(path, contents)?;
        }
        info!(root = %self.root.display(), files = self.files.len(), "snapshot restored");
        Ok(())
    }

    fn remove_new_entries(&self, dir: &Path, captured: &HashSet<&Path>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                if self.dirs.contains(&path) {
                    self.remove_new_entries(&path, captured)?;
                } else {
                    fs::remove_dir_all(&path)?;
                }
            } else if !captured.contains(path.as_path()) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
