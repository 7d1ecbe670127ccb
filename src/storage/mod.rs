//! Storage module
//!
//! This module contains the flat-file storage components:
//! - Database directories
//! - Row files with copy-filter-rename mutation
//! - Row representation

pub mod row;
pub mod table;
pub mod workspace;

pub use row::Row;
pub use table::{RowIter, TableStore};
pub use workspace::{Database, Workspace};
