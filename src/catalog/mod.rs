//! Catalog module
//!
//! This module contains table schemas and the metadata files that persist them.

pub mod metadata;
pub mod schema;

pub use metadata::SchemaStore;
pub use schema::{Cardinality, ColumnSchema, Relationship, TableSchema};
