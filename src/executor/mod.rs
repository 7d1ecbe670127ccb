//! Statement execution module
//!
//! This module contains the execution engine and the per-verb executors.

pub mod ddl;
pub mod dml;
pub mod executor;
pub mod relationship;

pub use executor::{ExecutionEngine, QueryResult};
pub use relationship::{FixedRelationships, NoRelationships, RelationshipChoice, RelationshipPrompt};
