//! Reporting views
//!
//! Read-only exports over a database: an entity-relationship summary and a
//! SQL dump.

pub mod erd;
pub mod sql_dump;

pub use erd::{export_erd, render_erd};
pub use sql_dump::{dump_database, export_sql};
