//! TinyDB - A small flat-file relational store written in Rust
//!
//! This library provides the core components for a command-driven store:
//! - Statement parsing (lexer, parser, AST)
//! - Flat-file storage (row files, metadata files, database directories)
//! - Statement execution
//! - Buffered transactions with replay on COMMIT
//! - Audit logging and reporting exports

pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod processor;
pub mod session;
pub mod sql;
pub mod storage;
pub mod transaction;

pub use config::Config;
pub use error::{Error, Result};
pub use processor::CommandProcessor;
pub use session::Session;
