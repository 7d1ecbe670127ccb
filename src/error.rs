//! Error types for TinyDB
//!
//! This module defines all error types used throughout the engine. Every
//! failure aborts only the statement that raised it.

use thiserror::Error;

/// The main error type for TinyDB
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    // ========== Session Errors ==========
    #[error("No database selected")]
    NoActiveDatabase,

    #[error("No active transaction")]
    NoActiveTransaction,

    // ========== Catalog Errors ==========
    #[error("Database '{0}' already exists")]
    DatabaseAlreadyExists(String),

    #[error("Database '{0}' does not exist")]
    DatabaseNotFound(String),

    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Table '{0}' does not exist")]
    TableNotFound(String),

    #[error("Column '{0}' does not exist in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Metadata for table '{0}' does not exist")]
    MetadataMissing(String),

    // ========== Execution Errors ==========
    #[error("Primary key value ({key}) is not unique in table '{table}'")]
    PrimaryKeyViolation { table: String, key: String },

    #[error("Updating primary key column '{0}' is not allowed")]
    PrimaryKeyImmutable(String),

    #[error("Comparison value must be numeric, got '{0}'")]
    NonNumericComparison(String),

    // ========== Transaction Errors ==========
    #[error("Transaction failed at '{statement}', rolled back: {source}")]
    TransactionAborted {
        statement: String,
        #[source]
        source: Box<Error>,
    },

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for TinyDB operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TableNotFound("USERS".to_string());
        assert_eq!(err.to_string(), "Table 'USERS' does not exist");

        let err = Error::UnexpectedCharacter('@', 5);
        assert_eq!(
            err.to_string(),
            "Lexer error: unexpected character '@' at position 5"
        );
    }

    #[test]
    fn test_transaction_aborted_keeps_cause() {
        let err = Error::TransactionAborted {
            statement: "INSERT INTO P (ID) VALUES (1)".to_string(),
            source: Box::new(Error::PrimaryKeyViolation {
                table: "P".to_string(),
                key: "1".to_string(),
            }),
        };
        let text = err.to_string();
        assert!(text.contains("rolled back"));
        assert!(text.contains("not unique"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
