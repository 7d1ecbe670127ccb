//! Statement Abstract Syntax Tree (AST)
//!
//! This module defines the AST nodes for TinyDB statements. Names are
//! already upper-cased and values already unquoted by the time they land
//! here.

use std::fmt;

/// A TinyDB statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// BEGIN TRANSACTION
    BeginTransaction,
    /// COMMIT
    Commit,
    /// ROLLBACK
    Rollback,
    /// CREATE DATABASE name
    CreateDatabase(String),
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
    /// USE name
    Use(String),
    /// INSERT statement
    Insert(InsertStatement),
    /// SELECT statement
    Select(SelectStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// DELETE statement
    Delete(DeleteStatement),
    /// DROP TABLE name
    DropTable(String),
}

impl Statement {
    /// Leading keyword of the statement, as used for routing and audit
    pub fn verb(&self) -> &'static str {
        match self {
            Statement::BeginTransaction => "BEGIN",
            Statement::Commit => "COMMIT",
            Statement::Rollback => "ROLLBACK",
            Statement::CreateDatabase(_) | Statement::CreateTable(_) => "CREATE",
            Statement::Use(_) => "USE",
            Statement::Insert(_) => "INSERT",
            Statement::Select(_) => "SELECT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::DropTable(_) => "DROP",
        }
    }
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table_name: String,
    /// Column definitions in declared order
    pub columns: Vec<ColumnDef>,
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Declared type, free text such as `INT` or `VARCHAR(20)`
    pub data_type: String,
    /// Marked `(pk)` or `PRIMARY KEY`
    pub primary_key: bool,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table name
    pub table_name: String,
    /// Column names (optional)
    pub columns: Option<Vec<String>>,
    /// Values to insert
    pub values: Vec<String>,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Projection
    pub columns: Projection,
    /// Source table
    pub table_name: String,
    /// Optional WHERE condition
    pub condition: Option<Condition>,
}

/// SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// All columns (*)
    Wildcard,
    /// Explicit column list
    Columns(Vec<String>),
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table name
    pub table_name: String,
    /// SET clause (column = value pairs)
    pub assignments: Vec<Assignment>,
    /// WHERE condition, always an equality
    pub condition: Condition,
}

/// Column assignment (for UPDATE)
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: String,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table name
    pub table_name: String,
    /// WHERE condition, always an equality
    pub condition: Condition,
}

/// A single binary condition: `column op value`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub value: String,
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Lte => "<=",
            CompareOp::Gte => ">=",
        };
        write!(f, "{}", symbol)
    }
}
