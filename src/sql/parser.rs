//! Statement Parser
//!
//! This module parses tokens into a typed [`Statement`]. Identifiers are
//! upper-cased here; values keep their case.

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::error::{Error, Result};

/// Statement Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a statement string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse a single statement. Anything after the optional `;` is an error.
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;

        if self.check(&Token::Semicolon) {
            self.advance();
        }
        if !self.is_at_end() {
            return Err(self.unexpected("end of statement"));
        }

        Ok(stmt)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Begin => self.parse_begin(),
            Token::Commit => self.parse_commit(),
            Token::Rollback => self.parse_rollback(),
            Token::Create => self.parse_create(),
            Token::Use => self.parse_use(),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Update => self.parse_update().map(Statement::Update),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            Token::Drop => self.parse_drop(),
            _ => Err(self.unexpected(
                "BEGIN, COMMIT, ROLLBACK, CREATE, USE, INSERT, SELECT, UPDATE, DELETE or DROP",
            )),
        }
    }

    // ========== Transaction Statements ==========

    fn parse_begin(&mut self) -> Result<Statement> {
        self.expect(&Token::Begin)?;
        self.expect(&Token::Transaction)?;
        Ok(Statement::BeginTransaction)
    }

    fn parse_commit(&mut self) -> Result<Statement> {
        self.expect(&Token::Commit)?;
        if self.check(&Token::Transaction) {
            self.advance();
        }
        Ok(Statement::Commit)
    }

    fn parse_rollback(&mut self) -> Result<Statement> {
        self.expect(&Token::Rollback)?;
        if self.check(&Token::Transaction) {
            self.advance();
        }
        Ok(Statement::Rollback)
    }

    // ========== CREATE / USE / DROP ==========

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(&Token::Create)?;

        match self.current() {
            Token::Database => {
                self.advance();
                Ok(Statement::CreateDatabase(self.expect_identifier()?))
            }
            Token::Table => self.parse_create_table().map(Statement::CreateTable),
            _ => Err(self.unexpected("DATABASE or TABLE")),
        }
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Table)?;
        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_def()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&Token::RParen)?;

        Ok(CreateTableStatement {
            table_name,
            columns,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier()?;
        let mut data_type = self.expect_identifier()?;
        let mut primary_key = false;

        loop {
            match (self.current(), self.peek()) {
                // VARCHAR(20)
                (Token::LParen, Some(Token::NumberLiteral(size))) => {
                    let size = size.clone();
                    self.advance();
                    self.advance();
                    self.expect(&Token::RParen)?;
                    data_type = format!("{}({})", data_type, size);
                }
                // (pk)
                (Token::LParen, Some(Token::Identifier(marker)))
                    if marker.eq_ignore_ascii_case("pk") =>
                {
                    self.advance();
                    self.advance();
                    self.expect(&Token::RParen)?;
                    primary_key = true;
                }
                (Token::Primary, _) => {
                    self.advance();
                    self.expect(&Token::Key)?;
                    primary_key = true;
                }
                _ => break,
            }
        }

        Ok(ColumnDef {
            name,
            data_type,
            primary_key,
        })
    }

    fn parse_use(&mut self) -> Result<Statement> {
        self.expect(&Token::Use)?;
        Ok(Statement::Use(self.expect_identifier()?))
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(&Token::Drop)?;
        self.expect(&Token::Table)?;
        Ok(Statement::DropTable(self.expect_identifier()?))
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier()?;

        let columns = if self.check(&Token::LParen) {
            self.advance();
            let cols = self.parse_identifier_list()?;
            self.expect(&Token::RParen)?;
            Some(cols)
        } else {
            None
        };

        if !self.check(&Token::Values) {
            return Err(Error::InvalidFormat(
                "INSERT requires a VALUES clause".to_string(),
            ));
        }
        self.advance();

        self.expect(&Token::LParen)?;
        let values = self.parse_value_list()?;
        self.expect(&Token::RParen)?;

        if let Some(cols) = &columns {
            if cols.len() != values.len() {
                return Err(Error::InvalidFormat(format!(
                    "{} column(s) but {} value(s)",
                    cols.len(),
                    values.len()
                )));
            }
        }

        Ok(InsertStatement {
            table_name,
            columns,
            values,
        })
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let columns = if self.check(&Token::Asterisk) {
            self.advance();
            Projection::Wildcard
        } else {
            Projection::Columns(self.parse_identifier_list()?)
        };

        self.expect(&Token::From)?;
        let table_name = self.expect_identifier()?;

        let condition = if self.check(&Token::Where) {
            self.advance();
            Some(self.parse_condition()?)
        } else {
            None
        };

        Ok(SelectStatement {
            columns,
            table_name,
            condition,
        })
    }

    // ========== UPDATE Statement ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;

        let table_name = self.expect_identifier()?;

        if !self.check(&Token::Set) {
            return Err(Error::InvalidFormat(
                "UPDATE requires a SET clause".to_string(),
            ));
        }
        self.advance();

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier()?;
            self.expect(&Token::Eq)?;
            let value = self.parse_value()?;
            assignments.push(Assignment { column, value });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        if !self.check(&Token::Where) {
            return Err(Error::InvalidFormat(
                "UPDATE requires a WHERE clause after SET".to_string(),
            ));
        }
        self.advance();
        let condition = self.parse_equality()?;

        Ok(UpdateStatement {
            table_name,
            assignments,
            condition,
        })
    }

    // ========== DELETE Statement ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier()?;

        if !self.check(&Token::Where) {
            return Err(Error::InvalidFormat(
                "DELETE requires a WHERE clause".to_string(),
            ));
        }
        self.advance();
        let condition = self.parse_equality()?;

        Ok(DeleteStatement {
            table_name,
            condition,
        })
    }

    // ========== Conditions & Values ==========

    fn parse_condition(&mut self) -> Result<Condition> {
        let column = self.expect_identifier()?;
        let op = match self.current() {
            Token::Eq => CompareOp::Eq,
            Token::Lt => CompareOp::Lt,
            Token::Gt => CompareOp::Gt,
            Token::Lte => CompareOp::Lte,
            Token::Gte => CompareOp::Gte,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();
        let value = self.parse_value()?;

        Ok(Condition { column, op, value })
    }

    fn parse_equality(&mut self) -> Result<Condition> {
        let condition = self.parse_condition()?;
        if condition.op != CompareOp::Eq {
            return Err(Error::InvalidFormat(format!(
                "only '=' is supported here, got '{}'",
                condition.op
            )));
        }
        Ok(condition)
    }

    fn parse_value(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::NumberLiteral(v) | Token::StringLiteral(v) | Token::Identifier(v) => {
                self.advance();
                Ok(v)
            }
            _ => Err(self.unexpected("value")),
        }
    }

    fn parse_value_list(&mut self) -> Result<Vec<String>> {
        let mut values = Vec::new();

        loop {
            values.push(self.parse_value()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(values)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();

        loop {
            identifiers.push(self.expect_identifier()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    // ========== Helpers ==========

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position + 1)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    /// Consume an identifier and return it upper-cased
    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name.to_uppercase())
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        if self.is_at_end() {
            Error::UnexpectedEof(expected.to_string())
        } else {
            Error::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current().to_string(),
            }
        }
    }
}
