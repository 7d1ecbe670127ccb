//! Statement language module
//!
//! This module contains the lexer, parser and AST for the command language.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::Statement;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::Token;

use crate::error::Result;

/// Parse one statement
pub fn parse(sql: &str) -> Result<Statement> {
    Parser::new(sql)?.parse()
}

/// Upper-cased first word of a raw statement, with any `;` removed.
/// Routing decisions are made on this before the statement is parsed.
pub fn leading_verb(input: &str) -> Option<String> {
    input
        .split_whitespace()
        .next()
        .map(|word| word.trim_end_matches(';').to_uppercase())
        .filter(|word| !word.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_verb() {
        assert_eq!(leading_verb("  insert into p values (1)"), Some("INSERT".to_string()));
        assert_eq!(leading_verb("commit;"), Some("COMMIT".to_string()));
        assert_eq!(leading_verb("   "), None);
        assert_eq!(leading_verb(";"), None);
    }
}
