//! Trivium parser
//!
//! Lexer, parser and AST for the trivium expression language. The compiler
//! crate consumes the [`ast::Expr`] produced here.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{BinaryOp, Binding, Expr, UnaryOp};
pub use error::{ParseError, ParseErrorKind};
pub use parser::Parser;
pub use token::{Span, Token};

/// Parse a complete program.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    Parser::new(source)?.parse()
}
