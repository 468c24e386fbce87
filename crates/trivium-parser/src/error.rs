//! Parse error types

use crate::token::{Span, Token};
use thiserror::Error;

/// A lex or parse error with its location.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{span}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnexpectedCharacter { found: char },
    InvalidNumber { text: String },
    UnexpectedToken { expected: String, found: Token },
    UnexpectedEof { expected: String },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        let message = match &kind {
            ParseErrorKind::UnexpectedCharacter { found } => {
                format!("unexpected character '{}'", found)
            }
            ParseErrorKind::InvalidNumber { text } => {
                format!("number literal `{}` does not fit in 64 bits", text)
            }
            ParseErrorKind::UnexpectedToken { expected, found } => {
                format!("expected {}, found {}", expected, found)
            }
            ParseErrorKind::UnexpectedEof { expected } => {
                format!("expected {}, found end of input", expected)
            }
        };
        Self {
            kind,
            span,
            message,
        }
    }
}
