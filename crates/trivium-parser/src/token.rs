//! Tokens and source spans

use std::fmt;

/// Byte range plus the line/column of its first character (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(i64),
    Ident(String),
    True,
    False,

    // Keywords
    Local,
    In,
    If,
    Then,
    Else,
    While,
    Do,
    Loop,
    Fun,
    Proc,
    And,
    Or,
    Not,

    // Punctuation
    Assign,
    Arrow,
    Semicolon,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    BangEqual,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Number(n) => return write!(f, "number `{}`", n),
            Token::Ident(name) => return write!(f, "identifier `{}`", name),
            Token::True => "true",
            Token::False => "false",
            Token::Local => "local",
            Token::In => "in",
            Token::If => "if",
            Token::Then => "then",
            Token::Else => "else",
            Token::While => "while",
            Token::Do => "do",
            Token::Loop => "loop",
            Token::Fun => "fun",
            Token::Proc => "proc",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::Assign => ":=",
            Token::Arrow => "->",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Less => "<",
            Token::Greater => ">",
            Token::LessEqual => "<=",
            Token::GreaterEqual => ">=",
            Token::EqualEqual => "==",
            Token::BangEqual => "!=",
            Token::Eof => "end of input",
        };
        write!(f, "`{}`", text)
    }
}
