//! Lexer built on logos.
//!
//! Produces the whole token stream up front, each token paired with its
//! span, terminated by `Token::Eof`.

use crate::error::{ParseError, ParseErrorKind};
use crate::token::{Span, Token};
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"#[^\n]*")]
enum LogosToken {
    #[token("local")]
    Local,
    #[token("in")]
    In,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("loop")]
    Loop,
    #[token("fun")]
    Fun,
    #[token("proc")]
    Proc,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[regex(r"[0-9]+")]
    Number,
    #[regex(r"[_a-zA-Z][_a-zA-Z0-9]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token(":=")]
    Assign,
    #[token("->")]
    Arrow,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    BangEqual,
}

pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the entire input, stopping at the first bad character.
    pub fn tokenize(self) -> Result<Vec<(Token, Span)>, ParseError> {
        let mut lexer = LogosToken::lexer(self.source);
        let mut tokens = Vec::new();
        let mut line = 1u32;
        let mut column = 1u32;
        let mut last_end = 0;

        while let Some(result) = lexer.next() {
            let range = lexer.span();
            advance(&self.source[last_end..range.start], &mut line, &mut column);
            let span = Span::new(range.start, range.end, line, column);
            let slice = &self.source[range.clone()];

            let token = match result {
                Ok(LogosToken::Number) => match slice.parse::<i64>() {
                    Ok(n) => Token::Number(n),
                    Err(_) => {
                        return Err(ParseError::new(
                            ParseErrorKind::InvalidNumber {
                                text: slice.to_string(),
                            },
                            span,
                        ))
                    }
                },
                Ok(token) => convert(token),
                Err(()) => {
                    let found = slice.chars().next().unwrap_or('\0');
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedCharacter { found },
                        span,
                    ));
                }
            };
            tokens.push((token, span));

            advance(slice, &mut line, &mut column);
            last_end = range.end;
        }

        advance(&self.source[last_end..], &mut line, &mut column);
        let end = self.source.len();
        tokens.push((Token::Eof, Span::new(end, end, line, column)));
        Ok(tokens)
    }
}

fn advance(text: &str, line: &mut u32, column: &mut u32) {
    for c in text.chars() {
        if c == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    }
}

fn convert(token: LogosToken) -> Token {
    match token {
        LogosToken::Local => Token::Local,
        LogosToken::In => Token::In,
        LogosToken::If => Token::If,
        LogosToken::Then => Token::Then,
        LogosToken::Else => Token::Else,
        LogosToken::While => Token::While,
        LogosToken::Do => Token::Do,
        LogosToken::Loop => Token::Loop,
        LogosToken::Fun => Token::Fun,
        LogosToken::Proc => Token::Proc,
        LogosToken::And => Token::And,
        LogosToken::Or => Token::Or,
        LogosToken::Not => Token::Not,
        LogosToken::True => Token::True,
        LogosToken::False => Token::False,
        // handled by the caller, which needs the slice
        LogosToken::Number => Token::Number(0),
        LogosToken::Ident(name) => Token::Ident(name),
        LogosToken::Assign => Token::Assign,
        LogosToken::Arrow => Token::Arrow,
        LogosToken::Semicolon => Token::Semicolon,
        LogosToken::Comma => Token::Comma,
        LogosToken::LParen => Token::LParen,
        LogosToken::RParen => Token::RParen,
        LogosToken::LBrace => Token::LBrace,
        LogosToken::RBrace => Token::RBrace,
        LogosToken::Plus => Token::Plus,
        LogosToken::Minus => Token::Minus,
        LogosToken::Star => Token::Star,
        LogosToken::Slash => Token::Slash,
        LogosToken::Less => Token::Less,
        LogosToken::Greater => Token::Greater,
        LogosToken::LessEqual => Token::LessEqual,
        LogosToken::GreaterEqual => Token::GreaterEqual,
        LogosToken::EqualEqual => Token::EqualEqual,
        LogosToken::BangEqual => Token::BangEqual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_keywords_win_over_identifiers() {
        assert_eq!(
            kinds("local localx in"),
            vec![
                Token::Local,
                Token::Ident("localx".into()),
                Token::In,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_two_character_operators() {
        assert_eq!(
            kinds("x := a <= b -> c != d"),
            vec![
                Token::Ident("x".into()),
                Token::Assign,
                Token::Ident("a".into()),
                Token::LessEqual,
                Token::Ident("b".into()),
                Token::Arrow,
                Token::Ident("c".into()),
                Token::BangEqual,
                Token::Ident("d".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped_and_lines_tracked() {
        let tokens = Lexer::new("# header\n  42 # trailing\nx").tokenize().unwrap();
        assert_eq!(tokens[0].0, Token::Number(42));
        assert_eq!((tokens[0].1.line, tokens[0].1.column), (2, 3));
        assert_eq!(tokens[1].0, Token::Ident("x".into()));
        assert_eq!(tokens[1].1.line, 3);
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("1 @ 2").tokenize().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedCharacter { found: '@' });
        assert_eq!(err.span.column, 3);
    }

    #[test]
    fn test_number_out_of_range() {
        let err = Lexer::new("99999999999999999999").tokenize().unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
    }
}
