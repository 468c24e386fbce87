//! Recursive-descent parser
//!
//! Binary operators are parsed by precedence climbing. The prefix forms
//! (`local`, `if`, `while`, `do`, `loop`, `fun`, `proc`, lambdas and
//! assignments) take the longest expression to their right as their body,
//! so only `;` and closing brackets end them.

use crate::ast::{BinaryOp, Binding, Expr, UnaryOp};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::Lexer;
use crate::token::{Span, Token};

/// Operator precedence level (higher = tighter binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None = 0,
    LogicalOr = 1,
    LogicalAnd = 2,
    Equality = 3,
    Relational = 4,
    Additive = 5,
    Multiplicative = 6,
}

fn binary_operator(token: &Token) -> Option<(BinaryOp, Precedence)> {
    let op = match token {
        Token::Or => (BinaryOp::Or, Precedence::LogicalOr),
        Token::And => (BinaryOp::And, Precedence::LogicalAnd),
        Token::EqualEqual => (BinaryOp::Eq, Precedence::Equality),
        Token::BangEqual => (BinaryOp::Ne, Precedence::Equality),
        Token::Less => (BinaryOp::Lt, Precedence::Relational),
        Token::Greater => (BinaryOp::Gt, Precedence::Relational),
        Token::LessEqual => (BinaryOp::Le, Precedence::Relational),
        Token::GreaterEqual => (BinaryOp::Ge, Precedence::Relational),
        Token::Plus => (BinaryOp::Add, Precedence::Additive),
        Token::Minus => (BinaryOp::Sub, Precedence::Additive),
        Token::Star => (BinaryOp::Mul, Precedence::Multiplicative),
        Token::Slash => (BinaryOp::Div, Precedence::Multiplicative),
        _ => return None,
    };
    Some(op)
}

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    /// Parse a whole program: a `;`-separated sequence up to end of input.
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let program = self.parse_sequence()?;
        if !self.at(&Token::Eof) {
            return Err(self.unexpected("`;` or end of input"));
        }
        Ok(program)
    }

    // ── token helpers ────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].0
    }

    fn span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let kind = match self.peek() {
            Token::Eof => ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            },
            found => ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: found.clone(),
            },
        };
        ParseError::new(kind, self.span())
    }

    // ── grammar ──────────────────────────────────────────────────────

    fn parse_sequence(&mut self) -> Result<Expr, ParseError> {
        let mut items = vec![self.parse_expr()?];
        while self.eat(&Token::Semicolon) {
            items.push(self.parse_expr()?);
        }
        Ok(Expr::seq(items))
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Token::Local => self.parse_local(),
            Token::If => self.parse_if(),
            Token::While => {
                self.advance();
                let cond = self.parse_expr()?;
                self.expect(Token::Do)?;
                let body = self.parse_expr()?;
                Ok(Expr::while_do(cond, body))
            }
            Token::Do => {
                self.advance();
                let body = self.parse_expr()?;
                self.expect(Token::While)?;
                let cond = self.parse_expr()?;
                Ok(Expr::do_while(body, cond))
            }
            Token::Loop => {
                self.advance();
                let count = self.parse_expr()?;
                self.expect(Token::Do)?;
                let body = self.parse_expr()?;
                Ok(Expr::loop_do(count, body))
            }
            Token::Fun => self.parse_fun(),
            Token::Proc => self.parse_proc(),
            Token::Ident(_) if self.peek_at(1) == &Token::Arrow => {
                let param = self.expect_ident()?;
                self.expect(Token::Arrow)?;
                let body = self.parse_expr()?;
                Ok(Expr::Lambda {
                    params: vec![param],
                    body: Box::new(body),
                })
            }
            Token::Ident(_) if self.peek_at(1) == &Token::Assign => {
                let name = self.expect_ident()?;
                self.expect(Token::Assign)?;
                let value = self.parse_expr()?;
                Ok(Expr::assign(name, value))
            }
            Token::LParen if self.lambda_params_ahead() => {
                let params = self.parse_param_list()?;
                self.expect(Token::Arrow)?;
                let body = self.parse_expr()?;
                Ok(Expr::Lambda {
                    params,
                    body: Box::new(body),
                })
            }
            _ => self.parse_binary(Precedence::None),
        }
    }

    /// `( )` or `( ident {, ident} )` followed by `->`
    fn lambda_params_ahead(&self) -> bool {
        let mut offset = 1;
        if self.peek_at(offset) != &Token::RParen {
            loop {
                if !matches!(self.peek_at(offset), Token::Ident(_)) {
                    return false;
                }
                offset += 1;
                match self.peek_at(offset) {
                    Token::Comma => offset += 1,
                    Token::RParen => break,
                    _ => return false,
                }
            }
        }
        self.peek_at(offset + 1) == &Token::Arrow
    }

    fn parse_param_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if !self.at(&Token::RParen) {
            params.push(self.expect_ident()?);
            while self.eat(&Token::Comma) {
                params.push(self.expect_ident()?);
            }
        }
        self.expect(Token::RParen)?;
        Ok(params)
    }

    fn parse_local(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::Local)?;
        let mut bindings = Vec::new();
        loop {
            let name = self.expect_ident()?;
            self.expect(Token::Assign)?;
            let value = self.parse_expr()?;
            bindings.push(Binding { name, value });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::In)?;
        let body = self.parse_expr()?;
        Ok(Expr::Local {
            bindings,
            body: Box::new(body),
        })
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::If)?;
        let cond = self.parse_expr()?;
        self.expect(Token::Then)?;
        let then_branch = self.parse_expr()?;
        let else_branch = if self.eat(&Token::Else) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Expr::if_then(cond, then_branch, else_branch))
    }

    /// `fun name x -> body` or `fun name(a, b) -> body`
    fn parse_fun(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::Fun)?;
        let name = self.expect_ident()?;
        let params = if self.at(&Token::LParen) {
            self.parse_param_list()?
        } else {
            vec![self.expect_ident()?]
        };
        self.expect(Token::Arrow)?;
        let body = self.parse_expr()?;
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        Ok(Expr::fun(&name, &params, body))
    }

    /// `proc (a, b) local t, u -> body`
    fn parse_proc(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::Proc)?;
        let params = self.parse_param_list()?;
        let mut locals = Vec::new();
        if self.eat(&Token::Local) {
            locals.push(self.expect_ident()?);
            while self.eat(&Token::Comma) {
                locals.push(self.expect_ident()?);
            }
        }
        self.expect(Token::Arrow)?;
        let body = self.parse_expr()?;
        Ok(Expr::Proc {
            params,
            locals,
            body: Box::new(body),
        })
    }

    fn parse_binary(&mut self, min: Precedence) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, precedence)) = binary_operator(self.peek()) {
            if precedence <= min {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(precedence)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(Expr::unary(UnaryOp::Neg, self.parse_unary()?))
            }
            Token::Not => {
                self.advance();
                Ok(Expr::unary(UnaryOp::Not, self.parse_unary()?))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        while self.eat(&Token::LParen) {
            let mut args = Vec::new();
            if !self.at(&Token::RParen) {
                args.push(self.parse_expr()?);
                while self.eat(&Token::Comma) {
                    args.push(self.parse_expr()?);
                }
            }
            self.expect(Token::RParen)?;
            expr = Expr::call(expr, args);
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            Token::Number(value) => {
                self.advance();
                Ok(Expr::number(value))
            }
            Token::True => {
                self.advance();
                Ok(Expr::boolean(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::boolean(false))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::var(name))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_sequence()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBrace => {
                self.advance();
                let inner = self.parse_sequence()?;
                self.expect(Token::RBrace)?;
                Ok(inner)
            }
            Token::Local
            | Token::If
            | Token::While
            | Token::Do
            | Token::Loop
            | Token::Fun
            | Token::Proc => self.parse_expr(),
            _ => Err(self.unexpected("expression")),
        }
    }
}
