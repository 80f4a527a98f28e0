//! Parser driver and statement grammar

use sonicweave_ast::{AssignmentTarget, Expr, Param, Program, Statement};
use sonicweave_core::{intern_string, Diagnostics, Span, Spanned};
use sonicweave_lexer::{Lexer, Token, TokenKind};

use crate::error::{ParseError, ParseResult};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Diagnostics,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self {
            tokens: Lexer::new(source).tokenize(),
            pos: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn parse_program(mut self) -> (Program, Diagnostics) {
        let mut statements = Vec::new();
        self.skip_terminators();
        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    self.diagnostics.error(error.to_string(), error.span());
                    self.synchronize();
                }
            }
            self.skip_terminators();
        }
        (Program::new(statements), self.diagnostics)
    }

    // ===== Token navigation =====

    pub fn is_at_end(&self) -> bool {
        matches!(self.current(), TokenKind::Eof)
    }

    pub fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with EOF"))
    }

    pub fn peek_at(&self, offset: usize) -> &TokenKind {
        &self
            .tokens
            .get(self.pos + offset)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with EOF"))
            .kind
    }

    pub fn peek_span_at(&self, offset: usize) -> Span {
        self.tokens
            .get(self.pos + offset)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with EOF"))
            .span
    }

    pub(crate) fn save_position(&self) -> usize {
        self.pos
    }

    pub(crate) fn restore_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Operators may continue onto the next line.
    pub(crate) fn skip_newlines_after_operator(&mut self) {
        self.skip_newlines();
    }

    pub fn current(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub fn current_span(&self) -> Span {
        self.peek().span
    }

    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    pub fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(kind)
    }

    pub fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: &TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.to_owned(),
                found: format!("{:?}", self.current()),
                span: self.current_span(),
            })
        }
    }

    /// Skip newlines only; used inside bracketed constructs.
    pub fn skip_newlines(&mut self) {
        while matches!(self.current(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_terminators(&mut self) {
        while matches!(self.current(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Drop tokens until a statement boundary after a parse error.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if self.current().is_terminator() || matches!(self.current(), TokenKind::RightBrace) {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    fn expect_terminator(&mut self) -> ParseResult<()> {
        if self.current().is_terminator() {
            if !self.is_at_end() {
                self.advance();
            }
            Ok(())
        } else if matches!(self.current(), TokenKind::RightBrace) {
            // Block ends terminate the final statement.
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: "end of statement".to_owned(),
                found: format!("{:?}", self.current()),
                span: self.current_span(),
            })
        }
    }

    fn identifier(&mut self) -> ParseResult<(sonicweave_core::InternedStr, Span)> {
        match self.current().clone() {
            TokenKind::Identifier(name) => {
                let span = self.current_span();
                self.advance();
                Ok((intern_string(name), span))
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "identifier".to_owned(),
                found: format!("{other:?}"),
                span: self.current_span(),
            }),
        }
    }

    // ===== Statements =====

    pub fn parse_statement(&mut self) -> ParseResult<Spanned<Statement>> {
        let start = self.current_span();
        match self.current() {
            TokenKind::Let => self.parse_variable_declaration(true),
            TokenKind::Const => self.parse_variable_declaration(false),
            TokenKind::Riff | TokenKind::Fn => self.parse_function_declaration(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::If => self.parse_if(),
            TokenKind::Return => {
                self.advance();
                let value = if self.current().is_terminator()
                    || matches!(self.current(), TokenKind::RightBrace)
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect_terminator()?;
                Ok(Spanned::new(Statement::Return(value), start))
            }
            TokenKind::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect_terminator()?;
                Ok(Spanned::new(Statement::Throw(value), start))
            }
            TokenKind::Break => {
                self.advance();
                self.expect_terminator()?;
                Ok(Spanned::new(Statement::Break, start))
            }
            TokenKind::Continue => {
                self.advance();
                self.expect_terminator()?;
                Ok(Spanned::new(Statement::Continue, start))
            }
            TokenKind::LeftBrace => {
                let statements = self.parse_block()?;
                Ok(Spanned::new(Statement::Block(statements), start))
            }
            // `^ = 81/80`
            TokenKind::Caret if matches!(self.peek_at(1), TokenKind::Assign) => {
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                self.expect_terminator()?;
                Ok(Spanned::new(Statement::UpDeclaration { value }, start))
            }
            // `/ = 5.0c`
            TokenKind::Slash if matches!(self.peek_at(1), TokenKind::Assign) => {
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                self.expect_terminator()?;
                Ok(Spanned::new(Statement::LiftDeclaration { value }, start))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration(&mut self, mutable: bool) -> ParseResult<Spanned<Statement>> {
        let start = self.current_span();
        self.advance();
        let (name, _) = self.identifier()?;
        let value = if self.match_token(&TokenKind::Assign) {
            Some(self.parse_expression()?)
        } else if mutable {
            None
        } else {
            return Err(ParseError::UnexpectedToken {
                expected: "= initializer for const".to_owned(),
                found: format!("{:?}", self.current()),
                span: self.current_span(),
            });
        };
        self.expect_terminator()?;
        Ok(Spanned::new(
            Statement::VariableDeclaration {
                name,
                value,
                mutable,
            },
            start,
        ))
    }

    fn parse_function_declaration(&mut self) -> ParseResult<Spanned<Statement>> {
        let start = self.current_span();
        self.advance();
        let (name, _) = self.identifier()?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::LeftBrace) {
            self.match_token(&TokenKind::Comma);
            if self.check(&TokenKind::LeftBrace) {
                break;
            }
            let rest = self.match_token(&TokenKind::Spread);
            let (param_name, _) = self.identifier()?;
            let default = if self.match_token(&TokenKind::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Param {
                name: param_name,
                default,
                rest,
            });
        }
        let body = self.parse_block()?;
        Ok(Spanned::new(
            Statement::FunctionDeclaration { name, params, body },
            start,
        ))
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Spanned<Statement>>> {
        self.expect(&TokenKind::LeftBrace, "{")?;
        let mut statements = Vec::new();
        self.skip_terminators();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(ParseError::UnexpectedEof {
                    span: self.current_span(),
                });
            }
            statements.push(self.parse_statement()?);
            self.skip_terminators();
        }
        self.expect(&TokenKind::RightBrace, "}")?;
        Ok(statements)
    }

    fn parse_loop_body(&mut self) -> ParseResult<Box<Spanned<Statement>>> {
        self.skip_newlines();
        Ok(Box::new(self.parse_statement()?))
    }

    fn parse_while(&mut self) -> ParseResult<Spanned<Statement>> {
        let start = self.current_span();
        self.advance();
        let test = self.parse_expression()?;
        let body = self.parse_loop_body()?;
        Ok(Spanned::new(Statement::While { test, body }, start))
    }

    fn parse_for(&mut self) -> ParseResult<Spanned<Statement>> {
        let start = self.current_span();
        self.advance();
        // Tolerate an optional declaration keyword: `for const i of …`.
        if matches!(self.current(), TokenKind::Let | TokenKind::Const) {
            self.advance();
        }
        let (variable, _) = self.identifier()?;
        self.expect(&TokenKind::Of, "of")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_loop_body()?;
        Ok(Spanned::new(
            Statement::ForOf {
                variable,
                iterable,
                body,
            },
            start,
        ))
    }

    fn parse_if(&mut self) -> ParseResult<Spanned<Statement>> {
        let start = self.current_span();
        self.advance();
        let test = self.parse_expression()?;
        let consequent = self.parse_loop_body()?;
        let alternate = if self.match_token(&TokenKind::Else) {
            Some(self.parse_loop_body()?)
        } else {
            None
        };
        Ok(Spanned::new(
            Statement::If {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    /// Expression statements cover plain expressions, assignments and pitch
    /// declarations; which one only becomes clear after `=`.
    fn parse_expression_statement(&mut self) -> ParseResult<Spanned<Statement>> {
        let start = self.current_span();
        let left = self.parse_expression()?;
        if !self.match_token(&TokenKind::Assign) {
            self.expect_terminator()?;
            return Ok(Spanned::new(Statement::Expression(left), start));
        }
        let right = self.parse_expression()?;
        if self.match_token(&TokenKind::Assign) {
            let third = self.parse_expression()?;
            self.expect_terminator()?;
            return Ok(Spanned::new(
                Statement::PitchDeclaration {
                    left,
                    middle: Some(right),
                    right: third,
                },
                start,
            ));
        }
        self.expect_terminator()?;
        let statement = match &left.node {
            Expr::Identifier(name) => Statement::Assignment {
                target: AssignmentTarget::Name(*name),
                value: right,
            },
            Expr::Access { object, index, .. } => Statement::Assignment {
                target: AssignmentTarget::Index {
                    object: (**object).clone(),
                    index: (**index).clone(),
                },
                value: right,
            },
            _ => Statement::PitchDeclaration {
                left,
                middle: None,
                right,
            },
        };
        Ok(Spanned::new(statement, start))
    }
}
