//! Pratt expression parser

use sonicweave_ast::{
    ArrayElement, BinaryOperator, Expr, IntervalLiteral, MetricPrefix, Param, Preference,
    UnaryOperator,
};
use sonicweave_core::{intern, intern_string, Span, Spanned};
use sonicweave_lexer::TokenKind;
use sonicweave_monzo::Rational;

use crate::error::{ParseError, ParseResult};
use crate::literal;
use crate::parser::Parser;

// Binding powers, loosest to tightest. Fractions bind tighter than
// exponentiation so that `2^1/3` reads as a cube root.
const BP_LEST: u8 = 2;
const BP_TERNARY: u8 = 4;
const BP_CHORD: u8 = 5;
const BP_NULLISH: u8 = 6;
const BP_OR: u8 = 8;
const BP_AND: u8 = 10;
const BP_NOT: u8 = 12;
const BP_COMPARISON: u8 = 14;
const BP_SEGMENT: u8 = 15;
const BP_ROUNDING: u8 = 16;
const BP_ADD: u8 = 18;
const BP_MUL: u8 = 20;
const BP_UNARY: u8 = 24;
const BP_POW: u8 = 26;
const BP_NEDJI: u8 = 30;
const BP_FRACTION: u8 = 32;

struct InfixOp {
    op: BinaryOperator,
    lbp: u8,
    right_assoc: bool,
}

fn infix(op: BinaryOperator, lbp: u8) -> Option<InfixOp> {
    Some(InfixOp {
        op,
        lbp,
        right_assoc: false,
    })
}

fn infix_right(op: BinaryOperator, lbp: u8) -> Option<InfixOp> {
    Some(InfixOp {
        op,
        lbp,
        right_assoc: true,
    })
}

fn infix_op(token: &TokenKind) -> Option<InfixOp> {
    match token {
        TokenKind::Plus => infix(BinaryOperator::Add, BP_ADD),
        TokenKind::Minus => infix(BinaryOperator::Subtract, BP_ADD),
        TokenKind::LensAdd => infix(BinaryOperator::LensAdd, BP_ADD),
        TokenKind::LensSub => infix(BinaryOperator::LensSub, BP_ADD),
        TokenKind::Star => infix(BinaryOperator::Multiply, BP_MUL),
        TokenKind::Percent => infix(BinaryOperator::Divide, BP_MUL),
        TokenKind::Mod => infix(BinaryOperator::Modulo, BP_MUL),
        TokenKind::ModCeiling => infix(BinaryOperator::ModuloCeiling, BP_MUL),
        TokenKind::Reduce => infix(BinaryOperator::Reduce, BP_MUL),
        TokenKind::ReduceCeiling => infix(BinaryOperator::ReduceCeiling, BP_MUL),
        TokenKind::Dot => infix(BinaryOperator::Dot, BP_MUL),
        TokenKind::Tensor => infix(BinaryOperator::Tensor, BP_MUL),
        TokenKind::Tempered => infix(BinaryOperator::Tmpr, BP_MUL),
        TokenKind::Ed => infix(BinaryOperator::Ed, BP_MUL),
        TokenKind::To => infix(BinaryOperator::To, BP_ROUNDING),
        TokenKind::By => infix(BinaryOperator::By, BP_ROUNDING),
        TokenKind::Max => infix(BinaryOperator::Max, BP_ROUNDING),
        TokenKind::Min => infix(BinaryOperator::Min, BP_ROUNDING),
        TokenKind::Caret => infix_right(BinaryOperator::Pow, BP_POW),
        TokenKind::Recipropower => infix_right(BinaryOperator::Recipropower, BP_POW),
        TokenKind::LogDivide => infix_right(BinaryOperator::LogDivide, BP_POW),
        TokenKind::Slash => infix(BinaryOperator::Fraction, BP_FRACTION),
        TokenKind::StrictEquals => infix(BinaryOperator::StrictEquals, BP_COMPARISON),
        TokenKind::NotStrictEquals => infix(BinaryOperator::NotStrictEquals, BP_COMPARISON),
        TokenKind::Equals => infix(BinaryOperator::Equals, BP_COMPARISON),
        TokenKind::NotEquals => infix(BinaryOperator::NotEquals, BP_COMPARISON),
        TokenKind::LessEquals => infix(BinaryOperator::LessEquals, BP_COMPARISON),
        TokenKind::GreaterEquals => infix(BinaryOperator::GreaterEquals, BP_COMPARISON),
        TokenKind::Less => infix(BinaryOperator::Less, BP_COMPARISON),
        TokenKind::Greater => infix(BinaryOperator::Greater, BP_COMPARISON),
        TokenKind::Of => infix(BinaryOperator::Of, BP_COMPARISON),
        TokenKind::In => infix(BinaryOperator::In, BP_COMPARISON),
        TokenKind::And => infix(BinaryOperator::And, BP_AND),
        TokenKind::Or => infix(BinaryOperator::Or, BP_OR),
        TokenKind::Nullish => infix(BinaryOperator::Nullish, BP_NULLISH),
        TokenKind::Lest => infix(BinaryOperator::Lest, BP_LEST),
        _ => None,
    }
}

/// A metric unit identifier: `Hz`, `kHz`, `ms`, `MiHz`, `s`.
fn unit_literal(name: &str) -> Option<IntervalLiteral> {
    if let Some(prefix) = name.strip_suffix("Hz").or_else(|| name.strip_suffix("hz")) {
        return Some(IntervalLiteral::Hertz {
            prefix: MetricPrefix::from_symbol(prefix)?,
        });
    }
    if let Some(prefix) = name.strip_suffix('s') {
        return Some(IntervalLiteral::Second {
            prefix: MetricPrefix::from_symbol(prefix)?,
        });
    }
    None
}

impl Parser {
    pub fn parse_expression(&mut self) -> ParseResult<Spanned<Expr>> {
        self.parse_bp(0, true)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_owned(),
            found: format!("{:?}", self.current()),
            span: self.current_span(),
        }
    }

    /// Two tokens touch with no whitespace between them; preference tildes
    /// must hug their operator.
    fn adjacent(&self, left: Span, right: Span) -> bool {
        left.end == right.start
    }

    fn parse_bp(&mut self, min_bp: u8, allow_colon: bool) -> ParseResult<Spanned<Expr>> {
        let mut lhs = self.parse_prefix(allow_colon)?;
        loop {
            match self.current().clone() {
                TokenKind::LeftParen => {
                    lhs = self.parse_call(lhs)?;
                }
                TokenKind::LeftBracket => {
                    lhs = self.parse_index_or_slice(lhs, false)?;
                }
                TokenKind::Question if matches!(self.peek_at(1), TokenKind::LeftBracket) => {
                    self.advance();
                    lhs = self.parse_index_or_slice(lhs, true)?;
                }
                TokenKind::Backslash => {
                    if BP_NEDJI < min_bp {
                        break;
                    }
                    lhs = self.parse_nedji(lhs)?;
                }
                TokenKind::Colon if allow_colon => {
                    if BP_CHORD < min_bp {
                        break;
                    }
                    lhs = self.parse_enumerated_chord(lhs)?;
                }
                TokenKind::If => {
                    if BP_TERNARY < min_bp {
                        break;
                    }
                    self.advance();
                    let test = self.parse_bp(BP_TERNARY + 1, allow_colon)?;
                    self.expect(&TokenKind::Else, "else")?;
                    let alternate = self.parse_bp(BP_TERNARY, allow_colon)?;
                    let span = lhs.span.merge(alternate.span);
                    lhs = Spanned::new(
                        Expr::Condition {
                            test: Box::new(test),
                            consequent: Box::new(lhs),
                            alternate: Box::new(alternate),
                        },
                        span,
                    );
                }
                TokenKind::DoubleColon => {
                    if BP_SEGMENT < min_bp {
                        break;
                    }
                    self.advance();
                    let end = self.parse_bp(BP_SEGMENT + 1, allow_colon)?;
                    let span = lhs.span.merge(end.span);
                    lhs = Spanned::new(
                        Expr::HarmonicSegment {
                            root: Box::new(lhs),
                            end: Box::new(end),
                        },
                        span,
                    );
                }
                TokenKind::Not => {
                    // `not of`, `not in`, `not ~of`, `not ~in`
                    if BP_COMPARISON < min_bp {
                        break;
                    }
                    let op = match (self.peek_at(1).clone(), self.peek_at(2).clone()) {
                        (TokenKind::Of, _) => {
                            self.advance();
                            BinaryOperator::NotOf
                        }
                        (TokenKind::In, _) => {
                            self.advance();
                            BinaryOperator::NotIn
                        }
                        (TokenKind::Tilde, TokenKind::Of) => {
                            self.advance();
                            self.advance();
                            BinaryOperator::NotWeakOf
                        }
                        (TokenKind::Tilde, TokenKind::In) => {
                            self.advance();
                            self.advance();
                            BinaryOperator::NotWeakIn
                        }
                        _ => break,
                    };
                    self.advance();
                    let rhs = self.parse_bp(BP_COMPARISON + 1, allow_colon)?;
                    let span = lhs.span.merge(rhs.span);
                    lhs = Spanned::new(
                        Expr::Binary {
                            op,
                            preference: Preference::None,
                            left: Box::new(lhs),
                            right: Box::new(rhs),
                        },
                        span,
                    );
                }
                TokenKind::Tilde => {
                    // `~of` / `~in` weak membership, or a preference tilde
                    // hugging the operator that follows.
                    match self.peek_at(1).clone() {
                        TokenKind::Of | TokenKind::In => {
                            if BP_COMPARISON < min_bp {
                                break;
                            }
                            self.advance();
                            let op = if matches!(self.current(), TokenKind::Of) {
                                BinaryOperator::WeakOf
                            } else {
                                BinaryOperator::WeakIn
                            };
                            self.advance();
                            let rhs = self.parse_bp(BP_COMPARISON + 1, allow_colon)?;
                            let span = lhs.span.merge(rhs.span);
                            lhs = Spanned::new(
                                Expr::Binary {
                                    op,
                                    preference: Preference::None,
                                    left: Box::new(lhs),
                                    right: Box::new(rhs),
                                },
                                span,
                            );
                        }
                        ref next if infix_op(next).is_some() => {
                            let tilde_span = self.current_span();
                            let operator = infix_op(next).expect("checked above");
                            if operator.lbp < min_bp {
                                break;
                            }
                            let op_span = self.peek_span_at(1);
                            if !self.adjacent(tilde_span, op_span) {
                                return Err(self.unexpected("operator after ~"));
                            }
                            self.advance();
                            self.advance();
                            let mut preference = Preference::Left;
                            if matches!(self.current(), TokenKind::Tilde)
                                && self.adjacent(op_span, self.current_span())
                            {
                                self.advance();
                                preference = Preference::Wings;
                            }
                            lhs = self.finish_binary(lhs, operator, preference, allow_colon)?;
                        }
                        _ => break,
                    }
                }
                ref token => {
                    let Some(operator) = infix_op(token) else {
                        break;
                    };
                    if operator.lbp < min_bp {
                        break;
                    }
                    let op_span = self.current_span();
                    self.advance();
                    let mut preference = Preference::None;
                    if matches!(self.current(), TokenKind::Tilde)
                        && self.adjacent(op_span, self.current_span())
                    {
                        self.advance();
                        preference = Preference::Right;
                    }
                    lhs = self.finish_binary(lhs, operator, preference, allow_colon)?;
                }
            }
        }
        Ok(lhs)
    }

    fn finish_binary(
        &mut self,
        lhs: Spanned<Expr>,
        operator: InfixOp,
        preference: Preference,
        allow_colon: bool,
    ) -> ParseResult<Spanned<Expr>> {
        self.skip_newlines_after_operator();
        let next_bp = if operator.right_assoc {
            operator.lbp
        } else {
            operator.lbp + 1
        };
        let rhs = self.parse_bp(next_bp, allow_colon)?;
        let span = lhs.span.merge(rhs.span);
        Ok(Spanned::new(
            Expr::Binary {
                op: operator.op,
                preference,
                left: Box::new(lhs),
                right: Box::new(rhs),
            },
            span,
        ))
    }

    // ===== Prefix and primary =====

    fn parse_prefix(&mut self, allow_colon: bool) -> ParseResult<Spanned<Expr>> {
        let span = self.current_span();
        let unary = |op| (op, false);
        let (op, uniform) = match self.current() {
            TokenKind::Minus => unary(UnaryOperator::Negate),
            TokenKind::Percent => unary(UnaryOperator::Invert),
            TokenKind::Caret => unary(UnaryOperator::Up),
            TokenKind::DownCaret => unary(UnaryOperator::Down),
            TokenKind::Slash => unary(UnaryOperator::Lift),
            TokenKind::Backslash => unary(UnaryOperator::Drop),
            TokenKind::Increment => unary(UnaryOperator::Increment),
            TokenKind::Decrement => unary(UnaryOperator::Decrement),
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_bp(BP_NOT, allow_colon)?;
                let span = span.merge(operand.span);
                return Ok(Spanned::new(
                    Expr::Unary {
                        op: UnaryOperator::Not,
                        uniform: false,
                        operand: Box::new(operand),
                    },
                    span,
                ));
            }
            TokenKind::Tilde => {
                self.advance();
                let op = match self.current() {
                    TokenKind::Minus => UnaryOperator::Negate,
                    TokenKind::Percent => UnaryOperator::Invert,
                    _ => return Err(self.unexpected("unary operator after ~")),
                };
                (op, true)
            }
            _ => return self.parse_primary(allow_colon),
        };
        self.advance();
        let operand = self.parse_bp(BP_UNARY, allow_colon)?;
        let span = span.merge(operand.span);
        Ok(Spanned::new(
            Expr::Unary {
                op,
                uniform,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_primary(&mut self, allow_colon: bool) -> ParseResult<Spanned<Expr>> {
        let span = self.current_span();
        match self.current().clone() {
            TokenKind::Integer(text) => {
                self.advance();
                let value = literal::parse_integer(&text, span)?;
                let expr = Spanned::new(Expr::Literal(IntervalLiteral::Integer(value)), span);
                Ok(self.maybe_unit(expr))
            }
            TokenKind::Decimal(text) => {
                self.advance();
                let node = literal::parse_decimal(&text, span)?;
                let expr = Spanned::new(Expr::Literal(node), span);
                Ok(self.maybe_unit(expr))
            }
            TokenKind::Cent => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(IntervalLiteral::Cent), span))
            }
            TokenKind::SquareSuperparticular(text) => {
                self.advance();
                let node = literal::parse_square_superparticular(&text, span)?;
                Ok(Spanned::new(Expr::Literal(node), span))
            }
            TokenKind::Warts(text) => {
                self.advance();
                let node = literal::parse_warts(&text, span)?;
                Ok(Spanned::new(Expr::Literal(node), span))
            }
            TokenKind::SparseOffsetVal(text) => {
                self.advance();
                let node = literal::parse_sparse_offset(&text, span)?;
                Ok(Spanned::new(Expr::Literal(node), span))
            }
            TokenKind::Fjs(text) => {
                self.advance();
                let node = literal::parse_fjs(&text, span)?;
                Ok(Spanned::new(Expr::Literal(node), span))
            }
            TokenKind::AbsoluteFjs(text) => {
                self.advance();
                let node = literal::parse_absolute_fjs(&text, span)?;
                Ok(Spanned::new(Expr::Literal(node), span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(IntervalLiteral::True), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(IntervalLiteral::False), span))
            }
            TokenKind::Niente => {
                self.advance();
                Ok(Spanned::new(Expr::None, span))
            }
            TokenKind::String(text) => {
                self.advance();
                let content = text[1..text.len() - 1].to_owned();
                Ok(Spanned::new(Expr::String(content), span))
            }
            TokenKind::Color(text) => {
                self.advance();
                Ok(Spanned::new(Expr::Color(text), span))
            }
            TokenKind::Dollar => {
                self.advance();
                Ok(Spanned::new(Expr::CurrentScale, span))
            }
            TokenKind::ParentScale => {
                self.advance();
                Ok(Spanned::new(Expr::ParentScale, span))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if matches!(self.current(), TokenKind::Arrow) {
                    self.advance();
                    let body = self.parse_bp(0, allow_colon)?;
                    let span = span.merge(body.span);
                    return Ok(Spanned::new(
                        Expr::ArrowFunction {
                            params: vec![Param {
                                name: intern_string(name),
                                default: None,
                                rest: false,
                            }],
                            body: Box::new(body),
                        },
                        span,
                    ));
                }
                if let Some(node) = unit_literal(&name) {
                    return Ok(Spanned::new(Expr::Literal(node), span));
                }
                Ok(Spanned::new(Expr::Identifier(intern_string(name)), span))
            }
            TokenKind::LeftParen => {
                if let Some(params) = self.try_arrow_params() {
                    let body = self.parse_bp(0, allow_colon)?;
                    let span = span.merge(body.span);
                    return Ok(Spanned::new(
                        Expr::ArrowFunction {
                            params,
                            body: Box::new(body),
                        },
                        span,
                    ));
                }
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(&TokenKind::RightParen, ")")?;
                Ok(inner)
            }
            TokenKind::LeftBracket => self.parse_bracketed(span),
            TokenKind::Less => self.parse_val_literal(span),
            TokenKind::LeftBrace => self.parse_record(span),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Attach a following unit identifier to a numeric literal.
    fn maybe_unit(&mut self, lhs: Spanned<Expr>) -> Spanned<Expr> {
        if let TokenKind::Identifier(name) = self.current().clone() {
            if let Some(node) = unit_literal(&name) {
                let unit_span = self.current_span();
                self.advance();
                let span = lhs.span.merge(unit_span);
                return Spanned::new(
                    Expr::Binary {
                        op: BinaryOperator::Multiply,
                        preference: Preference::None,
                        left: Box::new(lhs),
                        right: Box::new(Spanned::new(Expr::Literal(node), unit_span)),
                    },
                    span,
                );
            }
        }
        lhs
    }

    // ===== Compound expressions =====

    fn parse_call(&mut self, callee: Spanned<Expr>) -> ParseResult<Spanned<Expr>> {
        self.expect(&TokenKind::LeftParen, "(")?;
        let mut args = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RightParen) {
            let spread = self.match_token(&TokenKind::Spread);
            let expr = self.parse_expression()?;
            args.push(ArrayElement { expr, spread });
            self.skip_newlines();
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        let end = self.expect(&TokenKind::RightParen, ")")?.span;
        let span = callee.span.merge(end);
        Ok(Spanned::new(
            Expr::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }

    fn parse_index_or_slice(
        &mut self,
        object: Spanned<Expr>,
        nullish: bool,
    ) -> ParseResult<Spanned<Expr>> {
        self.expect(&TokenKind::LeftBracket, "[")?;
        self.skip_newlines();
        let start = if self.check(&TokenKind::Range) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        if self.match_token(&TokenKind::Range) {
            let end = if self.check(&TokenKind::RightBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            let close = self.expect(&TokenKind::RightBracket, "]")?.span;
            let span = object.span.merge(close);
            return Ok(Spanned::new(
                Expr::Slice {
                    object: Box::new(object),
                    start: start.map(Box::new),
                    second: None,
                    end,
                },
                span,
            ));
        }
        if self.match_token(&TokenKind::Comma) {
            let second = self.parse_expression()?;
            self.expect(&TokenKind::Range, "..")?;
            let end = if self.check(&TokenKind::RightBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            let close = self.expect(&TokenKind::RightBracket, "]")?.span;
            let span = object.span.merge(close);
            return Ok(Spanned::new(
                Expr::Slice {
                    object: Box::new(object),
                    start: start.map(Box::new),
                    second: Some(Box::new(second)),
                    end,
                },
                span,
            ));
        }
        let index = start.ok_or_else(|| self.unexpected("index expression"))?;
        let close = self.expect(&TokenKind::RightBracket, "]")?.span;
        let span = object.span.merge(close);
        Ok(Spanned::new(
            Expr::Access {
                object: Box::new(object),
                index: Box::new(index),
                nullish,
            },
            span,
        ))
    }

    /// `a\b`, `a\b<3>`, or a bare step count `a\`.
    fn parse_nedji(&mut self, numerator: Spanned<Expr>) -> ParseResult<Spanned<Expr>> {
        let backslash = self.expect(&TokenKind::Backslash, "\\")?.span;
        let starts_expression = matches!(
            self.current(),
            TokenKind::Integer(_)
                | TokenKind::Decimal(_)
                | TokenKind::Identifier(_)
                | TokenKind::LeftParen
                | TokenKind::Minus
        );
        if !starts_expression {
            let span = numerator.span.merge(backslash);
            return Ok(Spanned::new(Expr::Steps(Box::new(numerator)), span));
        }
        let denominator = self.parse_bp(BP_NEDJI + 1, false)?;
        // The equave bracket must hug the denominator, or `<` is an
        // ordinary comparison.
        let equave = if self.check(&TokenKind::Less)
            && self.adjacent(denominator.span, self.current_span())
        {
            self.advance();
            let equave = self.parse_expression()?;
            self.expect(&TokenKind::Greater, ">")?;
            Some(Box::new(equave))
        } else {
            None
        };
        let span = numerator.span.merge(denominator.span);
        Ok(Spanned::new(
            Expr::NedjiProjection {
                numerator: Box::new(numerator),
                denominator: Box::new(denominator),
                equave,
            },
            span,
        ))
    }

    fn parse_enumerated_chord(&mut self, root: Spanned<Expr>) -> ParseResult<Spanned<Expr>> {
        let mut intervals = vec![root];
        while self.match_token(&TokenKind::Colon) {
            intervals.push(self.parse_bp(BP_CHORD + 1, false)?);
        }
        let span = intervals
            .first()
            .expect("chord has a root")
            .span
            .merge(intervals.last().expect("chord has a tail").span);
        Ok(Spanned::new(Expr::EnumeratedChord { intervals }, span))
    }

    /// Arrays, ranges, comprehensions and monzo literals all open with `[`.
    fn parse_bracketed(&mut self, span: Span) -> ParseResult<Spanned<Expr>> {
        if self.monzo_ahead() {
            return self.parse_monzo_literal(span);
        }
        self.expect(&TokenKind::LeftBracket, "[")?;
        self.skip_newlines();
        if self.match_token(&TokenKind::RightBracket) {
            return Ok(Spanned::new(Expr::Array(Vec::new()), span));
        }
        let first_spread = self.match_token(&TokenKind::Spread);
        let first = self.parse_expression()?;

        // `[expr for x of xs if test]`
        if !first_spread && self.check(&TokenKind::For) {
            self.advance();
            if matches!(self.current(), TokenKind::Let | TokenKind::Const) {
                self.advance();
            }
            let (variable, _) = match self.current().clone() {
                TokenKind::Identifier(name) => {
                    let s = self.current_span();
                    self.advance();
                    (intern_string(name), s)
                }
                _ => return Err(self.unexpected("loop variable")),
            };
            self.expect(&TokenKind::Of, "of")?;
            // Stop short of ternaries so the filter's `if` stays visible.
            let iterable = self.parse_bp(BP_TERNARY + 1, true)?;
            let test = if self.match_token(&TokenKind::If) {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            let close = self.expect(&TokenKind::RightBracket, "]")?.span;
            return Ok(Spanned::new(
                Expr::Comprehension {
                    expr: Box::new(first),
                    variable,
                    iterable: Box::new(iterable),
                    test,
                },
                span.merge(close),
            ));
        }

        // `[start .. end]`
        if !first_spread && self.match_token(&TokenKind::Range) {
            let end = self.parse_expression()?;
            let close = self.expect(&TokenKind::RightBracket, "]")?.span;
            return Ok(Spanned::new(
                Expr::Range {
                    start: Box::new(first),
                    second: None,
                    end: Box::new(end),
                },
                span.merge(close),
            ));
        }

        let mut elements = vec![ArrayElement {
            expr: first,
            spread: first_spread,
        }];
        while self.match_token(&TokenKind::Comma) {
            self.skip_newlines();
            if self.check(&TokenKind::RightBracket) {
                break;
            }
            let spread = self.match_token(&TokenKind::Spread);
            let expr = self.parse_expression()?;
            // `[start, second .. end]`
            if elements.len() == 1 && !spread && !elements[0].spread {
                if self.match_token(&TokenKind::Range) {
                    let end = self.parse_expression()?;
                    let close = self.expect(&TokenKind::RightBracket, "]")?.span;
                    let start = elements.pop().expect("first element present").expr;
                    return Ok(Spanned::new(
                        Expr::Range {
                            start: Box::new(start),
                            second: Some(Box::new(expr)),
                            end: Box::new(end),
                        },
                        span.merge(close),
                    ));
                }
            }
            elements.push(ArrayElement { expr, spread });
            self.skip_newlines();
        }
        self.skip_newlines();
        let close = self.expect(&TokenKind::RightBracket, "]")?.span;
        Ok(Spanned::new(Expr::Array(elements), span.merge(close)))
    }

    /// Look ahead for `>` before the closing `]`: that makes `[` a monzo.
    fn monzo_ahead(&self) -> bool {
        let mut offset = 1;
        loop {
            match self.peek_at(offset) {
                TokenKind::Greater => return true,
                TokenKind::Integer(_)
                | TokenKind::Decimal(_)
                | TokenKind::Minus
                | TokenKind::Slash
                | TokenKind::Comma => offset += 1,
                _ => return false,
            }
        }
    }

    fn parse_signed_fraction(&mut self) -> ParseResult<Rational> {
        let negative = self.match_token(&TokenKind::Minus);
        let numerator = match self.current().clone() {
            TokenKind::Integer(text) => {
                let span = self.current_span();
                self.advance();
                literal::parse_integer(&text, span)?
            }
            _ => return Err(self.unexpected("number")),
        };
        let value = if self.match_token(&TokenKind::Slash) {
            let denominator = match self.current().clone() {
                TokenKind::Integer(text) => {
                    let span = self.current_span();
                    self.advance();
                    literal::parse_integer(&text, span)?
                }
                _ => return Err(self.unexpected("denominator")),
            };
            Rational::new(numerator, denominator)
        } else {
            Rational::from_integer(numerator)
        };
        Ok(if negative { -value } else { value })
    }

    fn parse_basis_annotation(&mut self) -> ParseResult<Option<Vec<Rational>>> {
        if let TokenKind::BasisAnnotation(text) = self.current().clone() {
            let span = self.current_span();
            self.advance();
            return Ok(Some(literal::parse_basis(&text[1..], span)?));
        }
        Ok(None)
    }

    /// `[-4 4 -1>` with an optional basis annotation.
    fn parse_monzo_literal(&mut self, span: Span) -> ParseResult<Spanned<Expr>> {
        self.expect(&TokenKind::LeftBracket, "[")?;
        let mut components = Vec::new();
        loop {
            self.match_token(&TokenKind::Comma);
            if self.check(&TokenKind::Greater) {
                break;
            }
            components.push(self.parse_signed_fraction()?);
        }
        let close = self.expect(&TokenKind::Greater, ">")?.span;
        let basis = self.parse_basis_annotation()?;
        Ok(Spanned::new(
            Expr::Literal(IntervalLiteral::Monzo { components, basis }),
            span.merge(close),
        ))
    }

    /// `<12 19 28]` with an optional basis annotation.
    fn parse_val_literal(&mut self, span: Span) -> ParseResult<Spanned<Expr>> {
        self.expect(&TokenKind::Less, "<")?;
        let mut components = Vec::new();
        loop {
            self.match_token(&TokenKind::Comma);
            if self.check(&TokenKind::RightBracket) {
                break;
            }
            components.push(self.parse_signed_fraction()?);
        }
        let close = self.expect(&TokenKind::RightBracket, "]")?.span;
        let basis = self.parse_basis_annotation()?;
        Ok(Spanned::new(
            Expr::Literal(IntervalLiteral::Val { components, basis }),
            span.merge(close),
        ))
    }

    /// `{key: value, "other key": value}`
    fn parse_record(&mut self, span: Span) -> ParseResult<Spanned<Expr>> {
        self.expect(&TokenKind::LeftBrace, "{")?;
        let mut entries = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RightBrace) {
            let key = match self.current().clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    name
                }
                TokenKind::String(text) => {
                    self.advance();
                    text[1..text.len() - 1].to_owned()
                }
                _ => return Err(self.unexpected("record key")),
            };
            self.expect(&TokenKind::Colon, ":")?;
            self.skip_newlines();
            let value = self.parse_bp(0, false)?;
            entries.push((key, value));
            self.skip_newlines();
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        let close = self.expect(&TokenKind::RightBrace, "}")?.span;
        Ok(Spanned::new(
            Expr::Record(entries),
            span.merge(close),
        ))
    }

    /// Backtracking probe for `(a, b = 1, ...rest) =>`.
    fn try_arrow_params(&mut self) -> Option<Vec<Param>> {
        let save = self.save_position();
        if !self.match_token(&TokenKind::LeftParen) {
            return None;
        }
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            if self.match_token(&TokenKind::RightParen) {
                break;
            }
            let rest = self.match_token(&TokenKind::Spread);
            let name = match self.current().clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    intern(&name)
                }
                _ => {
                    self.restore_position(save);
                    return None;
                }
            };
            let default = if self.match_token(&TokenKind::Assign) {
                match self.parse_bp(BP_CHORD + 1, false) {
                    Ok(expr) => Some(expr),
                    Err(_) => {
                        self.restore_position(save);
                        return None;
                    }
                }
            } else {
                None
            };
            params.push(Param {
                name,
                default,
                rest,
            });
            self.match_token(&TokenKind::Comma);
        }
        if self.match_token(&TokenKind::Arrow) {
            Some(params)
        } else {
            self.restore_position(save);
            None
        }
    }
}
