//! Lexer driver

use logos::Logos;
use sonicweave_core::Span;

use crate::token::TokenKind;

/// A token with its source span
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(span: Span) -> Self {
        Self {
            kind: TokenKind::Eof,
            span,
        }
    }
}

/// Lexer for sonicweave source code
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
        }
    }

    fn current_span(&self) -> Span {
        Span::from(self.inner.span())
    }

    /// Tokenize the entire source, mapping unlexable characters to error
    /// tokens and terminating with EOF.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(result) = self.inner.next() {
            let kind = match result {
                Ok(kind) => kind,
                Err(()) => TokenKind::Error,
            };
            tokens.push(Token::new(kind, self.current_span()));
        }
        let end = self.inner.span().end;
        tokens.push(Token::eof(Span::new(end, end)));
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_fractions_and_nedji() {
        let tokens = lex("3/2 7\\12");
        assert_eq!(tokens[0], TokenKind::Integer("3".to_string()));
        assert_eq!(tokens[1], TokenKind::Slash);
        assert_eq!(tokens[2], TokenKind::Integer("2".to_string()));
        assert_eq!(tokens[3], TokenKind::Integer("7".to_string()));
        assert_eq!(tokens[4], TokenKind::Backslash);
        assert_eq!(tokens[5], TokenKind::Integer("12".to_string()));
    }

    #[test]
    fn lexes_cents_and_decimal_flavors() {
        let tokens = lex("701.955 1.2e 3.14r 1.955c");
        assert_eq!(tokens[0], TokenKind::Decimal("701.955".to_string()));
        assert_eq!(tokens[1], TokenKind::Decimal("1.2e".to_string()));
        assert_eq!(tokens[2], TokenKind::Decimal("3.14r".to_string()));
        assert_eq!(tokens[3], TokenKind::Decimal("1.955c".to_string()));
    }

    #[test]
    fn lexes_fjs_blobs_as_single_tokens() {
        let tokens = lex("M3^5 n6_11 A4 Bb5^7");
        assert_eq!(tokens[0], TokenKind::Fjs("M3^5".to_string()));
        assert_eq!(tokens[1], TokenKind::Fjs("n6_11".to_string()));
        assert_eq!(tokens[2], TokenKind::AbsoluteFjs("A4".to_string()));
        assert_eq!(tokens[3], TokenKind::AbsoluteFjs("Bb5^7".to_string()));
    }

    #[test]
    fn lexes_vals_and_warts() {
        let tokens = lex("<12 19] 17c@2.3.5.7 17[^5,v3]@2.3.5");
        assert_eq!(tokens[0], TokenKind::Less);
        assert_eq!(tokens[4], TokenKind::Warts("17c@2.3.5.7".to_string()));
        assert_eq!(
            tokens[5],
            TokenKind::SparseOffsetVal("17[^5,v3]@2.3.5".to_string())
        );
    }

    #[test]
    fn tilde_wrapped_operators() {
        let tokens = lex("2 ~+ 3 2 +~ 3");
        assert_eq!(tokens[1], TokenKind::Tilde);
        assert_eq!(tokens[2], TokenKind::Plus);
        assert_eq!(tokens[5], TokenKind::Plus);
        assert_eq!(tokens[6], TokenKind::Tilde);
    }

    #[test]
    fn preference_wings_and_scale_references() {
        let tokens = lex("$ $$ ??");
        assert_eq!(tokens[0], TokenKind::Dollar);
        assert_eq!(tokens[1], TokenKind::ParentScale);
        assert_eq!(tokens[2], TokenKind::Nullish);
    }
}
