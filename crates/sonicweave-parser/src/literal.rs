//! Payload parsing for notation-heavy tokens
//!
//! The lexer delivers FJS blobs, warts and decimals as raw text; these
//! helpers unpack them into literal nodes.

use num_bigint::BigInt;
use num_traits::{Num, One, Zero};
use sonicweave_ast::{Accidental, DecimalFlavor, IntervalLiteral};
use sonicweave_core::Span;
use sonicweave_monzo::fjs::FjsFlavor;
use sonicweave_monzo::pyth::{Pythagorean, Quality};
use sonicweave_monzo::{rational_pow, Rational};

use crate::error::{ParseError, ParseResult};

fn malformed(message: impl Into<String>, span: Span) -> ParseError {
    ParseError::MalformedLiteral {
        message: message.into(),
        span,
    }
}

/// `3`, `1_000_000`
pub fn parse_integer(text: &str, span: Span) -> ParseResult<BigInt> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    BigInt::from_str_radix(&digits, 10).map_err(|_| malformed("invalid integer", span))
}

/// Mantissa with optional decimal point and exponent, as an exact fraction.
fn parse_mantissa(body: &str, span: Span) -> ParseResult<Rational> {
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(at) => {
            let exponent: i64 = body[at + 1..]
                .parse()
                .map_err(|_| malformed("invalid exponent", span))?;
            (&body[..at], exponent)
        }
        None => (body, 0),
    };
    let (whole, fractional) = match mantissa.find('.') {
        Some(at) => (&mantissa[..at], &mantissa[at + 1..]),
        None => (mantissa, ""),
    };
    let digits: String = whole.chars().chain(fractional.chars()).collect();
    let numerator = parse_integer(&digits, span)?;
    let scale = BigInt::from(fractional.len() as i64) - BigInt::from(exponent);
    let ten = Rational::from_integer(BigInt::from(10));
    let denominator =
        rational_pow(&ten, &scale).ok_or_else(|| malformed("invalid exponent", span))?;
    Ok(Rational::from_integer(numerator) / denominator)
}

/// Decimals and cents: `1.2e`, `3.14r`, `701.955`, `1.955c`, `123.4rc`, `1.2z`
pub fn parse_decimal(text: &str, span: Span) -> ParseResult<IntervalLiteral> {
    let text: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(body) = text.strip_suffix("rc").or_else(|| text.strip_suffix("r¢")) {
        return Ok(IntervalLiteral::Cents {
            amount: parse_mantissa(body, span)?,
            real: true,
        });
    }
    if let Some(body) = text.strip_suffix('r') {
        return Ok(IntervalLiteral::Decimal {
            amount: parse_mantissa(body, span)?,
            flavor: DecimalFlavor::Real,
        });
    }
    if let Some(body) = text.strip_suffix('z') {
        return Ok(IntervalLiteral::Decimal {
            amount: parse_mantissa(body, span)?,
            flavor: DecimalFlavor::Hertz,
        });
    }
    if let Some(body) = text.strip_suffix(['c', '¢']) {
        return Ok(IntervalLiteral::Cents {
            amount: parse_mantissa(body, span)?,
            real: false,
        });
    }
    // A trailing `e` with no digits marks an exact decimal.
    if let Some(body) = text.strip_suffix('e') {
        if !body.ends_with(|c: char| c.is_ascii_digit() || c == '.') {
            return Err(malformed("dangling exponent", span));
        }
        if !body.contains(['e', 'E']) {
            return Ok(IntervalLiteral::Decimal {
                amount: parse_mantissa(body, span)?,
                flavor: DecimalFlavor::Exact,
            });
        }
    }
    if text.contains(['e', 'E']) {
        return Ok(IntervalLiteral::Decimal {
            amount: parse_mantissa(&text, span)?,
            flavor: DecimalFlavor::Exact,
        });
    }
    // A bare decimal point denotes cents.
    Ok(IntervalLiteral::Cents {
        amount: parse_mantissa(&text, span)?,
        real: false,
    })
}

/// `S9`
pub fn parse_square_superparticular(text: &str, span: Span) -> ParseResult<IntervalLiteral> {
    let index: u64 = text[1..]
        .parse()
        .map_err(|_| malformed("invalid superparticular index", span))?;
    if index < 2 {
        return Err(malformed("superparticular indices start at 2", span));
    }
    Ok(IntervalLiteral::SquareSuperparticular(index))
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    span: Span,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, span: Span) -> Self {
        Self {
            chars: text.chars().peekable(),
            span,
        }
    }

    fn ups(&mut self) -> i32 {
        let mut ups = 0;
        while let Some(&c) = self.chars.peek() {
            match c {
                '^' => ups += 1,
                'v' => ups -= 1,
                _ => break,
            }
            self.chars.next();
        }
        ups
    }

    fn digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        digits
    }

    fn number(&mut self) -> ParseResult<i64> {
        let negative = self.chars.peek() == Some(&'-');
        if negative {
            self.chars.next();
        }
        let digits = self.digits();
        let value: i64 = digits
            .parse()
            .map_err(|_| malformed("invalid number", self.span))?;
        Ok(if negative { -value } else { value })
    }

    /// `^5`, `_11n`, `^7h` suffix chains.
    fn inflections(&mut self) -> ParseResult<(Vec<(u64, FjsFlavor)>, Vec<(u64, FjsFlavor)>)> {
        let mut superscripts = Vec::new();
        let mut subscripts = Vec::new();
        while let Some(&c) = self.chars.peek() {
            let superscript = match c {
                '^' => true,
                '_' => false,
                _ => break,
            };
            self.chars.next();
            let digits = self.digits();
            let number: u64 = digits
                .parse()
                .map_err(|_| malformed("invalid inflection", self.span))?;
            let mut tag = String::new();
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_lowercase() && c != 'v' {
                    tag.push(c);
                    self.chars.next();
                } else {
                    break;
                }
            }
            let flavor = FjsFlavor::from_tag(&tag)
                .ok_or_else(|| malformed(format!("unknown flavor tag {tag:?}"), self.span))?;
            if superscript {
                superscripts.push((number, flavor));
            } else {
                subscripts.push((number, flavor));
            }
        }
        Ok((superscripts, subscripts))
    }
}

/// Relative FJS: `M3^5`, `vm6_11`, `aa4`
pub fn parse_fjs(text: &str, span: Span) -> ParseResult<IntervalLiteral> {
    let mut cursor = Cursor::new(text, span);
    let ups = cursor.ups();
    let mut quality_chars = String::new();
    while let Some(&c) = cursor.chars.peek() {
        if matches!(c, 'm' | 'n' | 'M' | 'P' | 'a' | 'd') {
            quality_chars.push(c);
            cursor.chars.next();
        } else {
            break;
        }
    }
    let quality = match quality_chars.as_str() {
        "m" => Quality::Minor,
        "n" => Quality::Neutral,
        "M" => Quality::Major,
        "P" => Quality::Perfect,
        s if !s.is_empty() && s.chars().all(|c| c == 'a') => Quality::Augmented(s.len() as u32),
        s if !s.is_empty() && s.chars().all(|c| c == 'd') => Quality::Diminished(s.len() as u32),
        other => return Err(malformed(format!("invalid quality {other:?}"), span)),
    };
    let degree = cursor
        .digits()
        .parse::<u32>()
        .map_err(|_| malformed("invalid degree", span))?;
    let (superscripts, subscripts) = cursor.inflections()?;
    Ok(IntervalLiteral::Fjs {
        ups,
        lifts: 0,
        pythagorean: Pythagorean::new(quality, degree),
        superscripts,
        subscripts,
    })
}

/// Absolute FJS: `A4`, `Bb5^7`, `C#3`, `E=5`
pub fn parse_absolute_fjs(text: &str, span: Span) -> ParseResult<IntervalLiteral> {
    let mut cursor = Cursor::new(text, span);
    let ups = cursor.ups();
    let nominal = cursor
        .chars
        .next()
        .ok_or_else(|| malformed("missing nominal", span))?;
    let mut accidentals = Vec::new();
    while let Some(&c) = cursor.chars.peek() {
        if let Some(accidental) = Accidental::from_char(c) {
            accidentals.push(accidental);
            cursor.chars.next();
        } else {
            break;
        }
    }
    let octave = cursor.number()? as i32;
    let (superscripts, subscripts) = cursor.inflections()?;
    Ok(IntervalLiteral::AbsoluteFjs {
        ups,
        lifts: 0,
        nominal,
        accidentals,
        octave,
        superscripts,
        subscripts,
    })
}

/// Dot-separated subgroup basis: `2.3.5`, `7/5.11/3`
pub fn parse_basis(text: &str, span: Span) -> ParseResult<Vec<Rational>> {
    let mut basis = Vec::new();
    for element in text.split('.') {
        let fraction = match element.split_once('/') {
            Some((n, d)) => {
                let numerator = parse_integer(n, span)?;
                let denominator = parse_integer(d, span)?;
                if denominator.is_zero() {
                    return Err(malformed("zero denominator in basis", span));
                }
                Rational::new(numerator, denominator)
            }
            None => Rational::from_integer(parse_integer(element, span)?),
        };
        if fraction <= Rational::zero() || fraction.is_one() {
            return Err(malformed("basis elements must exceed unity", span));
        }
        basis.push(fraction);
    }
    Ok(basis)
}

/// `17c@2.3.5.7`, `b13@3`, `12@7/5.11/3`
pub fn parse_warts(text: &str, span: Span) -> ParseResult<IntervalLiteral> {
    let (head, basis_text) = text
        .split_once('@')
        .ok_or_else(|| malformed("missing subgroup", span))?;
    let mut chars = head.chars().peekable();
    let equave = match chars.peek() {
        Some(c) if c.is_ascii_lowercase() => {
            let letter = *c;
            chars.next();
            Some(letter)
        }
        _ => None,
    };
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            chars.next();
        } else {
            break;
        }
    }
    let divisions: u64 = digits
        .parse()
        .map_err(|_| malformed("invalid division count", span))?;
    let warts: Vec<char> = chars.collect();
    if warts.iter().any(|c| !c.is_ascii_lowercase()) {
        return Err(malformed("warts must be lowercase letters", span));
    }
    Ok(IntervalLiteral::Warts {
        equave,
        divisions,
        warts,
        basis: parse_basis(basis_text, span)?,
    })
}

/// `17[^5,v3]@2.3.5`
pub fn parse_sparse_offset(text: &str, span: Span) -> ParseResult<IntervalLiteral> {
    let (head, basis_text) = text
        .split_once('@')
        .ok_or_else(|| malformed("missing subgroup", span))?;
    let (divisions_text, tweaks_text) = head
        .split_once('[')
        .ok_or_else(|| malformed("missing tweak list", span))?;
    let tweaks_text = tweaks_text
        .strip_suffix(']')
        .ok_or_else(|| malformed("unterminated tweak list", span))?;
    let mut chars = divisions_text.chars().peekable();
    let equave = match chars.peek() {
        Some(c) if c.is_ascii_lowercase() => {
            let letter = *c;
            chars.next();
            Some(letter)
        }
        _ => None,
    };
    let divisions: u64 = chars
        .collect::<String>()
        .parse()
        .map_err(|_| malformed("invalid division count", span))?;
    let mut tweaks = Vec::new();
    for item in tweaks_text.split(',') {
        if item.is_empty() {
            continue;
        }
        let mut offset = 0i64;
        let mut rest = item;
        loop {
            if let Some(stripped) = rest.strip_prefix(['^', '+']) {
                offset += 1;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix(['v', '-']) {
                offset -= 1;
                rest = stripped;
            } else {
                break;
            }
        }
        let prime: u64 = rest
            .parse()
            .map_err(|_| malformed("invalid tweak target", span))?;
        if offset == 0 {
            return Err(malformed("tweaks need at least one arrow", span));
        }
        tweaks.push((offset, prime));
    }
    Ok(IntervalLiteral::SparseOffsetVal {
        equave,
        divisions,
        tweaks,
        basis: parse_basis(basis_text, span)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonicweave_monzo::rational;

    fn span() -> Span {
        Span::dummy()
    }

    #[test]
    fn decimal_flavors() {
        assert_eq!(
            parse_decimal("1.2e", span()).unwrap(),
            IntervalLiteral::Decimal {
                amount: rational(6, 5),
                flavor: DecimalFlavor::Exact
            }
        );
        assert_eq!(
            parse_decimal("701.955", span()).unwrap(),
            IntervalLiteral::Cents {
                amount: rational(140391, 200),
                real: false
            }
        );
        assert_eq!(
            parse_decimal("3.14r", span()).unwrap(),
            IntervalLiteral::Decimal {
                amount: rational(157, 50),
                flavor: DecimalFlavor::Real
            }
        );
        assert_eq!(
            parse_decimal("1.2e3", span()).unwrap(),
            IntervalLiteral::Decimal {
                amount: rational(1200, 1),
                flavor: DecimalFlavor::Exact
            }
        );
    }

    #[test]
    fn fjs_blobs() {
        let node = parse_fjs("vm6_5", span()).unwrap();
        match node {
            IntervalLiteral::Fjs {
                ups,
                pythagorean,
                subscripts,
                ..
            } => {
                assert_eq!(ups, -1);
                assert_eq!(pythagorean, Pythagorean::new(Quality::Minor, 6));
                assert_eq!(subscripts, vec![(5, FjsFlavor::Formal)]);
            }
            other => panic!("expected FJS, got {other:?}"),
        }
    }

    #[test]
    fn absolute_blobs() {
        let node = parse_absolute_fjs("Bb5^7", span()).unwrap();
        match node {
            IntervalLiteral::AbsoluteFjs {
                nominal,
                accidentals,
                octave,
                superscripts,
                ..
            } => {
                assert_eq!(nominal, 'B');
                assert_eq!(accidentals, vec![Accidental::Flat]);
                assert_eq!(octave, 5);
                assert_eq!(superscripts, vec![(7, FjsFlavor::Formal)]);
            }
            other => panic!("expected absolute FJS, got {other:?}"),
        }
    }

    #[test]
    fn warts_and_sparse() {
        let node = parse_warts("17c@2.3.5.7", span()).unwrap();
        match node {
            IntervalLiteral::Warts {
                equave,
                divisions,
                warts,
                basis,
            } => {
                assert_eq!(equave, None);
                assert_eq!(divisions, 17);
                assert_eq!(warts, vec!['c']);
                assert_eq!(basis.len(), 4);
            }
            other => panic!("expected warts, got {other:?}"),
        }

        let node = parse_sparse_offset("17[^5,v3]@2.3.5", span()).unwrap();
        match node {
            IntervalLiteral::SparseOffsetVal { tweaks, .. } => {
                assert_eq!(tweaks, vec![(1, 5), (-1, 3)]);
            }
            other => panic!("expected sparse-offset val, got {other:?}"),
        }
    }
}
