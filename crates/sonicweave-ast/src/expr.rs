//! Expression nodes

use std::fmt;

use sonicweave_core::{InternedStr, Spanned};

use crate::literal::IntervalLiteral;
use crate::stmt::Param;

/// Which operand's formatting the result of a binary operation inherits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Preference {
    /// `a + b`: compatible nodes merge, otherwise the formatting drops.
    #[default]
    None,
    /// `a ~+ b`: the left node is rewritten to the computed value.
    Left,
    /// `a +~ b`: the right node is rewritten to the computed value.
    Right,
    /// `a ~+~ b`: left-preferring, but the domain turns linear when any
    /// operand is linear.
    Wings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// `a/b`: division that prefers fraction formatting.
    Fraction,
    Modulo,
    ModuloCeiling,
    Reduce,
    ReduceCeiling,
    Pow,
    /// `a /^ b`: the b:th root of a.
    Recipropower,
    /// `a /_ b`: logarithm of a in base b.
    LogDivide,
    Dot,
    Tensor,
    /// `v tmpr i`: project an interval onto a val's step lattice.
    Tmpr,
    /// `a ed b`: reinterpret the octave fraction of a against the equave b.
    Ed,
    /// `a to b`: round a to the nearest multiple of b.
    To,
    /// `a by b`: round a to the nearest power of b.
    By,
    Max,
    Min,
    LensAdd,
    LensSub,
    StrictEquals,
    NotStrictEquals,
    Equals,
    NotEquals,
    LessEquals,
    GreaterEquals,
    Less,
    Greater,
    And,
    Or,
    /// `a ?? b`: b when a is niente.
    Nullish,
    /// `a lest b`: b when evaluating a throws.
    Lest,
    Of,
    NotOf,
    WeakOf,
    NotWeakOf,
    In,
    NotIn,
    WeakIn,
    NotWeakIn,
}

impl BinaryOperator {
    /// Operators whose right operand must not be evaluated eagerly.
    pub fn is_lazy(&self) -> bool {
        matches!(
            self,
            BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Nullish | BinaryOperator::Lest
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "%",
            BinaryOperator::Fraction => "/",
            BinaryOperator::Modulo => "mod",
            BinaryOperator::ModuloCeiling => "modc",
            BinaryOperator::Reduce => "rd",
            BinaryOperator::ReduceCeiling => "rdc",
            BinaryOperator::Pow => "^",
            BinaryOperator::Recipropower => "/^",
            BinaryOperator::LogDivide => "/_",
            BinaryOperator::Dot => "dot",
            BinaryOperator::Tensor => "tns",
            BinaryOperator::Tmpr => "tmpr",
            BinaryOperator::Ed => "ed",
            BinaryOperator::To => "to",
            BinaryOperator::By => "by",
            BinaryOperator::Max => "max",
            BinaryOperator::Min => "min",
            BinaryOperator::LensAdd => "/+",
            BinaryOperator::LensSub => "/-",
            BinaryOperator::StrictEquals => "===",
            BinaryOperator::NotStrictEquals => "!==",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::LessEquals => "<=",
            BinaryOperator::GreaterEquals => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Nullish => "??",
            BinaryOperator::Lest => "lest",
            BinaryOperator::Of => "of",
            BinaryOperator::NotOf => "not of",
            BinaryOperator::WeakOf => "~of",
            BinaryOperator::NotWeakOf => "not ~of",
            BinaryOperator::In => "in",
            BinaryOperator::NotIn => "not in",
            BinaryOperator::WeakIn => "~in",
            BinaryOperator::NotWeakIn => "not ~in",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `-x`: negation.
    Negate,
    /// `%x` / `÷x`: reciprocal.
    Invert,
    /// `^x`: one up-step.
    Up,
    /// `vx`: one down-step.
    Down,
    /// `/x`: one lift.
    Lift,
    /// `\x`: one drop.
    Drop,
    Not,
    /// `++x`: linear increment.
    Increment,
    /// `--x`: linear decrement.
    Decrement,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Invert => "%",
            UnaryOperator::Up => "^",
            UnaryOperator::Down => "v",
            UnaryOperator::Lift => "/",
            UnaryOperator::Drop => "\\",
            UnaryOperator::Not => "not",
            UnaryOperator::Increment => "++",
            UnaryOperator::Decrement => "--",
        };
        write!(f, "{symbol}")
    }
}

/// Array element or call argument with optional spread.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayElement {
    pub expr: Spanned<Expr>,
    pub spread: bool,
}

pub type CallArgument = ArrayElement;

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(IntervalLiteral),
    String(String),
    Color(String),
    None,
    Identifier(InternedStr),
    /// `$`: the current scale.
    CurrentScale,
    /// `$$`: the enclosing scale.
    ParentScale,
    Binary {
        op: BinaryOperator,
        preference: Preference,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    Unary {
        op: UnaryOperator,
        /// `~-x` applies only to the value and transforms the node in place.
        uniform: bool,
        operand: Box<Spanned<Expr>>,
    },
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<CallArgument>,
    },
    ArrowFunction {
        params: Vec<Param>,
        body: Box<Spanned<Expr>>,
    },
    Array(Vec<ArrayElement>),
    Record(Vec<(String, Spanned<Expr>)>),
    /// `[start, second .. end]`.
    Range {
        start: Box<Spanned<Expr>>,
        second: Option<Box<Spanned<Expr>>>,
        end: Box<Spanned<Expr>>,
    },
    /// `a\b`, optionally with an equave: `6\13<3>`.
    NedjiProjection {
        numerator: Box<Spanned<Expr>>,
        denominator: Box<Spanned<Expr>>,
        equave: Option<Box<Spanned<Expr>>>,
    },
    /// `7\`: a bare step count.
    Steps(Box<Spanned<Expr>>),
    /// `a::b`.
    HarmonicSegment {
        root: Box<Spanned<Expr>>,
        end: Box<Spanned<Expr>>,
    },
    /// `4:5:6`.
    EnumeratedChord {
        intervals: Vec<Spanned<Expr>>,
    },
    Access {
        object: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
        /// `a?[i]` yields niente instead of a range error.
        nullish: bool,
    },
    Slice {
        object: Box<Spanned<Expr>>,
        start: Option<Box<Spanned<Expr>>>,
        second: Option<Box<Spanned<Expr>>>,
        end: Option<Box<Spanned<Expr>>>,
    },
    /// `a if test else b`.
    Condition {
        test: Box<Spanned<Expr>>,
        consequent: Box<Spanned<Expr>>,
        alternate: Box<Spanned<Expr>>,
    },
    /// `[expr for x of xs if test]`.
    Comprehension {
        expr: Box<Spanned<Expr>>,
        variable: InternedStr,
        iterable: Box<Spanned<Expr>>,
        test: Option<Box<Spanned<Expr>>>,
    },
}
