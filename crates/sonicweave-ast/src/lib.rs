//! Abstract syntax tree for sonicweave
//!
//! Expressions and statements are plain sum types with exhaustive matches.
//! The interval-literal taxonomy doubles as the formatting node carried on
//! runtime intervals: printing an interval dispatches on the node it was
//! built from, which is how notation survives arithmetic.

mod expr;
mod literal;
mod stmt;

pub use expr::{
    ArrayElement, BinaryOperator, CallArgument, Expr, Preference, UnaryOperator,
};
pub use literal::{Accidental, DecimalFlavor, IntervalLiteral, MetricPrefix, NedjiData};
pub use stmt::{AssignmentTarget, Param, Program, Statement};
