//! Standard prelude for sonicweave
//!
//! Derived riffs written in the language itself, loaded into every
//! evaluator before user code. Scale primitives (`sort`, `rotate`,
//! `mergeOffset`, …) are native and live in the evaluator.

/// Conversion and generator riffs.
pub const RIFFS: &str = include_str!("prelude/riffs.sw");

/// The whole prelude, loaded in order.
pub const PRELUDE: &str = include_str!("prelude/riffs.sw");
