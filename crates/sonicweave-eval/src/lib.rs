//! Interpreter for sonicweave
//!
//! The expression visitor turns AST nodes into runtime values; the statement
//! visitor owns the current scale and the lexical environment. Formatting
//! survives arithmetic through the literal nodes carried on intervals and
//! the preference protocol that decides which operand's node wins.

mod builtins;
mod context;
mod display;
mod env;
mod error;
mod interp;
mod ops;
mod serialize;
mod value;

pub use context::{Inflection, RootContext};
pub use env::Env;
pub use error::EvalError;
pub use interp::Evaluator;
pub use serialize::{value_from_json, value_to_json};
pub use value::{Builtin, Closure, Domain, FunctionBody, Interval, Val, Value};

/// Evaluate a source text and return the rendered current scale.
pub fn evaluate_source(source: &str) -> Result<Vec<String>, EvalError> {
    let mut evaluator = Evaluator::new();
    evaluator.run_source(source)?;
    Ok(evaluator.rendered_scale())
}
