//! Evaluation failures
//!
//! Operators either succeed exactly or throw one of these; propagation is a
//! non-local exit up to the nearest `lest` or the top level.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum EvalError {
    #[error("type error: {0}")]
    Type(String),

    #[error("domain error: {0}")]
    Domain(String),

    #[error("echelon error: {0}")]
    Echelon(String),

    #[error("undefined: {0}")]
    Lookup(String),

    #[error("index {index} out of range for length {len}")]
    Range { index: i64, len: usize },

    #[error("out of gas")]
    OutOfGas,

    #[error("resource error: {0}")]
    Resource(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// User `throw`; the payload is the rendered value.
    #[error("{0}")]
    Thrown(String),
}

impl From<sonicweave_monzo::MonzoError> for EvalError {
    fn from(error: sonicweave_monzo::MonzoError) -> Self {
        use sonicweave_monzo::MonzoError;
        match &error {
            MonzoError::UnitMismatch => EvalError::Echelon(error.to_string()),
            MonzoError::UnfactorableResidual => EvalError::Resource(error.to_string()),
            _ => EvalError::Domain(error.to_string()),
        }
    }
}
