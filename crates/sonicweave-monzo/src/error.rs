use thiserror::Error;

/// Failures of the exact value layer.
///
/// Operators either succeed exactly, escape to the real form, or report one
/// of these; there is no partial recovery inside the algebra.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MonzoError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot raise a negative value to a fractional power")]
    NegativeRoot,

    #[error("operands must have the same time exponent")]
    UnitMismatch,

    #[error("value cannot be expressed as a fraction")]
    NotAFraction,

    #[error("zero has no logarithm")]
    LogOfZero,

    #[error("modulo by unison is undefined")]
    UnisonModulo,

    #[error("the dot product requires fully factorable residuals")]
    UnfactorableResidual,
}
