//! Exact interval arithmetic for sonicweave
//!
//! The value model is the timed monzo: a rational time exponent, a vector of
//! rational prime exponents and a rational residual that is coprime to the
//! tracked primes. Values that leave the rational world fall back to a
//! double-precision real carrying the same time exponent.

mod error;
pub mod fjs;
mod monzo;
pub mod primes;
pub mod pyth;
mod quantity;
mod real;

pub use error::MonzoError;
pub use monzo::{PowOutcome, TimeMonzo};
pub use quantity::Quantity;
pub use real::TimeReal;

use num_bigint::BigInt;

/// Arbitrary-precision rational used for exponents, residuals and time exponents.
pub type Rational = num_rational::BigRational;

/// Shorthand for a small rational.
pub fn rational(numer: i64, denom: i64) -> Rational {
    Rational::new(BigInt::from(numer), BigInt::from(denom))
}

/// Shorthand for a small integer as a rational.
pub fn integer(value: i64) -> Rational {
    Rational::from_integer(BigInt::from(value))
}

/// Raise a rational to a signed big-integer power. `None` on 0^negative.
pub fn rational_pow(base: &Rational, exponent: &BigInt) -> Option<Rational> {
    use num_traits::{One, Signed, ToPrimitive, Zero};

    if exponent.is_zero() {
        return Some(Rational::one());
    }
    let magnitude = exponent.abs().to_u64()?;
    let mut result = Rational::one();
    let mut power = base.clone();
    let mut remaining = magnitude;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result *= &power;
        }
        remaining >>= 1;
        if remaining > 0 {
            power = &power * &power;
        }
    }
    if exponent.is_negative() {
        if result.is_zero() {
            return None;
        }
        result = result.recip();
    }
    Some(result)
}

/// Base-2 logarithm of a rational via doubles. Loses precision for huge
/// operands but is only used for ordering and display heuristics.
pub fn rational_log2(value: &Rational) -> f64 {
    use num_traits::ToPrimitive;

    let numer = value.numer().to_f64().unwrap_or(f64::INFINITY);
    let denom = value.denom().to_f64().unwrap_or(f64::INFINITY);
    numer.log2() - denom.log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow_by_big_exponent() {
        let base = rational(3, 2);
        let cube = rational_pow(&base, &BigInt::from(3)).unwrap();
        assert_eq!(cube, rational(27, 8));
        let inverse_cube = rational_pow(&base, &BigInt::from(-3)).unwrap();
        assert_eq!(inverse_cube, rational(8, 27));
    }

    #[test]
    fn log2_of_ratio() {
        assert!((rational_log2(&rational(4, 1)) - 2.0).abs() < 1e-12);
        assert!((rational_log2(&rational(3, 2)) - 0.5849625007211562).abs() < 1e-12);
    }
}
