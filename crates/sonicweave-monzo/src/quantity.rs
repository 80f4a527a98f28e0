//! The union of the exact and real value forms
//!
//! Operators compute exactly whenever the rational world is closed under
//! them and otherwise escape to [`TimeReal`]. The escape is deterministic:
//! a result is real exactly when an operand was real or when an exact rule
//! says closure fails (unfactorable residual under a fractional power,
//! irrational logarithm, and so on). Mixed operands never produce a
//! rational-preferred result.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};

use crate::error::MonzoError;
use crate::monzo::{PowOutcome, TimeMonzo};
use crate::real::TimeReal;
use crate::Rational;

#[derive(Clone, Debug)]
pub enum Quantity {
    Exact(TimeMonzo),
    Real(TimeReal),
}

impl Quantity {
    pub fn unity() -> Self {
        Quantity::Exact(TimeMonzo::unity())
    }

    pub fn zero() -> Self {
        Quantity::Exact(TimeMonzo::zero())
    }

    pub fn from_int(value: i64) -> Self {
        Quantity::Exact(TimeMonzo::from_int(value))
    }

    pub fn from_fraction(numerator: i64, denominator: i64) -> Self {
        Quantity::Exact(TimeMonzo::from_fraction(numerator, denominator))
    }

    pub fn from_rational(value: &Rational) -> Self {
        Quantity::Exact(TimeMonzo::from_rational(value))
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Quantity::Real(_))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Quantity::Exact(monzo) => monzo.is_zero(),
            Quantity::Real(real) => real.is_zero(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Quantity::Exact(monzo) => monzo.is_negative(),
            Quantity::Real(real) => real.is_negative(),
        }
    }

    pub fn is_unity(&self) -> bool {
        match self {
            Quantity::Exact(monzo) => monzo.is_unity(),
            Quantity::Real(real) => real.value == 1.0,
        }
    }

    /// Relative quantities carry no time dimension.
    pub fn is_relative(&self) -> bool {
        match self {
            Quantity::Exact(monzo) => monzo.is_relative(),
            Quantity::Real(real) => real.time_exponent == 0.0,
        }
    }

    /// The time exponent as a rational; real time exponents round-trip
    /// through small denominators only.
    pub fn time_exponent_rational(&self) -> Rational {
        match self {
            Quantity::Exact(monzo) => monzo.time_exponent().clone(),
            Quantity::Real(real) => {
                Rational::from_integer(BigInt::from(real.time_exponent.round() as i64))
            }
        }
    }

    pub fn to_real(&self) -> TimeReal {
        match self {
            Quantity::Exact(monzo) => TimeReal::with_time_exponent(
                monzo.value_f64(),
                monzo.time_exponent().to_f64().unwrap_or(0.0),
            ),
            Quantity::Real(real) => *real,
        }
    }

    /// The dimensionless fraction, when the value has one.
    pub fn to_rational(&self) -> Option<Rational> {
        match self {
            Quantity::Exact(monzo) => monzo.to_rational(),
            Quantity::Real(_) => None,
        }
    }

    pub fn value_f64(&self) -> f64 {
        match self {
            Quantity::Exact(monzo) => monzo.value_f64(),
            Quantity::Real(real) => real.value,
        }
    }

    pub fn total_cents(&self) -> f64 {
        match self {
            Quantity::Exact(monzo) => monzo.total_cents(),
            Quantity::Real(real) => real.total_cents(),
        }
    }

    // ===== Multiplicative group =====

    pub fn mul(&self, rhs: &Self) -> Self {
        match (self, rhs) {
            (Quantity::Exact(a), Quantity::Exact(b)) => Quantity::Exact(a.mul(b)),
            _ => Quantity::Real(self.to_real().mul(&rhs.to_real())),
        }
    }

    pub fn div(&self, rhs: &Self) -> Result<Self, MonzoError> {
        match (self, rhs) {
            (Quantity::Exact(a), Quantity::Exact(b)) => Ok(Quantity::Exact(a.try_div(b)?)),
            _ => Ok(Quantity::Real(self.to_real().try_div(&rhs.to_real())?)),
        }
    }

    pub fn neg(&self) -> Self {
        match self {
            Quantity::Exact(monzo) => Quantity::Exact(monzo.neg()),
            Quantity::Real(real) => Quantity::Real(real.neg()),
        }
    }

    pub fn inverse(&self) -> Result<Self, MonzoError> {
        match self {
            Quantity::Exact(monzo) => Ok(Quantity::Exact(monzo.inverse()?)),
            Quantity::Real(real) => Ok(Quantity::Real(real.inverse()?)),
        }
    }

    /// Raise to a rational power, escaping to reals when the residual cannot
    /// be unpacked.
    pub fn pow_rational(&self, exponent: &Rational) -> Result<Self, MonzoError> {
        match self {
            Quantity::Exact(monzo) => match monzo.pow(exponent)? {
                PowOutcome::Exact(result) => Ok(Quantity::Exact(result)),
                PowOutcome::Escapes => {
                    let exponent = exponent.to_f64().unwrap_or(f64::NAN);
                    Ok(Quantity::Real(self.to_real().pow(exponent)?))
                }
            },
            Quantity::Real(real) => {
                let exponent = exponent.to_f64().unwrap_or(f64::NAN);
                Ok(Quantity::Real(real.pow(exponent)?))
            }
        }
    }

    /// Raise to another quantity. Rational exponents use the exact path.
    pub fn pow(&self, exponent: &Self) -> Result<Self, MonzoError> {
        match exponent {
            Quantity::Exact(e) => {
                if let Some(fraction) = e.to_rational() {
                    self.pow_rational(&fraction)
                } else {
                    Ok(Quantity::Real(self.to_real().pow(e.value_f64())?))
                }
            }
            Quantity::Real(real) => Ok(Quantity::Real(self.to_real().pow(real.value)?)),
        }
    }

    // ===== Additive operations (linear domain) =====

    fn require_matching_units(&self, rhs: &Self) -> Result<(), MonzoError> {
        let a = match self {
            Quantity::Exact(monzo) => monzo.time_exponent().to_f64().unwrap_or(0.0),
            Quantity::Real(real) => real.time_exponent,
        };
        let b = match rhs {
            Quantity::Exact(monzo) => monzo.time_exponent().to_f64().unwrap_or(0.0),
            Quantity::Real(real) => real.time_exponent,
        };
        if a != b {
            return Err(MonzoError::UnitMismatch);
        }
        Ok(())
    }

    pub fn add(&self, rhs: &Self) -> Result<Self, MonzoError> {
        self.require_matching_units(rhs)?;
        if let (Quantity::Exact(a), Quantity::Exact(b)) = (self, rhs) {
            if let (Some(x), Some(y)) = (a.to_rational(), b.to_rational()) {
                let sum = TimeMonzo::from_rational(&(x + y))
                    .with_time_exponent(a.time_exponent().clone());
                return Ok(Quantity::Exact(sum));
            }
        }
        let a = self.to_real();
        let b = rhs.to_real();
        Ok(Quantity::Real(TimeReal::with_time_exponent(
            a.value + b.value,
            a.time_exponent,
        )))
    }

    pub fn sub(&self, rhs: &Self) -> Result<Self, MonzoError> {
        self.add(&rhs.neg())
    }

    /// Linear modulo. The ceiling variant maps an exact zero remainder to
    /// the modulus itself.
    pub fn rem(&self, rhs: &Self, ceiling: bool) -> Result<Self, MonzoError> {
        self.require_matching_units(rhs)?;
        if rhs.is_zero() {
            return Err(MonzoError::DivisionByZero);
        }
        if let (Quantity::Exact(a), Quantity::Exact(b)) = (self, rhs) {
            if let (Some(x), Some(y)) = (a.to_rational(), b.to_rational()) {
                let quotient = (&x / &y).floor();
                let mut remainder = &x - &y * quotient;
                if ceiling && remainder.is_zero() {
                    remainder = y;
                }
                let result = TimeMonzo::from_rational(&remainder)
                    .with_time_exponent(a.time_exponent().clone());
                return Ok(Quantity::Exact(result));
            }
        }
        let a = self.to_real();
        let b = rhs.to_real();
        let mut remainder = a.value.rem_euclid(b.value.abs());
        if ceiling && remainder == 0.0 {
            remainder = b.value.abs();
        }
        Ok(Quantity::Real(TimeReal::with_time_exponent(
            remainder,
            a.time_exponent,
        )))
    }

    /// Multiplicative rounding: the nearest integer multiple of `rhs`.
    pub fn round_to(&self, rhs: &Self) -> Result<Self, MonzoError> {
        self.require_matching_units(rhs)?;
        if rhs.is_zero() {
            return Err(MonzoError::DivisionByZero);
        }
        if let (Quantity::Exact(a), Quantity::Exact(b)) = (self, rhs) {
            if let (Some(x), Some(y)) = (a.to_rational(), b.to_rational()) {
                let multiple = (&x / &y).round();
                let result = TimeMonzo::from_rational(&(y * multiple))
                    .with_time_exponent(a.time_exponent().clone());
                return Ok(Quantity::Exact(result));
            }
        }
        let a = self.to_real();
        let b = rhs.to_real();
        Ok(Quantity::Real(TimeReal::with_time_exponent(
            (a.value / b.value).round() * b.value,
            a.time_exponent,
        )))
    }

    /// Geometric reduction into `[1, modulus)` or `(1, modulus]`.
    pub fn reduce(&self, modulus: &Self, ceiling: bool) -> Result<Self, MonzoError> {
        match (self, modulus) {
            (Quantity::Exact(a), Quantity::Exact(b)) => Ok(Quantity::Exact(a.reduce(b, ceiling)?)),
            _ => Ok(Quantity::Real(
                self.to_real().reduce(&modulus.to_real(), ceiling)?,
            )),
        }
    }

    /// The nearest power of `modulus`.
    pub fn pitch_round_to(&self, modulus: &Self) -> Result<Self, MonzoError> {
        match (self, modulus) {
            (Quantity::Exact(a), Quantity::Exact(b)) => Ok(Quantity::Exact(a.pitch_round_to(b)?)),
            _ => Ok(Quantity::Real(
                self.to_real().pitch_round_to(&modulus.to_real())?,
            )),
        }
    }

    /// Reinterpret the octave fraction of `self` against another equave.
    pub fn project(&self, equave: &Self) -> Result<Self, MonzoError> {
        if let (Quantity::Exact(a), Quantity::Exact(b)) = (self, equave) {
            if let Some(exact) = a.project(b)? {
                return Ok(Quantity::Exact(exact));
            }
        }
        if self.is_zero() || self.is_negative() {
            return Err(MonzoError::LogOfZero);
        }
        let octaves = self.to_real().value.log2();
        Ok(Quantity::Real(equave.to_real().pow(octaves)?))
    }

    /// Harmonic sum `1/(1/a + 1/b)`; the harmonic difference negates `rhs`.
    pub fn lens_add(&self, rhs: &Self) -> Result<Self, MonzoError> {
        self.require_matching_units(rhs)?;
        if self.is_zero() || rhs.is_zero() {
            return Ok(self.clone().zeroed());
        }
        let denominator = self.inverse()?.add(&rhs.inverse()?)?;
        denominator.inverse()
    }

    pub fn lens_sub(&self, rhs: &Self) -> Result<Self, MonzoError> {
        self.lens_add(&rhs.neg())
    }

    fn zeroed(self) -> Self {
        match self {
            Quantity::Exact(monzo) => {
                let t = monzo.time_exponent().clone();
                Quantity::Exact(TimeMonzo::zero().with_time_exponent(t))
            }
            Quantity::Real(real) => {
                Quantity::Real(TimeReal::with_time_exponent(0.0, real.time_exponent))
            }
        }
    }

    /// Inner product over prime exponents; requires exact operands.
    pub fn dot(&self, rhs: &Self) -> Result<Rational, MonzoError> {
        match (self, rhs) {
            (Quantity::Exact(a), Quantity::Exact(b)) => a.dot(b),
            _ => Err(MonzoError::UnfactorableResidual),
        }
    }

    /// Exact logarithm: the rational q with `self == base^q`, or the real
    /// ratio of logarithms when no such q exists.
    pub fn log_divide(&self, base: &Self) -> Result<Self, MonzoError> {
        if self.is_zero() || base.is_zero() || base.is_unity() {
            return Err(MonzoError::LogOfZero);
        }
        if let (Quantity::Exact(a), Quantity::Exact(b)) = (self, base) {
            if let Some(q) = exact_log(a, b) {
                return Ok(Quantity::Exact(TimeMonzo::from_rational(&q)));
            }
        }
        let numerator = self.to_real().value.abs().log2();
        let denominator = base.to_real().value.abs().log2();
        if denominator == 0.0 {
            return Err(MonzoError::LogOfZero);
        }
        Ok(Quantity::Real(TimeReal::new(numerator / denominator)))
    }

    // ===== Comparisons =====

    pub fn strict_eq(&self, rhs: &Self) -> bool {
        match (self, rhs) {
            (Quantity::Exact(a), Quantity::Exact(b)) => a.strict_eq(b),
            (Quantity::Real(a), Quantity::Real(b)) => a == b,
            _ => false,
        }
    }

    /// Numeric equality across forms.
    pub fn weak_eq(&self, rhs: &Self) -> bool {
        match (self, rhs) {
            (Quantity::Exact(a), Quantity::Exact(b)) => {
                a.time_exponent() == b.time_exponent() && a.value_cmp(b) == Ordering::Equal
            }
            _ => {
                let a = self.to_real();
                let b = rhs.to_real();
                a.time_exponent == b.time_exponent && a.value == b.value
            }
        }
    }

    pub fn value_cmp(&self, rhs: &Self) -> Ordering {
        match (self, rhs) {
            (Quantity::Exact(a), Quantity::Exact(b)) => {
                if a.is_negative() != b.is_negative() {
                    return if a.is_negative() {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    };
                }
                let magnitude = a.value_cmp(b);
                if a.is_negative() {
                    magnitude.reverse()
                } else {
                    magnitude
                }
            }
            _ => self.to_real().value_cmp(&rhs.to_real()),
        }
    }
}

/// Find the rational q with `value == base^q` by exponent proportionality.
fn exact_log(value: &TimeMonzo, base: &TimeMonzo) -> Option<Rational> {
    if !value.residual().is_one() || !base.residual().is_one() {
        return None;
    }
    if !value.time_exponent().is_zero() || !base.time_exponent().is_zero() {
        return None;
    }
    let len = value.component_count().max(base.component_count());
    let mut ratio: Option<Rational> = None;
    for i in 0..len {
        let v = value.exponent(i);
        let b = base.exponent(i);
        match (v.is_zero(), b.is_zero()) {
            (true, true) => continue,
            (false, true) | (true, false) => return None,
            (false, false) => {
                let q = v / b;
                match &ratio {
                    Some(existing) if *existing != q => return None,
                    Some(_) => {}
                    None => ratio = Some(q),
                }
            }
        }
    }
    ratio
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational;

    #[test]
    fn linear_addition_is_exact_for_fractions() {
        let a = Quantity::from_fraction(3, 2);
        let b = Quantity::from_fraction(1, 2);
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.to_rational(), Some(rational(2, 1)));
        assert!(!sum.is_real());
    }

    #[test]
    fn addition_of_roots_escapes_to_real() {
        let sqrt2 = Quantity::from_int(2).pow_rational(&rational(1, 2)).unwrap();
        let sum = sqrt2.add(&Quantity::from_int(1)).unwrap();
        assert!(sum.is_real());
        assert!((sum.value_f64() - (1.0 + 2f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn mixed_units_refuse_addition() {
        let hz = Quantity::Exact(TimeMonzo::hertz());
        let one = Quantity::unity();
        assert_eq!(hz.add(&one).unwrap_err(), MonzoError::UnitMismatch);
    }

    #[test]
    fn exact_logarithms() {
        let eight = Quantity::from_int(8);
        let two = Quantity::from_int(2);
        let log = eight.log_divide(&two).unwrap();
        assert_eq!(log.to_rational(), Some(rational(3, 1)));

        let fifth = Quantity::from_fraction(3, 2);
        let squared = fifth.pow_rational(&rational(2, 1)).unwrap();
        assert_eq!(
            squared.log_divide(&fifth).unwrap().to_rational(),
            Some(rational(2, 1))
        );
    }

    #[test]
    fn ceiling_modulo_maps_zero_to_modulus() {
        let six = Quantity::from_int(6);
        let three = Quantity::from_int(3);
        assert_eq!(
            six.rem(&three, true).unwrap().to_rational(),
            Some(rational(3, 1))
        );
        assert_eq!(
            six.rem(&three, false).unwrap().to_rational(),
            Some(rational(0, 1))
        );
    }

    #[test]
    fn lens_addition() {
        let a = Quantity::from_int(2);
        let b = Quantity::from_int(2);
        assert_eq!(
            a.lens_add(&b).unwrap().to_rational(),
            Some(rational(1, 1))
        );
    }
}
