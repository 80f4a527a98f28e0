//! The timed monzo: exact prime-count vectors with a rational time exponent

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::MonzoError;
use crate::primes::{factorize, nth_prime, DEFAULT_COMPONENTS};
use crate::{rational_pow, Rational};

/// Outcome of raising a monzo to a rational power.
#[derive(Debug, Clone)]
pub enum PowOutcome {
    Exact(TimeMonzo),
    /// The residual cannot be unpacked; the caller must fall back to reals.
    Escapes,
}

/// Exact representation of a pitch quantity.
///
/// The triple is `(t, e[], r)`: a rational time exponent (0 dimensionless,
/// -1 hertz, 1 seconds), rational exponents over the primes 2, 3, 5, … and a
/// rational residual. The residual is kept coprime to every prime below the
/// factor limit and carries the sign of the whole value; zero is encoded as
/// a zero residual.
#[derive(Clone, Debug)]
pub struct TimeMonzo {
    time_exponent: Rational,
    primes: Vec<Rational>,
    residual: Rational,
}

impl TimeMonzo {
    pub fn from_parts(
        time_exponent: Rational,
        primes: Vec<Rational>,
        residual: Rational,
    ) -> Self {
        let mut monzo = Self {
            time_exponent,
            primes,
            residual,
        };
        monzo.normalize();
        monzo
    }

    /// 1/1.
    pub fn unity() -> Self {
        Self {
            time_exponent: Rational::zero(),
            primes: Vec::new(),
            residual: Rational::one(),
        }
    }

    /// The zero quantity (absorbing under multiplication).
    pub fn zero() -> Self {
        Self {
            time_exponent: Rational::zero(),
            primes: Vec::new(),
            residual: Rational::zero(),
        }
    }

    /// 1 Hz: unity magnitude with time exponent -1.
    pub fn hertz() -> Self {
        Self {
            time_exponent: -Rational::one(),
            primes: Vec::new(),
            residual: Rational::one(),
        }
    }

    /// 1 s: unity magnitude with time exponent 1.
    pub fn second() -> Self {
        Self {
            time_exponent: Rational::one(),
            primes: Vec::new(),
            residual: Rational::one(),
        }
    }

    /// The `index`th prime as a monzo.
    pub fn prime(index: usize) -> Self {
        let mut primes = vec![Rational::zero(); index + 1];
        primes[index] = Rational::one();
        Self {
            time_exponent: Rational::zero(),
            primes,
            residual: Rational::one(),
        }
    }

    /// A single prime raised to a rational exponent.
    pub fn prime_power(index: usize, exponent: Rational) -> Self {
        let mut primes = vec![Rational::zero(); index + 1];
        primes[index] = exponent;
        Self {
            time_exponent: Rational::zero(),
            primes,
            residual: Rational::one(),
        }
    }

    pub fn from_bigint(value: BigInt) -> Self {
        Self::from_rational(&Rational::from_integer(value))
    }

    pub fn from_int(value: i64) -> Self {
        Self::from_bigint(BigInt::from(value))
    }

    pub fn from_fraction(numerator: i64, denominator: i64) -> Self {
        Self::from_rational(&Rational::new(
            BigInt::from(numerator),
            BigInt::from(denominator),
        ))
    }

    /// Unpack a fraction into prime components.
    pub fn from_rational(value: &Rational) -> Self {
        if value.is_zero() {
            return Self::zero();
        }
        let mut primes = vec![Rational::zero(); DEFAULT_COMPONENTS];
        let (numer_factors, numer_cofactor) = factorize(value.numer());
        let (denom_factors, denom_cofactor) = factorize(value.denom());
        for (index, exponent) in numer_factors {
            if index >= primes.len() {
                primes.resize(index + 1, Rational::zero());
            }
            primes[index] += Rational::from_integer(BigInt::from(exponent));
        }
        for (index, exponent) in denom_factors {
            if index >= primes.len() {
                primes.resize(index + 1, Rational::zero());
            }
            primes[index] -= Rational::from_integer(BigInt::from(exponent));
        }
        let sign = if value.is_negative() {
            -Rational::one()
        } else {
            Rational::one()
        };
        let residual = sign * Rational::new(numer_cofactor, denom_cofactor);
        let mut monzo = Self {
            time_exponent: Rational::zero(),
            primes,
            residual,
        };
        monzo.trim();
        monzo
    }

    fn trim(&mut self) {
        while matches!(self.primes.last(), Some(e) if e.is_zero()) {
            self.primes.pop();
        }
    }

    /// Restore the canonical form: factor the residual into components and
    /// drop trailing zero exponents. Zero clears the component vector.
    fn normalize(&mut self) {
        if self.residual.is_zero() {
            self.primes.clear();
            return;
        }
        let (numer_factors, numer_cofactor) = factorize(self.residual.numer());
        let (denom_factors, denom_cofactor) = factorize(self.residual.denom());
        for (index, exponent) in numer_factors {
            if index >= self.primes.len() {
                self.primes.resize(index + 1, Rational::zero());
            }
            self.primes[index] += Rational::from_integer(BigInt::from(exponent));
        }
        for (index, exponent) in denom_factors {
            if index >= self.primes.len() {
                self.primes.resize(index + 1, Rational::zero());
            }
            self.primes[index] -= Rational::from_integer(BigInt::from(exponent));
        }
        let sign = if self.residual.is_negative() {
            -Rational::one()
        } else {
            Rational::one()
        };
        self.residual = sign * Rational::new(numer_cofactor, denom_cofactor);
        self.trim();
    }

    // ===== Accessors =====

    pub fn time_exponent(&self) -> &Rational {
        &self.time_exponent
    }

    pub fn with_time_exponent(mut self, time_exponent: Rational) -> Self {
        self.time_exponent = time_exponent;
        self
    }

    /// Exponent of the `index`th prime; beyond the stored components the
    /// vector extends with zeros.
    pub fn exponent(&self, index: usize) -> Rational {
        self.primes.get(index).cloned().unwrap_or_else(Rational::zero)
    }

    pub fn exponents(&self) -> &[Rational] {
        &self.primes
    }

    pub fn residual(&self) -> &Rational {
        &self.residual
    }

    pub fn component_count(&self) -> usize {
        self.primes.len()
    }

    pub fn is_zero(&self) -> bool {
        self.residual.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.residual.is_negative()
    }

    pub fn is_unity(&self) -> bool {
        self.residual.is_one() && self.primes.iter().all(|e| e.is_zero())
    }

    /// Relative quantities have a zero time exponent.
    pub fn is_relative(&self) -> bool {
        self.time_exponent.is_zero()
    }

    /// True when every exponent is an integer.
    pub fn is_integral_monzo(&self) -> bool {
        self.primes.iter().all(|e| e.is_integer())
    }

    // ===== Algebra =====

    pub fn mul(&self, rhs: &Self) -> Self {
        if self.is_zero() || rhs.is_zero() {
            let mut zero = Self::zero();
            zero.time_exponent = &self.time_exponent + &rhs.time_exponent;
            return zero;
        }
        let len = self.primes.len().max(rhs.primes.len());
        let mut primes = Vec::with_capacity(len);
        for i in 0..len {
            primes.push(self.exponent(i) + rhs.exponent(i));
        }
        let mut result = Self {
            time_exponent: &self.time_exponent + &rhs.time_exponent,
            primes,
            residual: &self.residual * &rhs.residual,
        };
        result.trim();
        result
    }

    pub fn try_div(&self, rhs: &Self) -> Result<Self, MonzoError> {
        if rhs.is_zero() {
            return Err(MonzoError::DivisionByZero);
        }
        if self.is_zero() {
            let mut zero = Self::zero();
            zero.time_exponent = &self.time_exponent - &rhs.time_exponent;
            return Ok(zero);
        }
        let len = self.primes.len().max(rhs.primes.len());
        let mut primes = Vec::with_capacity(len);
        for i in 0..len {
            primes.push(self.exponent(i) - rhs.exponent(i));
        }
        let mut result = Self {
            time_exponent: &self.time_exponent - &rhs.time_exponent,
            primes,
            residual: &self.residual / &rhs.residual,
        };
        result.normalize();
        Ok(result)
    }

    pub fn neg(&self) -> Self {
        Self {
            time_exponent: self.time_exponent.clone(),
            primes: self.primes.clone(),
            residual: -self.residual.clone(),
        }
    }

    pub fn inverse(&self) -> Result<Self, MonzoError> {
        if self.is_zero() {
            return Err(MonzoError::DivisionByZero);
        }
        Ok(Self {
            time_exponent: -self.time_exponent.clone(),
            primes: self.primes.iter().map(|e| -e.clone()).collect(),
            residual: self.residual.clone().recip(),
        })
    }

    /// Raise to a rational power. Integer exponents are always exact;
    /// fractional exponents are exact unless the residual holds primes past
    /// the factor limit, in which case the result escapes to the real form.
    pub fn pow(&self, exponent: &Rational) -> Result<PowOutcome, MonzoError> {
        if self.is_zero() {
            return if exponent.is_negative() {
                Err(MonzoError::DivisionByZero)
            } else if exponent.is_zero() {
                Ok(PowOutcome::Exact(Self::unity()))
            } else {
                Ok(PowOutcome::Exact(Self::zero()))
            };
        }
        if exponent.is_integer() {
            let residual = rational_pow(&self.residual, exponent.numer())
                .ok_or(MonzoError::DivisionByZero)?;
            let mut result = Self {
                time_exponent: &self.time_exponent * exponent,
                primes: self.primes.iter().map(|e| e * exponent).collect(),
                residual,
            };
            result.trim();
            return Ok(PowOutcome::Exact(result));
        }
        if self.residual.is_negative() {
            return Err(MonzoError::NegativeRoot);
        }
        if !self.residual.is_one() {
            // Normalization already unpacked everything below the limit.
            return Ok(PowOutcome::Escapes);
        }
        let mut result = Self {
            time_exponent: &self.time_exponent * exponent,
            primes: self.primes.iter().map(|e| e * exponent).collect(),
            residual: Rational::one(),
        };
        result.trim();
        Ok(PowOutcome::Exact(result))
    }

    /// Geometric reduction: `self * modulus^k` with integer k landing in
    /// `[1, modulus)`, or `(1, modulus]` for the ceiling variant.
    pub fn reduce(&self, modulus: &Self, ceiling: bool) -> Result<Self, MonzoError> {
        let modulus_log = modulus.log2_magnitude();
        if !modulus_log.is_finite() || modulus_log == 0.0 {
            return Err(MonzoError::UnisonModulo);
        }
        if self.is_zero() {
            return Ok(self.clone());
        }
        if modulus_log < 0.0 {
            // Sub-unity moduli span the same lattice as their inverses.
            return self.reduce(&modulus.inverse()?, ceiling);
        }
        let unity = Self::unity();
        let k = (self.log2_magnitude() / modulus_log).floor();
        let mut candidate = if k == 0.0 {
            self.clone()
        } else {
            let shift = Rational::from_integer(BigInt::from(k as i64));
            match modulus.pow(&shift)? {
                PowOutcome::Exact(power) => self.try_div(&power)?,
                PowOutcome::Escapes => unreachable!("integer powers are exact"),
            }
        };
        if ceiling {
            while candidate.value_cmp(modulus) == Ordering::Greater {
                candidate = candidate.try_div(modulus)?;
            }
            while candidate.value_cmp(&unity) != Ordering::Greater {
                candidate = candidate.mul(modulus);
            }
        } else {
            while candidate.value_cmp(modulus) != Ordering::Less {
                candidate = candidate.try_div(modulus)?;
            }
            while candidate.value_cmp(&unity) == Ordering::Less {
                candidate = candidate.mul(modulus);
            }
        }
        Ok(candidate)
    }

    /// Logarithmic rounding: the nearest `modulus^k`.
    pub fn pitch_round_to(&self, modulus: &Self) -> Result<Self, MonzoError> {
        let modulus_log = modulus.log2_magnitude();
        if !modulus_log.is_finite() || modulus_log == 0.0 {
            return Err(MonzoError::UnisonModulo);
        }
        if self.is_zero() {
            return Err(MonzoError::LogOfZero);
        }
        let k = (self.log2_magnitude() / modulus_log).round() as i64;
        let shift = Rational::from_integer(BigInt::from(k));
        match modulus.pow(&shift)? {
            PowOutcome::Exact(power) => Ok(power),
            PowOutcome::Escapes => unreachable!("integer powers are exact"),
        }
    }

    /// Reinterpret a power of two as the same fraction of another equave.
    /// `None` when the value is not a pure power of two.
    pub fn project(&self, equave: &Self) -> Result<Option<Self>, MonzoError> {
        if self.is_zero() || self.is_negative() || !self.residual.is_one() {
            return Ok(None);
        }
        for (i, e) in self.primes.iter().enumerate() {
            if i > 0 && !e.is_zero() {
                return Ok(None);
            }
        }
        let octaves = self.exponent(0);
        match equave.pow(&octaves)? {
            PowOutcome::Exact(result) => Ok(Some(result)),
            PowOutcome::Escapes => Ok(None),
        }
    }

    /// Inner product over the prime exponents. The residual contributes only
    /// when both residuals are trivial; anything else is unfactorable.
    pub fn dot(&self, rhs: &Self) -> Result<Rational, MonzoError> {
        let self_loose = !self.residual.abs().is_one();
        let rhs_loose = !rhs.residual.abs().is_one();
        if self_loose && rhs_loose {
            return Err(MonzoError::UnfactorableResidual);
        }
        let len = self.primes.len().min(rhs.primes.len());
        let mut total = Rational::zero();
        for i in 0..len {
            total += &self.primes[i] * &rhs.primes[i];
        }
        Ok(total)
    }

    // ===== Comparisons and conversions =====

    pub fn strict_eq(&self, rhs: &Self) -> bool {
        if self.time_exponent != rhs.time_exponent || self.residual != rhs.residual {
            return false;
        }
        let len = self.primes.len().max(rhs.primes.len());
        (0..len).all(|i| self.exponent(i) == rhs.exponent(i))
    }

    /// Compare magnitudes. Close calls are settled exactly when possible.
    pub fn value_cmp(&self, rhs: &Self) -> Ordering {
        if self.is_zero() || rhs.is_zero() {
            return self
                .value_f64()
                .partial_cmp(&rhs.value_f64())
                .unwrap_or(Ordering::Equal);
        }
        let diff = self.log2_magnitude() - rhs.log2_magnitude();
        if diff.abs() > 1e-9 {
            return if diff > 0.0 {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        if let (Some(a), Some(b)) = (self.to_rational(), rhs.to_rational()) {
            return a.cmp(&b);
        }
        if let Ok(quotient) = self.try_div(rhs) {
            if quotient.is_unity() {
                return Ordering::Equal;
            }
        }
        if diff > 0.0 {
            Ordering::Greater
        } else if diff < 0.0 {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }

    /// Recover the fraction when every exponent is an integer.
    pub fn to_rational(&self) -> Option<Rational> {
        if self.is_zero() {
            return Some(Rational::zero());
        }
        let mut result = self.residual.clone();
        for (i, e) in self.primes.iter().enumerate() {
            if e.is_zero() {
                continue;
            }
            if !e.is_integer() {
                return None;
            }
            let base = Rational::from_integer(BigInt::from(nth_prime(i)));
            result *= rational_pow(&base, e.numer())?;
        }
        Some(result)
    }

    /// Recover the integer when the value is a whole number.
    pub fn to_integer(&self) -> Option<BigInt> {
        let fraction = self.to_rational()?;
        fraction.is_integer().then(|| fraction.to_integer())
    }

    /// Express the value as `radicand^(1/degree)` with the smallest integral
    /// degree. Fractional time exponents have no radical form.
    pub fn radical_parts(&self) -> Option<(Rational, u64)> {
        if !self.time_exponent.is_integer() {
            return None;
        }
        let mut degree = BigInt::one();
        for e in &self.primes {
            degree = degree.lcm(e.denom());
        }
        let degree = degree.to_u64()?;
        let exponent = Rational::from_integer(BigInt::from(degree));
        let radicand = match self.clone().with_time_exponent(Rational::zero()).pow(&exponent) {
            Ok(PowOutcome::Exact(monzo)) => monzo.to_rational()?,
            _ => return None,
        };
        Some((radicand, degree))
    }

    /// Base-2 logarithm of the magnitude, ignoring the time exponent.
    pub fn log2_magnitude(&self) -> f64 {
        if self.is_zero() {
            return f64::NEG_INFINITY;
        }
        let mut total = crate::rational_log2(&self.residual.abs());
        for (i, e) in self.primes.iter().enumerate() {
            if !e.is_zero() {
                total += e.to_f64().unwrap_or(0.0) * (nth_prime(i) as f64).log2();
            }
        }
        total
    }

    /// Size in cents (1200 per octave), ignoring the time exponent.
    pub fn total_cents(&self) -> f64 {
        1200.0 * self.log2_magnitude()
    }

    /// Magnitude as a double, with sign.
    pub fn value_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let magnitude = self.log2_magnitude().exp2();
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// The cents value as an exact fraction when the value is
    /// `2^(k/1200)`-shaped: a pure power of two with no residual.
    pub fn cents_fraction(&self) -> Option<Rational> {
        if self.is_zero() || self.is_negative() || !self.residual.is_one() {
            return None;
        }
        for (i, e) in self.primes.iter().enumerate() {
            if i > 0 && !e.is_zero() {
                return None;
            }
        }
        Some(self.exponent(0) * Rational::from_integer(BigInt::from(1200)))
    }
}

impl PartialEq for TimeMonzo {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational;

    #[test]
    fn fraction_round_trip() {
        let syntonic = TimeMonzo::from_fraction(81, 80);
        assert_eq!(syntonic.exponent(0), rational(-4, 1));
        assert_eq!(syntonic.exponent(1), rational(4, 1));
        assert_eq!(syntonic.exponent(2), rational(-1, 1));
        assert_eq!(syntonic.to_rational(), Some(rational(81, 80)));
    }

    #[test]
    fn residual_keeps_large_primes() {
        let wild = TimeMonzo::from_int(7927);
        assert_eq!(wild.residual(), &rational(7927, 1));
        assert!(wild.exponents().iter().all(|e| e.is_zero()));
    }

    #[test]
    fn multiplication_cancels() {
        let a = TimeMonzo::from_fraction(8, 7);
        let b = TimeMonzo::from_fraction(7, 6);
        let product = a.mul(&b);
        assert_eq!(product.to_rational(), Some(rational(4, 3)));
    }

    #[test]
    fn fractional_powers_stay_exact() {
        let two = TimeMonzo::from_int(2);
        let half_octave = match two.pow(&rational(1, 2)).unwrap() {
            PowOutcome::Exact(monzo) => monzo,
            PowOutcome::Escapes => panic!("2^1/2 is exact in monzo form"),
        };
        assert_eq!(half_octave.exponent(0), rational(1, 2));
        assert_eq!(half_octave.to_rational(), None);
        assert_eq!(half_octave.radical_parts(), Some((rational(2, 1), 2)));
    }

    #[test]
    fn unfactorable_residual_escapes_from_roots() {
        let wild = TimeMonzo::from_int(7927);
        assert!(matches!(
            wild.pow(&rational(1, 2)).unwrap(),
            PowOutcome::Escapes
        ));
    }

    #[test]
    fn negative_root_is_an_error() {
        let negative = TimeMonzo::from_int(-4);
        assert_eq!(
            negative.pow(&rational(1, 2)).unwrap_err(),
            MonzoError::NegativeRoot
        );
    }

    #[test]
    fn octave_reduction() {
        let two = TimeMonzo::from_int(2);
        let excessive = TimeMonzo::from_fraction(9, 2);
        let reduced = excessive.reduce(&two, false).unwrap();
        assert_eq!(reduced.to_rational(), Some(rational(9, 8)));

        let unity = TimeMonzo::unity();
        assert_eq!(
            unity.reduce(&two, true).unwrap().to_rational(),
            Some(rational(2, 1))
        );
        assert_eq!(
            unity.reduce(&two, false).unwrap().to_rational(),
            Some(rational(1, 1))
        );
    }

    #[test]
    fn dot_product_over_exponents() {
        let val_like = TimeMonzo::from_parts(
            Rational::zero(),
            vec![rational(12, 1), rational(19, 1), rational(28, 1)],
            Rational::one(),
        );
        let fifth = TimeMonzo::from_fraction(3, 2);
        assert_eq!(val_like.dot(&fifth).unwrap(), rational(7, 1));
    }

    #[test]
    fn strict_equality_ignores_trailing_zeros() {
        let a = TimeMonzo::from_parts(
            Rational::zero(),
            vec![rational(1, 1), Rational::zero()],
            Rational::one(),
        );
        let b = TimeMonzo::from_int(2);
        assert!(a.strict_eq(&b));
    }
}
