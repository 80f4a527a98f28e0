//! Double-precision fallback for values that leave the rational world

use std::cmp::Ordering;

use crate::error::MonzoError;

/// A real-valued quantity: a linear magnitude and a time exponent, both
/// doubles. Everything irrational ends up here (pi, logarithms of arbitrary
/// reals, roots of unfactorable residuals).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeReal {
    pub time_exponent: f64,
    pub value: f64,
}

impl TimeReal {
    pub fn new(value: f64) -> Self {
        Self {
            time_exponent: 0.0,
            value,
        }
    }

    pub fn with_time_exponent(value: f64, time_exponent: f64) -> Self {
        Self {
            time_exponent,
            value,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    pub fn is_negative(&self) -> bool {
        self.value < 0.0
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        Self {
            time_exponent: self.time_exponent + rhs.time_exponent,
            value: self.value * rhs.value,
        }
    }

    pub fn try_div(&self, rhs: &Self) -> Result<Self, MonzoError> {
        if rhs.value == 0.0 {
            return Err(MonzoError::DivisionByZero);
        }
        Ok(Self {
            time_exponent: self.time_exponent - rhs.time_exponent,
            value: self.value / rhs.value,
        })
    }

    pub fn neg(&self) -> Self {
        Self {
            time_exponent: self.time_exponent,
            value: -self.value,
        }
    }

    pub fn inverse(&self) -> Result<Self, MonzoError> {
        if self.value == 0.0 {
            return Err(MonzoError::DivisionByZero);
        }
        Ok(Self {
            time_exponent: -self.time_exponent,
            value: self.value.recip(),
        })
    }

    pub fn pow(&self, exponent: f64) -> Result<Self, MonzoError> {
        if self.value < 0.0 && exponent.fract() != 0.0 {
            return Err(MonzoError::NegativeRoot);
        }
        if self.value == 0.0 && exponent < 0.0 {
            return Err(MonzoError::DivisionByZero);
        }
        Ok(Self {
            time_exponent: self.time_exponent * exponent,
            value: self.value.powf(exponent),
        })
    }

    pub fn reduce(&self, modulus: &Self, ceiling: bool) -> Result<Self, MonzoError> {
        let modulus_log = modulus.value.abs().log2();
        if !modulus_log.is_finite() || modulus_log == 0.0 {
            return Err(MonzoError::UnisonModulo);
        }
        if self.value == 0.0 {
            return Ok(*self);
        }
        let size = self.value.abs().log2();
        let mut steps = (size / modulus_log).floor();
        if ceiling && size - steps * modulus_log == 0.0 {
            steps -= 1.0;
        }
        Ok(Self {
            time_exponent: self.time_exponent,
            value: self.value / modulus.value.abs().powf(steps),
        })
    }

    pub fn pitch_round_to(&self, modulus: &Self) -> Result<Self, MonzoError> {
        let modulus_log = modulus.value.abs().log2();
        if !modulus_log.is_finite() || modulus_log == 0.0 {
            return Err(MonzoError::UnisonModulo);
        }
        if self.value == 0.0 {
            return Err(MonzoError::LogOfZero);
        }
        let steps = (self.value.abs().log2() / modulus_log).round();
        Ok(Self {
            time_exponent: self.time_exponent,
            value: modulus.value.abs().powf(steps),
        })
    }

    pub fn value_cmp(&self, rhs: &Self) -> Ordering {
        self.value.partial_cmp(&rhs.value).unwrap_or(Ordering::Equal)
    }

    /// Size in cents, ignoring the time exponent.
    pub fn total_cents(&self) -> f64 {
        1200.0 * self.value.abs().log2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_octave_reduction() {
        let value = TimeReal::new(5.0);
        let octave = TimeReal::new(2.0);
        let reduced = value.reduce(&octave, false).unwrap();
        assert!((reduced.value - 1.25).abs() < 1e-12);
    }

    #[test]
    fn real_power_guards() {
        assert!(TimeReal::new(-2.0).pow(0.5).is_err());
        let cube = TimeReal::new(2.0).pow(3.0).unwrap();
        assert!((cube.value - 8.0).abs() < 1e-12);
    }
}
