//! Pythagorean interval arithmetic
//!
//! FJS notation is built on a backbone of intervals spelled from qualities
//! and degrees. Each of these is a monzo over 2 and 3, with half-integer
//! exponents for the neutral qualities.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use thiserror::Error;

use crate::monzo::TimeMonzo;
use crate::{rational, Rational};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PythError {
    #[error("degree {0} does not take the perfect quality")]
    NotPerfect(u32),

    #[error("degree {0} does not take major, minor or neutral qualities")]
    NotImperfect(u32),

    #[error("interval degrees start at 1")]
    ZeroDegree,
}

/// Quality of a Pythagorean interval. Multiplicities allow `dd3`, `AA4` etc.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quality {
    Diminished(u32),
    Minor,
    Neutral,
    Perfect,
    Major,
    Augmented(u32),
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Diminished(count) => {
                for _ in 0..*count {
                    write!(f, "d")?;
                }
                Ok(())
            }
            Quality::Minor => write!(f, "m"),
            Quality::Neutral => write!(f, "n"),
            Quality::Perfect => write!(f, "P"),
            Quality::Major => write!(f, "M"),
            // Lowercase to keep A-G free for nominals.
            Quality::Augmented(count) => {
                for _ in 0..*count {
                    write!(f, "a")?;
                }
                Ok(())
            }
        }
    }
}

/// A quality/degree pair such as `M3` or `dd7`. Degrees are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pythagorean {
    pub quality: Quality,
    pub degree: u32,
}

impl fmt::Display for Pythagorean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.quality, self.degree)
    }
}

/// Base vectors (exponents of 2 and 3) for the perfect/major spelling of
/// each step class.
const BASE_VECTORS: [(i64, i64); 7] = [
    (0, 0),   // P1
    (-3, 2),  // M2
    (-6, 4),  // M3
    (2, -1),  // P4
    (-1, 1),  // P5
    (-4, 3),  // M6
    (-7, 5),  // M7
];

/// Fifths spanned by the perfect/major spelling of each step class.
const BASE_FIFTHS: [i64; 7] = [0, 2, 4, -1, 1, 3, 5];

fn is_perfect_class(step: usize) -> bool {
    matches!(step, 0 | 3 | 4)
}

/// The apotome 2187/2048 as exponents of 2 and 3.
const APOTOME: (i64, i64) = (-11, 7);

impl Pythagorean {
    pub fn new(quality: Quality, degree: u32) -> Self {
        Self { quality, degree }
    }

    /// Offset from the perfect/major base in apotomes.
    fn apotome_offset(&self, perfect_class: bool) -> Result<Rational, PythError> {
        match (self.quality, perfect_class) {
            (Quality::Perfect, true) => Ok(Rational::zero()),
            (Quality::Perfect, false) => Err(PythError::NotPerfect(self.degree)),
            (Quality::Major, false) => Ok(Rational::zero()),
            (Quality::Minor, false) => Ok(rational(-1, 1)),
            (Quality::Neutral, false) => Ok(rational(-1, 2)),
            (Quality::Major | Quality::Minor | Quality::Neutral, true) => {
                Err(PythError::NotImperfect(self.degree))
            }
            (Quality::Augmented(count), _) => Ok(rational(count as i64, 1)),
            (Quality::Diminished(count), true) => Ok(rational(-(count as i64), 1)),
            (Quality::Diminished(count), false) => Ok(rational(-(count as i64) - 1, 1)),
        }
    }

    /// The interval as a monzo over 2 and 3.
    pub fn monzo(&self) -> Result<TimeMonzo, PythError> {
        if self.degree == 0 {
            return Err(PythError::ZeroDegree);
        }
        let step = ((self.degree - 1) % 7) as usize;
        let octaves = ((self.degree - 1) / 7) as i64;
        let offset = self.apotome_offset(is_perfect_class(step))?;
        let (base_two, base_three) = BASE_VECTORS[step];
        let two = Rational::from_integer(BigInt::from(base_two + octaves))
            + &offset * Rational::from_integer(BigInt::from(APOTOME.0));
        let three = Rational::from_integer(BigInt::from(base_three))
            + &offset * Rational::from_integer(BigInt::from(APOTOME.1));
        Ok(TimeMonzo::from_parts(
            Rational::zero(),
            vec![two, three],
            Rational::one(),
        ))
    }
}

/// Recover a quality/degree spelling from a 2.3-monzo. `None` when the monzo
/// strays outside the primes 2 and 3, descends below the unison, or needs
/// qualities this notation cannot spell.
pub fn monzo_to_pythagorean(monzo: &TimeMonzo) -> Option<Pythagorean> {
    if !monzo.residual().is_one() || !monzo.time_exponent().is_zero() {
        return None;
    }
    for i in 2..monzo.component_count() {
        if !monzo.exponent(i).is_zero() {
            return None;
        }
    }
    let two = monzo.exponent(0);
    let three = monzo.exponent(1);

    // 4 fifths advance one step class; works for half-integer fifths too.
    let quadrupled = &three * rational(4, 1);
    if !quadrupled.is_integer() {
        return None;
    }
    let quadrupled = i64::try_from(quadrupled.to_integer()).ok()?;
    let step = (quadrupled.rem_euclid(7)) as usize;

    let base_fifths = Rational::from_integer(BigInt::from(BASE_FIFTHS[step]));
    let offset = (&three - &base_fifths) / rational(7, 1);

    let perfect_class = is_perfect_class(step);
    let quality = if offset.is_zero() {
        if perfect_class {
            Quality::Perfect
        } else {
            Quality::Major
        }
    } else if offset == rational(-1, 2) && !perfect_class {
        Quality::Neutral
    } else if offset.is_integer() {
        let count = offset.to_integer();
        if count.is_positive() {
            Quality::Augmented(u32::try_from(count).ok()?)
        } else if !perfect_class && count == BigInt::from(-1) {
            Quality::Minor
        } else {
            let magnitude = if perfect_class {
                -count
            } else {
                -count - BigInt::from(1)
            };
            Quality::Diminished(u32::try_from(magnitude).ok()?)
        }
    } else {
        return None;
    };

    // Count octaves above the base spelling of this step class.
    let (base_two, _) = BASE_VECTORS[step];
    let expected_two = Rational::from_integer(BigInt::from(base_two))
        + &offset * Rational::from_integer(BigInt::from(APOTOME.0));
    let octaves = &two - &expected_two;
    if !octaves.is_integer() || octaves.is_negative() {
        return None;
    }
    let octaves = u32::try_from(octaves.to_integer()).ok()?;
    Some(Pythagorean::new(quality, step as u32 + 1 + 7 * octaves))
}

/// Nominal letters and their spelling relative to C.
pub const NOMINALS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

/// An absolute pitch: nominal, accidental shift in apotomes, octave number.
#[derive(Clone, Debug, PartialEq)]
pub struct AbsolutePitch {
    pub nominal: char,
    pub sharps: Rational,
    pub octave: i32,
}

impl AbsolutePitch {
    /// Position relative to C4 as a monzo over 2 and 3.
    pub fn monzo(&self) -> Result<TimeMonzo, PythError> {
        let degree = NOMINALS
            .iter()
            .position(|&n| n == self.nominal)
            .ok_or(PythError::ZeroDegree)? as u32
            + 1;
        let quality = if is_perfect_class((degree - 1) as usize) {
            Quality::Perfect
        } else {
            Quality::Major
        };
        let base = Pythagorean::new(quality, degree).monzo()?;
        let two = base.exponent(0)
            + &self.sharps * Rational::from_integer(BigInt::from(APOTOME.0))
            + Rational::from_integer(BigInt::from(self.octave as i64 - 4));
        let three =
            base.exponent(1) + &self.sharps * Rational::from_integer(BigInt::from(APOTOME.1));
        Ok(TimeMonzo::from_parts(
            Rational::zero(),
            vec![two, three],
            Rational::one(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spell(quality: Quality, degree: u32) -> TimeMonzo {
        Pythagorean::new(quality, degree).monzo().unwrap()
    }

    #[test]
    fn classic_spellings() {
        assert_eq!(
            spell(Quality::Perfect, 5).to_rational(),
            Some(rational(3, 2))
        );
        assert_eq!(
            spell(Quality::Major, 3).to_rational(),
            Some(rational(81, 64))
        );
        assert_eq!(
            spell(Quality::Minor, 7).to_rational(),
            Some(rational(16, 9))
        );
        assert_eq!(
            spell(Quality::Augmented(1), 1).to_rational(),
            Some(rational(2187, 2048))
        );
        assert_eq!(
            spell(Quality::Perfect, 8).to_rational(),
            Some(rational(2, 1))
        );
        assert_eq!(
            spell(Quality::Major, 9).to_rational(),
            Some(rational(9, 4))
        );
    }

    #[test]
    fn neutral_thirds_split_the_fifth() {
        let neutral = spell(Quality::Neutral, 3);
        assert_eq!(neutral.exponent(0), rational(-1, 2));
        assert_eq!(neutral.exponent(1), rational(1, 2));
        assert!((neutral.total_cents() - 350.98).abs() < 0.01);
    }

    #[test]
    fn spelling_round_trip() {
        for (quality, degree) in [
            (Quality::Perfect, 1),
            (Quality::Minor, 2),
            (Quality::Major, 3),
            (Quality::Neutral, 6),
            (Quality::Diminished(1), 5),
            (Quality::Augmented(2), 4),
            (Quality::Major, 10),
        ] {
            let interval = Pythagorean::new(quality, degree);
            let monzo = interval.monzo().unwrap();
            assert_eq!(monzo_to_pythagorean(&monzo), Some(interval));
        }
    }

    #[test]
    fn wrong_quality_class_is_rejected() {
        assert!(Pythagorean::new(Quality::Perfect, 3).monzo().is_err());
        assert!(Pythagorean::new(Quality::Major, 5).monzo().is_err());
    }

    #[test]
    fn absolute_pitches_relative_to_c4() {
        let a4 = AbsolutePitch {
            nominal: 'A',
            sharps: Rational::zero(),
            octave: 4,
        };
        assert_eq!(a4.monzo().unwrap().to_rational(), Some(rational(27, 16)));

        let b_flat_5 = AbsolutePitch {
            nominal: 'B',
            sharps: rational(-1, 1),
            octave: 5,
        };
        assert_eq!(
            b_flat_5.monzo().unwrap().to_rational(),
            Some(rational(32, 9))
        );
    }
}
