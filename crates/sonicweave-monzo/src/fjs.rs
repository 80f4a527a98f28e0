//! FJS comma selection and inflection
//!
//! Every accidental such as `^5` or `_11` stands for a comma tied to a prime
//! and a flavor. Master-algorithm flavors pick the comma by scanning fifth
//! shifts outward from zero until the octave-balanced remnant falls inside
//! the flavor's radius of tolerance; table flavors look the comma up
//! directly. Commas always carry their number in the numerator so that a
//! superscript multiplies and a subscript divides.

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::monzo::{PowOutcome, TimeMonzo};
use crate::primes::prime_index;
use crate::pyth::{monzo_to_pythagorean, Pythagorean};
use crate::{rational, Rational};

/// Inflection flavor, written after superscripts (`M3^5n`, `n6_11h`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FjsFlavor {
    /// Formal/classic commas (empty tag or `c`).
    #[default]
    Formal,
    /// Neutral master commas (`n`).
    Neutral,
    /// Helmholtz-Ellis (`h`).
    HelmholtzEllis,
    /// HEWM-53 (`m`).
    Hewm53,
    /// Lumi's commas (`l`).
    Lumi,
    /// Semiquartal (`q`).
    Semiquartal,
    /// Tone-splitter (`t`).
    ToneSplitter,
    /// Syntonic-rastmic subchromas (`s`); the attached number is an index.
    SyntonicRastmic,
}

impl FjsFlavor {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "" | "c" => Some(FjsFlavor::Formal),
            "n" => Some(FjsFlavor::Neutral),
            "h" => Some(FjsFlavor::HelmholtzEllis),
            "m" => Some(FjsFlavor::Hewm53),
            "l" => Some(FjsFlavor::Lumi),
            "q" => Some(FjsFlavor::Semiquartal),
            "t" => Some(FjsFlavor::ToneSplitter),
            "s" => Some(FjsFlavor::SyntonicRastmic),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            FjsFlavor::Formal => "",
            FjsFlavor::Neutral => "n",
            FjsFlavor::HelmholtzEllis => "h",
            FjsFlavor::Hewm53 => "m",
            FjsFlavor::Lumi => "l",
            FjsFlavor::Semiquartal => "q",
            FjsFlavor::ToneSplitter => "t",
            FjsFlavor::SyntonicRastmic => "s",
        }
    }
}

const JUST_FIFTH_CENTS: f64 = 1901.9550008653874;

fn radius_cents(flavor: FjsFlavor) -> f64 {
    match flavor {
        // 65/63 octaves of tolerance.
        FjsFlavor::Formal => (65.0 / 63.0f64).log2() * 1200.0,
        // Half an apotome.
        FjsFlavor::Neutral => (2187.0 / 2048.0f64).log2() * 600.0,
        // Half a limma.
        FjsFlavor::Semiquartal => (256.0 / 243.0f64).log2() * 600.0,
        // Half a whole tone.
        FjsFlavor::ToneSplitter => (9.0 / 8.0f64).log2() * 600.0,
        _ => 0.0,
    }
}

/// Fifth-shift search order for a master flavor.
fn fifth_shifts(flavor: FjsFlavor) -> Vec<Rational> {
    let mut shifts = Vec::with_capacity(64);
    match flavor {
        FjsFlavor::Formal | FjsFlavor::ToneSplitter => {
            shifts.push(Rational::zero());
            for i in 1..=16i64 {
                shifts.push(rational(i, 1));
                shifts.push(rational(-i, 1));
            }
        }
        FjsFlavor::Neutral => {
            for i in 0..=16i64 {
                shifts.push(rational(2 * i + 1, 2));
                shifts.push(rational(-(2 * i + 1), 2));
            }
        }
        // Like neutral, but descending shifts first.
        FjsFlavor::Semiquartal => {
            for i in 0..=16i64 {
                shifts.push(rational(-(2 * i + 1), 2));
                shifts.push(rational(2 * i + 1, 2));
            }
        }
        _ => {}
    }
    shifts
}

/// Octave-balance `number * 3^(-shift)` into (-600, 600] cents. The
/// tone-splitter lattice balances on half octaves.
fn balanced_remnant(number: u64, shift: &Rational, flavor: FjsFlavor) -> TimeMonzo {
    use num_traits::ToPrimitive;

    let cents =
        (number as f64).log2() * 1200.0 - shift.to_f64().unwrap_or(0.0) * JUST_FIFTH_CENTS;
    let octaves = if matches!(flavor, FjsFlavor::ToneSplitter) {
        -(cents / 600.0).round() / 2.0
    } else {
        -(cents / 1200.0).round()
    };
    let two = if octaves.fract() == 0.0 {
        rational(octaves as i64, 1)
    } else {
        rational((octaves * 2.0) as i64, 2)
    };
    let base = TimeMonzo::from_bigint(BigInt::from(number));
    let three = TimeMonzo::prime_power(1, -shift.clone());
    let octave = TimeMonzo::prime_power(0, two);
    base.mul(&three).mul(&octave)
}

/// The comma a master flavor assigns to a prime.
fn master_comma(prime: u64, flavor: FjsFlavor) -> Option<TimeMonzo> {
    let radius = radius_cents(flavor);
    for shift in fifth_shifts(flavor) {
        let comma = balanced_remnant(prime, &shift, flavor);
        if comma.total_cents().abs() < radius {
            return Some(comma);
        }
    }
    None
}

fn table_comma(prime: u64, table: &[(u64, (i64, i64))]) -> Option<TimeMonzo> {
    table
        .iter()
        .find(|(p, _)| *p == prime)
        .map(|(_, (n, d))| TimeMonzo::from_fraction(*n, *d))
}

/// Helmholtz-Ellis accidentals through the 31-limit.
const HELMHOLTZ_ELLIS: [(u64, (i64, i64)); 9] = [
    (5, (80, 81)),
    (7, (63, 64)),
    (11, (33, 32)),
    (13, (1053, 1024)),
    (17, (4131, 4096)),
    (19, (513, 512)),
    (23, (736, 729)),
    (29, (261, 256)),
    (31, (248, 243)),
];

/// HEWM-53 accidentals through the 31-limit.
const HEWM_53: [(u64, (i64, i64)); 9] = [
    (5, (80, 81)),
    (7, (63, 64)),
    (11, (33, 32)),
    (13, (26, 27)),
    (17, (17, 18)),
    (19, (19, 18)),
    (23, (23, 24)),
    (29, (29, 27)),
    (31, (31, 32)),
];

/// Lumi's commas; primes without an entry fall back to the formal master.
const LUMI: [(u64, (i64, i64)); 4] = [
    (5, (80, 81)),
    (7, (63, 64)),
    (11, (704, 729)),
    (13, (1053, 1024)),
];

/// Syntonic-rastmic subchromas by index.
const SYNTONIC_RASTMIC: [(u64, (i64, i64)); 6] = [
    (0, (1, 1)),
    (1, (81, 80)),
    (2, (243, 242)),
    (3, (2187, 2176)),
    (4, (19683, 19456)),
    (5, (32805, 32768)),
];

/// The comma attached to `number` under `flavor`. For the prime-based
/// flavors `number` must be prime; for the syntonic-rastmic flavor it is a
/// subchroma index.
pub fn formal_comma(number: u64, flavor: FjsFlavor) -> Option<TimeMonzo> {
    match flavor {
        FjsFlavor::Formal
        | FjsFlavor::Neutral
        | FjsFlavor::Semiquartal
        | FjsFlavor::ToneSplitter => {
            prime_index(number)?;
            master_comma(number, flavor)
        }
        FjsFlavor::HelmholtzEllis => {
            table_comma(number, &HELMHOLTZ_ELLIS).or_else(|| master_comma(number, FjsFlavor::Formal))
        }
        FjsFlavor::Hewm53 => {
            table_comma(number, &HEWM_53).or_else(|| master_comma(number, FjsFlavor::Formal))
        }
        FjsFlavor::Lumi => {
            table_comma(number, &LUMI).or_else(|| master_comma(number, FjsFlavor::Formal))
        }
        FjsFlavor::SyntonicRastmic => table_comma(number, &SYNTONIC_RASTMIC),
    }
}

/// Inflection for a possibly composite superscript: `^15` composes the
/// commas of 3 and 5. The syntonic-rastmic flavor never decomposes.
pub fn composite_inflection(number: u64, flavor: FjsFlavor) -> Option<TimeMonzo> {
    if matches!(flavor, FjsFlavor::SyntonicRastmic) {
        return formal_comma(number, flavor);
    }
    if number < 2 {
        return None;
    }
    let mut remaining = number;
    let mut total = TimeMonzo::unity();
    let mut p = 2u64;
    while remaining > 1 {
        if p * p > remaining {
            total = total.mul(&formal_comma(remaining, flavor)?);
            break;
        }
        while remaining % p == 0 {
            total = total.mul(&formal_comma(p, flavor)?);
            remaining /= p;
        }
        p += 1;
    }
    Some(total)
}

/// Strip inflections from a relative monzo, recovering the Pythagorean core
/// and the superscript/subscript lists. `None` when an exponent past the
/// 3-limit is fractional or unreasonably large, or when the core cannot be
/// spelled.
pub fn uninflect(
    monzo: &TimeMonzo,
    flavor: FjsFlavor,
) -> Option<(Pythagorean, Vec<u64>, Vec<u64>)> {
    if !monzo.residual().is_one() || !monzo.time_exponent().is_zero() {
        return None;
    }
    let mut superscripts = Vec::new();
    let mut subscripts = Vec::new();
    let mut core = monzo.clone();
    for index in 2..monzo.component_count() {
        let exponent = monzo.exponent(index);
        if !exponent.is_integer() {
            return None;
        }
        let count = i64::try_from(exponent.to_integer()).ok()?;
        if count.unsigned_abs() > 16 {
            return None;
        }
        let prime = crate::primes::nth_prime(index);
        let comma = formal_comma(prime, flavor)?;
        for _ in 0..count.unsigned_abs() {
            if count > 0 {
                superscripts.push(prime);
                core = core.try_div(&comma).ok()?;
            } else {
                subscripts.push(prime);
                core = core.mul(&comma);
            }
        }
    }
    let pythagorean = monzo_to_pythagorean(&core)?;
    Some((pythagorean, superscripts, subscripts))
}

/// Apply parsed inflections to a Pythagorean core.
pub fn inflect(
    core: &TimeMonzo,
    superscripts: &[(u64, FjsFlavor)],
    subscripts: &[(u64, FjsFlavor)],
) -> Option<TimeMonzo> {
    let mut result = core.clone();
    for (number, flavor) in superscripts {
        result = result.mul(&composite_inflection(*number, *flavor)?);
    }
    for (number, flavor) in subscripts {
        let comma = composite_inflection(*number, *flavor)?;
        result = result.try_div(&comma).ok()?;
    }
    Some(result)
}

/// `S9`-style square superparticulars: n²/(n²-1).
pub fn square_superparticular(index: u64) -> Option<TimeMonzo> {
    if index < 2 {
        return None;
    }
    let square = BigInt::from(index) * BigInt::from(index);
    let value = Rational::new(square.clone(), square - BigInt::one());
    Some(TimeMonzo::from_rational(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pyth::Quality;

    #[test]
    fn formal_commas_match_the_fjs_backbone() {
        let five = formal_comma(5, FjsFlavor::Formal).unwrap();
        assert_eq!(five.to_rational(), Some(rational(80, 81)));

        let seven = formal_comma(7, FjsFlavor::Formal).unwrap();
        assert_eq!(seven.to_rational(), Some(rational(63, 64)));

        let eleven = formal_comma(11, FjsFlavor::Formal).unwrap();
        assert_eq!(eleven.to_rational(), Some(rational(33, 32)));
    }

    #[test]
    fn classic_major_third_inflects_to_five_over_four() {
        let major_third = Pythagorean::new(Quality::Major, 3).monzo().unwrap();
        let inflected = inflect(&major_third, &[(5, FjsFlavor::Formal)], &[]).unwrap();
        assert_eq!(inflected.to_rational(), Some(rational(5, 4)));
    }

    #[test]
    fn subscripts_divide() {
        let major_second = Pythagorean::new(Quality::Major, 2).monzo().unwrap();
        let inflected = inflect(&major_second, &[], &[(7, FjsFlavor::Formal)]).unwrap();
        assert_eq!(inflected.to_rational(), Some(rational(8, 7)));
    }

    #[test]
    fn neutral_master_covers_eleven() {
        let comma = formal_comma(11, FjsFlavor::Neutral).unwrap();
        // The neutral comma of 11 sits within a few cents of the unison.
        assert!(comma.total_cents().abs() < 10.0);
        assert!(!comma.is_integral_monzo());
    }

    #[test]
    fn uninflection_round_trip() {
        let five_over_four = TimeMonzo::from_fraction(5, 4);
        let (core, supers, subs) = uninflect(&five_over_four, FjsFlavor::Formal).unwrap();
        assert_eq!(core, Pythagorean::new(Quality::Major, 3));
        assert_eq!(supers, vec![5]);
        assert!(subs.is_empty());
    }

    #[test]
    fn square_superparticulars() {
        assert_eq!(
            square_superparticular(9).unwrap().to_rational(),
            Some(rational(81, 80))
        );
        assert_eq!(
            square_superparticular(2).unwrap().to_rational(),
            Some(rational(4, 3))
        );
    }
}
