//! Interval literal shapes
//!
//! Each numeric literal form of the language has a node here. The parser
//! produces them and the evaluator carries them on intervals as formatting
//! hints, so a nedji stays a nedji and a fraction keeps its denominator
//! through arithmetic that permits it.

use num_bigint::BigInt;
use sonicweave_monzo::fjs::FjsFlavor;
use sonicweave_monzo::pyth::Pythagorean;
use sonicweave_monzo::{rational, Rational};

/// Metric (and binary) prefixes accepted on `Hz` and `s` units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MetricPrefix {
    Nano,
    Micro,
    Milli,
    Centi,
    Deci,
    #[default]
    Unit,
    Kilo,
    Mega,
    Giga,
    Tera,
    Kibi,
    Mebi,
    Gibi,
}

impl MetricPrefix {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "n" => Some(MetricPrefix::Nano),
            "µ" | "u" => Some(MetricPrefix::Micro),
            "m" => Some(MetricPrefix::Milli),
            "c" => Some(MetricPrefix::Centi),
            "d" => Some(MetricPrefix::Deci),
            "" => Some(MetricPrefix::Unit),
            "k" => Some(MetricPrefix::Kilo),
            "M" => Some(MetricPrefix::Mega),
            "G" => Some(MetricPrefix::Giga),
            "T" => Some(MetricPrefix::Tera),
            "Ki" => Some(MetricPrefix::Kibi),
            "Mi" => Some(MetricPrefix::Mebi),
            "Gi" => Some(MetricPrefix::Gibi),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            MetricPrefix::Nano => "n",
            MetricPrefix::Micro => "µ",
            MetricPrefix::Milli => "m",
            MetricPrefix::Centi => "c",
            MetricPrefix::Deci => "d",
            MetricPrefix::Unit => "",
            MetricPrefix::Kilo => "k",
            MetricPrefix::Mega => "M",
            MetricPrefix::Giga => "G",
            MetricPrefix::Tera => "T",
            MetricPrefix::Kibi => "Ki",
            MetricPrefix::Mebi => "Mi",
            MetricPrefix::Gibi => "Gi",
        }
    }

    /// Multiplier relative to the bare unit.
    pub fn factor(&self) -> Rational {
        match self {
            MetricPrefix::Nano => rational(1, 1_000_000_000),
            MetricPrefix::Micro => rational(1, 1_000_000),
            MetricPrefix::Milli => rational(1, 1000),
            MetricPrefix::Centi => rational(1, 100),
            MetricPrefix::Deci => rational(1, 10),
            MetricPrefix::Unit => rational(1, 1),
            MetricPrefix::Kilo => rational(1000, 1),
            MetricPrefix::Mega => rational(1_000_000, 1),
            MetricPrefix::Giga => rational(1_000_000_000, 1),
            MetricPrefix::Tera => rational(1_000_000_000_000, 1),
            MetricPrefix::Kibi => rational(1 << 10, 1),
            MetricPrefix::Mebi => rational(1 << 20, 1),
            MetricPrefix::Gibi => rational(1 << 30, 1),
        }
    }
}

/// Flavor tag on a decimal literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecimalFlavor {
    /// `1.2e` or `1.2e-3`: an exact decimal fraction.
    Exact,
    /// `3.14r`: a double-precision real.
    Real,
    /// `1.2z`: a frequency in hertz.
    Hertz,
}

/// `k\n` with an optional equave: `6\13<3>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NedjiData {
    pub numerator: i64,
    pub denominator: i64,
    pub equave: Option<(i64, i64)>,
}

/// Accidentals on absolute pitches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accidental {
    Sharp,
    Flat,
    DoubleSharp,
    Natural,
}

impl Accidental {
    pub fn from_char(symbol: char) -> Option<Self> {
        match symbol {
            '#' | '♯' => Some(Accidental::Sharp),
            'b' | '♭' => Some(Accidental::Flat),
            'x' => Some(Accidental::DoubleSharp),
            '=' => Some(Accidental::Natural),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Accidental::Sharp => '#',
            Accidental::Flat => 'b',
            Accidental::DoubleSharp => 'x',
            Accidental::Natural => '=',
        }
    }

    /// Shift in apotomes.
    pub fn apotomes(&self) -> Rational {
        match self {
            Accidental::Sharp => rational(1, 1),
            Accidental::Flat => rational(-1, 1),
            Accidental::DoubleSharp => rational(2, 1),
            Accidental::Natural => rational(0, 1),
        }
    }
}

/// The formatting node attached to intervals.
#[derive(Clone, Debug, PartialEq)]
pub enum IntervalLiteral {
    Integer(BigInt),
    Fraction {
        numerator: BigInt,
        denominator: BigInt,
    },
    Decimal {
        amount: Rational,
        flavor: DecimalFlavor,
    },
    /// `701.955` or `1.955c`; `real` flips the rendering to real cents.
    Cents {
        amount: Rational,
        real: bool,
    },
    /// The cent unit itself: `c` / `¢`.
    Cent,
    Nedji(NedjiData),
    /// `7\`: seven generic steps.
    Step(i64),
    /// `2^1/3`.
    Radical {
        radicand: Rational,
        exponent: Rational,
    },
    /// `S9` = 81/80.
    SquareSuperparticular(u64),
    /// `[-4 4 -1>` with an optional `@2.3.5` basis.
    Monzo {
        components: Vec<Rational>,
        basis: Option<Vec<Rational>>,
    },
    /// `<12 19 28]` with an optional basis.
    Val {
        components: Vec<Rational>,
        basis: Option<Vec<Rational>>,
    },
    /// `17c@2.3.5.7`.
    Warts {
        equave: Option<char>,
        divisions: u64,
        warts: Vec<char>,
        basis: Vec<Rational>,
    },
    /// `17[^5,v3]@2.3.5`.
    SparseOffsetVal {
        equave: Option<char>,
        divisions: u64,
        /// (signed offset, prime) pairs.
        tweaks: Vec<(i64, u64)>,
        basis: Vec<Rational>,
    },
    /// `^M3^5_7n` and friends.
    Fjs {
        ups: i32,
        lifts: i32,
        pythagorean: Pythagorean,
        superscripts: Vec<(u64, FjsFlavor)>,
        subscripts: Vec<(u64, FjsFlavor)>,
    },
    /// `Bb5^7`.
    AbsoluteFjs {
        ups: i32,
        lifts: i32,
        nominal: char,
        accidentals: Vec<Accidental>,
        octave: i32,
        superscripts: Vec<(u64, FjsFlavor)>,
        subscripts: Vec<(u64, FjsFlavor)>,
    },
    /// A value that wants to be spelled in FJS once a context is at hand.
    AspiringFjs {
        flavor: FjsFlavor,
    },
    AspiringAbsoluteFjs {
        flavor: FjsFlavor,
    },
    Hertz {
        prefix: MetricPrefix,
    },
    Second {
        prefix: MetricPrefix,
    },
    True,
    False,
}

impl IntervalLiteral {
    /// Stable tag for serialization.
    pub fn tag(&self) -> &'static str {
        match self {
            IntervalLiteral::Integer(_) => "IntegerLiteral",
            IntervalLiteral::Fraction { .. } => "FractionLiteral",
            IntervalLiteral::Decimal { .. } => "DecimalLiteral",
            IntervalLiteral::Cents { .. } => "CentsLiteral",
            IntervalLiteral::Cent => "CentLiteral",
            IntervalLiteral::Nedji(_) => "NedjiLiteral",
            IntervalLiteral::Step(_) => "StepLiteral",
            IntervalLiteral::Radical { .. } => "RadicalLiteral",
            IntervalLiteral::SquareSuperparticular(_) => "SquareSuperparticular",
            IntervalLiteral::Monzo { .. } => "MonzoLiteral",
            IntervalLiteral::Val { .. } => "ValLiteral",
            IntervalLiteral::Warts { .. } => "WartsLiteral",
            IntervalLiteral::SparseOffsetVal { .. } => "SparseOffsetVal",
            IntervalLiteral::Fjs { .. } => "FJS",
            IntervalLiteral::AbsoluteFjs { .. } => "AbsoluteFJS",
            IntervalLiteral::AspiringFjs { .. } => "AspiringFJS",
            IntervalLiteral::AspiringAbsoluteFjs { .. } => "AspiringAbsoluteFJS",
            IntervalLiteral::Hertz { .. } => "HertzLiteral",
            IntervalLiteral::Second { .. } => "SecondLiteral",
            IntervalLiteral::True => "TrueLiteral",
            IntervalLiteral::False => "FalseLiteral",
        }
    }
}
