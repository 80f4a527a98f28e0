//! Operator semantics and the format-preference protocol
//!
//! Every arithmetic operator computes its value by domain semantics first,
//! then chooses the result's domain and formatting node from the operator's
//! preference decoration. Plain operators merge compatible nodes; preferring
//! operators rewrite the chosen operand's node to the computed value; when
//! neither applies the formatting drops and reprinting re-derives it.

use num_bigint::BigInt;
use num_integer::Integer as _;
use num_traits::{One, Signed, Zero};
use sonicweave_ast::{BinaryOperator, DecimalFlavor, IntervalLiteral, NedjiData, Preference};
use sonicweave_monzo::fjs::FjsFlavor;
use sonicweave_monzo::{Quantity, Rational};

use crate::error::EvalError;
use crate::value::{Domain, Interval, Val, Value};

// ===== Interval arithmetic =====

fn scalar_of(interval: &Interval) -> Result<Rational, EvalError> {
    interval.value.to_rational().ok_or_else(|| {
        EvalError::Domain("step scaling requires a rational scalar".to_owned())
    })
}

fn scale_steps(steps: i64, scalar: &Rational) -> Result<i64, EvalError> {
    if steps == 0 {
        return Ok(0);
    }
    let scaled = Rational::from_integer(BigInt::from(steps)) * scalar;
    if !scaled.is_integer() {
        return Err(EvalError::Domain(
            "steps cannot be scaled by a fractional amount".to_owned(),
        ));
    }
    i64::try_from(scaled.to_integer())
        .map_err(|_| EvalError::Resource("step count overflow".to_owned()))
}

/// Value, steps and natural domain of a binary operation.
fn raw_operation(
    op: BinaryOperator,
    a: &Interval,
    b: &Interval,
) -> Result<(Quantity, i64, Domain), EvalError> {
    use BinaryOperator::*;
    use Domain::*;
    match op {
        Add | Subtract => {
            if a.domain == Logarithmic && b.domain == Logarithmic {
                let value = if op == Add {
                    a.value.mul(&b.value)
                } else {
                    a.value.div(&b.value)?
                };
                let steps = if op == Add {
                    a.steps + b.steps
                } else {
                    a.steps - b.steps
                };
                Ok((value, steps, Logarithmic))
            } else {
                let value = if op == Add {
                    a.value.add(&b.value)?
                } else {
                    a.value.sub(&b.value)?
                };
                let steps = if op == Add {
                    a.steps + b.steps
                } else {
                    a.steps - b.steps
                };
                Ok((value, steps, Linear))
            }
        }
        Multiply | Tensor => match (a.domain, b.domain) {
            (Linear, Linear) => Ok((a.value.mul(&b.value), a.steps + b.steps, Linear)),
            (Logarithmic, Linear) => {
                let scalar = scalar_of(b);
                let value = a.value.pow(&b.value)?;
                let steps = match scalar {
                    Ok(scalar) => scale_steps(a.steps, &scalar)?,
                    Err(error) if a.steps != 0 => return Err(error),
                    Err(_) => 0,
                };
                Ok((value, steps, Logarithmic))
            }
            (Linear, Logarithmic) => {
                let scalar = scalar_of(a);
                let value = b.value.pow(&a.value)?;
                let steps = match scalar {
                    Ok(scalar) => scale_steps(b.steps, &scalar)?,
                    Err(error) if b.steps != 0 => return Err(error),
                    Err(_) => 0,
                };
                Ok((value, steps, Logarithmic))
            }
            (Logarithmic, Logarithmic) => Err(EvalError::Domain(
                "cannot multiply two logarithmic quantities".to_owned(),
            )),
        },
        Divide | Fraction => match (a.domain, b.domain) {
            (Linear, Linear) => Ok((a.value.div(&b.value)?, a.steps - b.steps, Linear)),
            (Logarithmic, Linear) => {
                let scalar = scalar_of(b)?;
                if scalar.is_zero() {
                    return Err(EvalError::Domain("division by zero".to_owned()));
                }
                let inverse = scalar.clone().recip();
                let value = a.value.pow_rational(&inverse)?;
                let steps = scale_steps(a.steps, &inverse)?;
                Ok((value, steps, Logarithmic))
            }
            (Logarithmic, Logarithmic) => {
                Ok((a.value.log_divide(&b.value)?, 0, Linear))
            }
            (Linear, Logarithmic) => Err(EvalError::Domain(
                "cannot divide a linear quantity by a logarithmic one".to_owned(),
            )),
        },
        Pow => {
            if b.domain == Logarithmic {
                return Err(EvalError::Domain(
                    "exponents must be linear".to_owned(),
                ));
            }
            let value = a.value.pow(&b.value)?;
            let steps = match scalar_of(b) {
                Ok(scalar) => scale_steps(a.steps, &scalar)?,
                Err(error) if a.steps != 0 => return Err(error),
                Err(_) => 0,
            };
            Ok((value, steps, a.domain))
        }
        Recipropower => {
            if b.domain == Logarithmic {
                return Err(EvalError::Domain(
                    "root degrees must be linear".to_owned(),
                ));
            }
            let degree = scalar_of(b)?;
            if degree.is_zero() {
                return Err(EvalError::Domain("zeroth root".to_owned()));
            }
            let inverse = degree.recip();
            let value = a.value.pow_rational(&inverse)?;
            let steps = scale_steps(a.steps, &inverse)?;
            Ok((value, steps, a.domain))
        }
        LogDivide => Ok((a.value.log_divide(&b.value)?, 0, Linear)),
        Ed => Ok((a.value.project(&b.value)?, a.steps, Logarithmic)),
        Reduce => Ok((a.value.reduce(&b.value, false)?, a.steps, a.domain)),
        ReduceCeiling => Ok((a.value.reduce(&b.value, true)?, a.steps, a.domain)),
        Modulo | ModuloCeiling => {
            let ceiling = op == ModuloCeiling;
            if a.domain == Logarithmic && b.domain == Logarithmic {
                Ok((a.value.reduce(&b.value, ceiling)?, a.steps, Logarithmic))
            } else {
                Ok((a.value.rem(&b.value, ceiling)?, a.steps, Linear))
            }
        }
        To => {
            if a.domain == Logarithmic && b.domain == Logarithmic {
                Ok((a.value.pitch_round_to(&b.value)?, a.steps, Logarithmic))
            } else {
                Ok((a.value.round_to(&b.value)?, a.steps, Linear))
            }
        }
        By => Ok((a.value.pitch_round_to(&b.value)?, a.steps, a.domain)),
        LensAdd => Ok((a.value.lens_add(&b.value)?, a.steps, a.domain)),
        LensSub => Ok((a.value.lens_sub(&b.value)?, a.steps, a.domain)),
        Dot => {
            let product = a.value.dot(&b.value)?;
            Ok((Quantity::from_rational(&product), 0, Linear))
        }
        _ => Err(EvalError::Type(format!("{op} is not interval arithmetic"))),
    }
}

/// The §4.2.2 protocol over two intervals.
pub fn interval_binary(
    op: BinaryOperator,
    preference: Preference,
    a: &Interval,
    b: &Interval,
) -> Result<Interval, EvalError> {
    // max/min pick an operand wholesale.
    if matches!(op, BinaryOperator::Max | BinaryOperator::Min) {
        let ordering = a.value.value_cmp(&b.value);
        let left_wins = match op {
            BinaryOperator::Max => ordering != std::cmp::Ordering::Less,
            _ => ordering != std::cmp::Ordering::Greater,
        };
        return Ok(if left_wins { a.clone() } else { b.clone() });
    }

    let (value, steps, natural_domain) = raw_operation(op, a, b)?;
    // Domain-crossing operators ignore preference entirely.
    let domain = match op {
        BinaryOperator::Dot | BinaryOperator::LogDivide => Domain::Linear,
        BinaryOperator::Ed => Domain::Logarithmic,
        _ => match preference {
            Preference::None => natural_domain,
            Preference::Left => a.domain,
            Preference::Right => b.domain,
            Preference::Wings => {
                if a.domain == Domain::Linear || b.domain == Domain::Linear {
                    Domain::Linear
                } else {
                    a.domain
                }
            }
        },
    };
    let node = match preference {
        Preference::None => match (&a.node, &b.node) {
            (Some(left), Some(right)) => merge_nodes(op, left, right, &value, steps),
            _ => None,
        },
        Preference::Left | Preference::Wings => {
            a.node.as_ref().and_then(|n| rewrite_node(n, &value, steps))
        }
        Preference::Right => b.node.as_ref().and_then(|n| rewrite_node(n, &value, steps)),
    };
    let mut result = Interval {
        value,
        domain,
        steps,
        node,
        color: None,
        label: None,
        tracking_ids: Vec::new(),
    };
    infect(&mut result, preference, a, b);
    Ok(result)
}

/// A lone attribute propagates; with both present the preferred side wins
/// and the left side is the default.
fn pick_attribute(
    preference: Preference,
    a: &Option<String>,
    b: &Option<String>,
) -> Option<String> {
    match (a, b) {
        (Some(value), None) => Some(value.clone()),
        (None, Some(value)) => Some(value.clone()),
        (Some(left), Some(right)) => Some(if matches!(preference, Preference::Right) {
            right.clone()
        } else {
            left.clone()
        }),
        (None, None) => None,
    }
}

/// Color and label inheritance.
fn infect(result: &mut Interval, preference: Preference, a: &Interval, b: &Interval) {
    result.label = pick_attribute(preference, &a.label, &b.label);
    result.color = pick_attribute(preference, &a.color, &b.color);
    let mut ids = a.tracking_ids.clone();
    ids.extend(b.tracking_ids.iter().copied());
    result.tracking_ids = ids;
}

// ===== Node merging (plain operators) =====

fn fraction_parts(node: &IntervalLiteral) -> Option<(BigInt, BigInt)> {
    match node {
        IntervalLiteral::Integer(value) => Some((value.clone(), BigInt::one())),
        IntervalLiteral::Fraction {
            numerator,
            denominator,
        } => Some((numerator.clone(), denominator.clone())),
        _ => None,
    }
}

fn merge_nodes(
    op: BinaryOperator,
    left: &IntervalLiteral,
    right: &IntervalLiteral,
    value: &Quantity,
    steps: i64,
) -> Option<IntervalLiteral> {
    use BinaryOperator::*;
    let additive = matches!(op, Add | Subtract);
    match (left, right) {
        // The fraction slash keeps both literal parts verbatim.
        (IntervalLiteral::Integer(numerator), IntervalLiteral::Integer(denominator))
            if op == Fraction =>
        {
            Some(IntervalLiteral::Fraction {
                numerator: numerator.clone(),
                denominator: denominator.clone(),
            })
        }
        (IntervalLiteral::Integer(_), IntervalLiteral::Integer(_)) if additive => {
            rewrite_node(left, value, steps)
        }
        (IntervalLiteral::Nedji(a), IntervalLiteral::Nedji(b))
            if additive && a.equave == b.equave =>
        {
            let denominator = a.denominator.lcm(&b.denominator);
            rewrite_nedji(value, denominator, a.equave)
        }
        (IntervalLiteral::Cents { real: ra, .. }, IntervalLiteral::Cents { real: rb, .. })
            if additive =>
        {
            rewrite_cents(value, *ra || *rb)
        }
        (
            IntervalLiteral::Decimal { flavor: fa, .. },
            IntervalLiteral::Decimal { flavor: fb, .. },
        ) if additive && fa == fb => rewrite_node(left, value, steps),
        (IntervalLiteral::Step(_), IntervalLiteral::Step(_)) if additive => {
            Some(IntervalLiteral::Step(steps))
        }
        (IntervalLiteral::Hertz { prefix }, IntervalLiteral::Hertz { .. }) if additive => {
            Some(IntervalLiteral::Hertz { prefix: *prefix })
        }
        (IntervalLiteral::Second { prefix }, IntervalLiteral::Second { .. }) if additive => {
            Some(IntervalLiteral::Second { prefix: *prefix })
        }
        _ if additive => {
            let (_, da) = fraction_parts(left)?;
            let (_, db) = fraction_parts(right)?;
            rewrite_fraction(value, &da.lcm(&db))
        }
        // Units survive multiplication: `440 Hz`.
        (_, IntervalLiteral::Hertz { prefix }) | (IntervalLiteral::Hertz { prefix }, _)
            if matches!(op, Multiply) =>
        {
            Some(IntervalLiteral::Hertz { prefix: *prefix })
        }
        (_, IntervalLiteral::Second { prefix }) | (IntervalLiteral::Second { prefix }, _)
            if matches!(op, Multiply) =>
        {
            Some(IntervalLiteral::Second { prefix: *prefix })
        }
        _ => None,
    }
}

// ===== Node rewriting (preferring operators) =====

/// Refit a node shape to a computed value; `None` when the shape cannot
/// express it.
pub fn rewrite_node(
    node: &IntervalLiteral,
    value: &Quantity,
    steps: i64,
) -> Option<IntervalLiteral> {
    // Relative shapes cannot spell absolute quantities.
    if !value.is_relative()
        && !matches!(
            node,
            IntervalLiteral::Hertz { .. }
                | IntervalLiteral::Second { .. }
                | IntervalLiteral::AbsoluteFjs { .. }
                | IntervalLiteral::AspiringAbsoluteFjs { .. }
                | IntervalLiteral::Decimal {
                    flavor: DecimalFlavor::Hertz,
                    ..
                }
        )
    {
        return None;
    }
    match node {
        IntervalLiteral::Integer(_) => {
            let fraction = value.to_rational()?;
            if fraction.is_integer() {
                Some(IntervalLiteral::Integer(fraction.to_integer()))
            } else {
                Some(IntervalLiteral::Fraction {
                    numerator: fraction.numer().clone(),
                    denominator: fraction.denom().clone(),
                })
            }
        }
        IntervalLiteral::Fraction { denominator, .. } => rewrite_fraction(value, denominator),
        IntervalLiteral::Decimal { flavor, .. } => rewrite_decimal(value, *flavor),
        IntervalLiteral::Cent => rewrite_cents(value, value.is_real()),
        IntervalLiteral::Cents { real, .. } => rewrite_cents(value, *real || value.is_real()),
        IntervalLiteral::Nedji(data) => rewrite_nedji(value, data.denominator, data.equave),
        IntervalLiteral::Step(_) => Some(IntervalLiteral::Step(steps)),
        IntervalLiteral::Radical { .. } => rewrite_radical(value),
        IntervalLiteral::SquareSuperparticular(_) => {
            let fraction = value.to_rational()?;
            if fraction.numer() - fraction.denom() == BigInt::one() {
                let root = fraction.numer().sqrt();
                if &(&root * &root) == fraction.numer() {
                    if let Ok(index) = u64::try_from(root) {
                        return Some(IntervalLiteral::SquareSuperparticular(index));
                    }
                }
            }
            rewrite_fraction(value, &BigInt::one())
        }
        IntervalLiteral::Monzo { basis, .. } => rewrite_monzo(value, basis.clone()),
        IntervalLiteral::Fjs { superscripts, .. } => Some(IntervalLiteral::AspiringFjs {
            flavor: superscripts
                .first()
                .map(|(_, flavor)| *flavor)
                .unwrap_or(FjsFlavor::Formal),
        }),
        IntervalLiteral::AbsoluteFjs { superscripts, .. } => {
            Some(IntervalLiteral::AspiringAbsoluteFjs {
                flavor: superscripts
                    .first()
                    .map(|(_, flavor)| *flavor)
                    .unwrap_or(FjsFlavor::Formal),
            })
        }
        IntervalLiteral::AspiringFjs { flavor } => {
            Some(IntervalLiteral::AspiringFjs { flavor: *flavor })
        }
        IntervalLiteral::AspiringAbsoluteFjs { flavor } => {
            Some(IntervalLiteral::AspiringAbsoluteFjs { flavor: *flavor })
        }
        IntervalLiteral::Hertz { prefix } => {
            matches!(value, Quantity::Exact(_) | Quantity::Real(_))
                .then_some(IntervalLiteral::Hertz { prefix: *prefix })
        }
        IntervalLiteral::Second { prefix } => Some(IntervalLiteral::Second { prefix: *prefix }),
        IntervalLiteral::True | IntervalLiteral::False => {
            if value.is_unity() {
                Some(IntervalLiteral::True)
            } else if value.is_zero() {
                Some(IntervalLiteral::False)
            } else {
                rewrite_node(&IntervalLiteral::Integer(BigInt::one()), value, steps)
            }
        }
        // Val shapes never sit on intervals.
        _ => None,
    }
}

pub fn rewrite_fraction(value: &Quantity, preferred: &BigInt) -> Option<IntervalLiteral> {
    let fraction = value.to_rational()?;
    if !preferred.is_zero() && !preferred.is_one() {
        let scaled = &fraction * Rational::from_integer(preferred.clone());
        if scaled.is_integer() {
            return Some(IntervalLiteral::Fraction {
                numerator: scaled.to_integer(),
                denominator: preferred.clone(),
            });
        }
    }
    Some(IntervalLiteral::Fraction {
        numerator: fraction.numer().clone(),
        denominator: fraction.denom().clone(),
    })
}

fn rewrite_nedji(
    value: &Quantity,
    preferred_denominator: i64,
    equave: Option<(i64, i64)>,
) -> Option<IntervalLiteral> {
    let (en, ed) = equave.unwrap_or((2, 1));
    let base = Quantity::from_fraction(en, ed);
    let exponent = value.log_divide(&base).ok()?.to_rational()?;
    let scaled = &exponent * Rational::from_integer(BigInt::from(preferred_denominator));
    let (numerator, denominator) = if scaled.is_integer() {
        (i64::try_from(scaled.to_integer()).ok()?, preferred_denominator)
    } else {
        let denominator =
            i64::try_from(exponent.denom().lcm(&BigInt::from(preferred_denominator))).ok()?;
        let numerator = i64::try_from(
            (&exponent * Rational::from_integer(BigInt::from(denominator))).to_integer(),
        )
        .ok()?;
        (numerator, denominator)
    };
    Some(IntervalLiteral::Nedji(NedjiData {
        numerator,
        denominator,
        equave,
    }))
}

fn rewrite_cents(value: &Quantity, real: bool) -> Option<IntervalLiteral> {
    if real || value.is_real() {
        return Some(IntervalLiteral::Cents {
            amount: Rational::zero(),
            real: true,
        });
    }
    match value {
        Quantity::Exact(monzo) => monzo.cents_fraction().map(|amount| IntervalLiteral::Cents {
            amount,
            real: false,
        }),
        Quantity::Real(_) => None,
    }
}

fn rewrite_decimal(value: &Quantity, flavor: DecimalFlavor) -> Option<IntervalLiteral> {
    match flavor {
        DecimalFlavor::Real => Some(IntervalLiteral::Decimal {
            amount: Rational::zero(),
            flavor,
        }),
        _ => {
            let fraction = value.to_rational()?;
            if is_ten_smooth(fraction.denom()) {
                Some(IntervalLiteral::Decimal {
                    amount: fraction,
                    flavor,
                })
            } else {
                None
            }
        }
    }
}

pub fn is_ten_smooth(denominator: &BigInt) -> bool {
    let mut d = denominator.clone();
    for p in [2u32, 5] {
        let prime = BigInt::from(p);
        while (&d % &prime).is_zero() {
            d /= &prime;
        }
    }
    d.is_one()
}

fn rewrite_radical(value: &Quantity) -> Option<IntervalLiteral> {
    match value {
        Quantity::Exact(monzo) => {
            let (radicand, degree) = monzo.radical_parts()?;
            Some(IntervalLiteral::Radical {
                radicand,
                exponent: Rational::new(BigInt::one(), BigInt::from(degree)),
            })
        }
        Quantity::Real(_) => None,
    }
}

fn rewrite_monzo(value: &Quantity, basis: Option<Vec<Rational>>) -> Option<IntervalLiteral> {
    let Quantity::Exact(monzo) = value else {
        return None;
    };
    if !monzo.residual().abs().is_one() || monzo.is_negative() {
        return None;
    }
    match basis {
        None => {
            let components = monzo.exponents().to_vec();
            Some(IntervalLiteral::Monzo {
                components,
                basis: None,
            })
        }
        Some(basis) => {
            // Only prime bases refit directly.
            let mut components = Vec::with_capacity(basis.len());
            let mut covered = vec![false; monzo.component_count()];
            for element in &basis {
                if !element.is_integer() {
                    return None;
                }
                let prime = u64::try_from(element.to_integer()).ok()?;
                let index = sonicweave_monzo::primes::prime_index(prime)?;
                components.push(monzo.exponent(index));
                if index < covered.len() {
                    covered[index] = true;
                }
            }
            for (index, covered) in covered.iter().enumerate() {
                if !covered && !monzo.exponent(index).is_zero() {
                    return None;
                }
            }
            Some(IntervalLiteral::Monzo {
                components,
                basis: Some(basis),
            })
        }
    }
}

// ===== Unary operators =====

fn negate_node(node: &IntervalLiteral) -> Option<IntervalLiteral> {
    match node {
        IntervalLiteral::Integer(value) => Some(IntervalLiteral::Integer(-value.clone())),
        IntervalLiteral::Fraction {
            numerator,
            denominator,
        } => Some(IntervalLiteral::Fraction {
            numerator: -numerator.clone(),
            denominator: denominator.clone(),
        }),
        IntervalLiteral::Cents { amount, real } => Some(IntervalLiteral::Cents {
            amount: -amount.clone(),
            real: *real,
        }),
        IntervalLiteral::Nedji(data) => Some(IntervalLiteral::Nedji(NedjiData {
            numerator: -data.numerator,
            denominator: data.denominator,
            equave: data.equave,
        })),
        IntervalLiteral::Step(steps) => Some(IntervalLiteral::Step(-steps)),
        IntervalLiteral::Decimal { amount, flavor } => Some(IntervalLiteral::Decimal {
            amount: -amount.clone(),
            flavor: *flavor,
        }),
        _ => None,
    }
}

/// Flip a node's numerator and denominator in place; the documented uniform
/// inversion.
fn invert_node(node: &IntervalLiteral) -> Option<IntervalLiteral> {
    match node {
        IntervalLiteral::Integer(value) => Some(IntervalLiteral::Fraction {
            numerator: BigInt::one(),
            denominator: value.clone(),
        }),
        IntervalLiteral::Fraction {
            numerator,
            denominator,
        } => Some(IntervalLiteral::Fraction {
            numerator: denominator.clone(),
            denominator: numerator.clone(),
        }),
        IntervalLiteral::Nedji(_) | IntervalLiteral::Cents { .. } | IntervalLiteral::Step(_) => {
            negate_node(node)
        }
        _ => None,
    }
}

/// Negation: linear values flip sign, logarithmic values invert.
pub fn negate(interval: &Interval) -> Result<Interval, EvalError> {
    let value = match interval.domain {
        Domain::Linear => interval.value.neg(),
        Domain::Logarithmic => interval.value.inverse()?,
    };
    Ok(Interval {
        value,
        domain: interval.domain,
        steps: -interval.steps,
        node: interval.node.as_ref().and_then(negate_node),
        color: interval.color.clone(),
        label: interval.label.clone(),
        tracking_ids: interval.tracking_ids.clone(),
    })
}

/// Reciprocal in both domains.
pub fn invert(interval: &Interval) -> Result<Interval, EvalError> {
    Ok(Interval {
        value: interval.value.inverse()?,
        domain: interval.domain,
        steps: -interval.steps,
        node: interval.node.as_ref().and_then(invert_node),
        color: interval.color.clone(),
        label: interval.label.clone(),
        tracking_ids: interval.tracking_ids.clone(),
    })
}

/// Apply ups/downs or lifts/drops from the context.
pub fn inflect(
    interval: &Interval,
    amount: &crate::context::Inflection,
    count: i32,
    lift: bool,
) -> Result<Interval, EvalError> {
    let mut value = interval.value.clone();
    for _ in 0..count.abs() {
        value = if count > 0 {
            value.mul(&amount.value)
        } else {
            value.div(&amount.value)?
        };
    }
    let steps = interval.steps + amount.steps * count as i64;
    let node = match &interval.node {
        Some(IntervalLiteral::Fjs {
            ups,
            lifts,
            pythagorean,
            superscripts,
            subscripts,
        }) => Some(IntervalLiteral::Fjs {
            ups: ups + if lift { 0 } else { count },
            lifts: lifts + if lift { count } else { 0 },
            pythagorean: *pythagorean,
            superscripts: superscripts.clone(),
            subscripts: subscripts.clone(),
        }),
        Some(IntervalLiteral::AbsoluteFjs {
            ups,
            lifts,
            nominal,
            accidentals,
            octave,
            superscripts,
            subscripts,
        }) => Some(IntervalLiteral::AbsoluteFjs {
            ups: ups + if lift { 0 } else { count },
            lifts: lifts + if lift { count } else { 0 },
            nominal: *nominal,
            accidentals: accidentals.clone(),
            octave: *octave,
            superscripts: superscripts.clone(),
            subscripts: subscripts.clone(),
        }),
        _ => None,
    };
    Ok(Interval {
        value,
        domain: interval.domain,
        steps,
        node,
        color: interval.color.clone(),
        label: interval.label.clone(),
        tracking_ids: interval.tracking_ids.clone(),
    })
}

// ===== Value-level comparisons =====

pub fn strict_value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Color(x), Value::Color(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| strict_value_eq(a, b))
        }
        (Value::Record(x), Value::Record(y)) => {
            x.len() == y.len()
                && x.iter().all(|(key, value)| {
                    y.get(key).is_some_and(|other| strict_value_eq(value, other))
                })
        }
        _ => match (a.as_interval(), b.as_interval()) {
            (Some(x), Some(y)) => x.strict_eq(&y),
            _ => false,
        },
    }
}

pub fn weak_value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| weak_value_eq(a, b))
        }
        _ => match (a.as_interval(), b.as_interval()) {
            (Some(x), Some(y)) => x.weak_eq(&y),
            _ => strict_value_eq(a, b),
        },
    }
}

pub fn compare_values(a: &Value, b: &Value) -> Result<std::cmp::Ordering, EvalError> {
    match (a.as_interval(), b.as_interval()) {
        (Some(x), Some(y)) => {
            let ordering = x.value.value_cmp(&y.value);
            if ordering == std::cmp::Ordering::Equal {
                Ok(x.steps.cmp(&y.steps))
            } else {
                Ok(ordering)
            }
        }
        _ => Err(EvalError::Type(format!(
            "cannot order {} and {}",
            a.kind(),
            b.kind()
        ))),
    }
}

// ===== Val arithmetic =====

pub fn val_add(a: &Val, b: &Val, subtract: bool) -> Result<Val, EvalError> {
    if !a.equave.strict_eq(&b.equave) {
        return Err(EvalError::Domain(
            "vals must share an equave to be added".to_owned(),
        ));
    }
    let len = a.value.component_count().max(b.value.component_count());
    let mut components = Vec::with_capacity(len);
    for i in 0..len {
        let x = a.value.exponent(i);
        let y = b.value.exponent(i);
        components.push(if subtract { x - y } else { x + y });
    }
    let value = sonicweave_monzo::TimeMonzo::from_parts(
        Rational::zero(),
        components,
        Rational::one(),
    );
    Ok(Val::new(value, a.equave.clone()))
}

pub fn val_scale(val: &Val, scalar: &Interval, divide: bool) -> Result<Val, EvalError> {
    let factor = scalar.value.to_rational().ok_or_else(|| {
        EvalError::Type("vals scale by rational amounts".to_owned())
    })?;
    if divide && factor.is_zero() {
        return Err(EvalError::Domain("division by zero".to_owned()));
    }
    let factor = if divide { factor.recip() } else { factor };
    let components: Vec<Rational> = val
        .value
        .exponents()
        .iter()
        .map(|e| e * &factor)
        .collect();
    let value =
        sonicweave_monzo::TimeMonzo::from_parts(Rational::zero(), components, Rational::one());
    Ok(Val::new(value, val.equave.clone()))
}

/// `v tmpr i`: the interval regraded to the val's equal steps.
pub fn val_temper(val: &Val, interval: &Interval) -> Result<Interval, EvalError> {
    if interval.is_absolute() {
        return Err(EvalError::Echelon(
            "only relative intervals can be tempered".to_owned(),
        ));
    }
    let Quantity::Exact(monzo) = &interval.value else {
        return Err(EvalError::Type("cannot temper a real value".to_owned()));
    };
    let steps = val.value.dot(monzo)?;
    let divisions = val.divisions()?;
    if divisions.is_zero() {
        return Err(EvalError::Domain("val maps the equave to zero".to_owned()));
    }
    let exponent = &steps / &divisions;
    let value = Quantity::Exact(val.equave.clone()).pow_rational(&exponent)?;
    let mut result = Interval::logarithmic(value);
    let numerator = i64::try_from(steps.to_integer()).ok();
    let denominator = i64::try_from(divisions.to_integer()).ok();
    if let (Some(numerator), Some(denominator), true) =
        (numerator, denominator, steps.is_integer() && divisions.is_integer())
    {
        let equave = val
            .equave
            .to_rational()
            .and_then(|r| {
                let n = i64::try_from(r.numer().clone()).ok()?;
                let d = i64::try_from(r.denom().clone()).ok()?;
                Some((n, d))
            })
            .filter(|&(n, d)| !(n == 2 && d == 1));
        result.node = Some(IntervalLiteral::Nedji(NedjiData {
            numerator,
            denominator,
            equave,
        }));
    }
    result.color = interval.color.clone();
    result.label = interval.label.clone();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonicweave_monzo::TimeMonzo;

    fn nedji(n: i64, d: i64) -> Interval {
        let value = Quantity::from_int(2)
            .pow_rational(&sonicweave_monzo::rational(n, d))
            .unwrap();
        Interval::logarithmic(value).with_node(IntervalLiteral::Nedji(NedjiData {
            numerator: n,
            denominator: d,
            equave: None,
        }))
    }

    fn integer(n: i64) -> Interval {
        Interval::linear(Quantity::from_int(n))
            .with_node(IntervalLiteral::Integer(BigInt::from(n)))
    }

    #[test]
    fn plain_addition_merges_nedji_nodes() {
        let result = interval_binary(
            BinaryOperator::Add,
            Preference::None,
            &nedji(4, 12),
            &nedji(2, 12),
        )
        .unwrap();
        assert_eq!(result.domain, Domain::Logarithmic);
        match result.node {
            Some(IntervalLiteral::Nedji(data)) => {
                assert_eq!((data.numerator, data.denominator), (6, 12));
            }
            other => panic!("expected nedji node, got {other:?}"),
        }
    }

    #[test]
    fn preference_changes_formatting_not_value() {
        let two = integer(2);
        let octave = nedji(3, 3);
        for preference in [
            Preference::None,
            Preference::Left,
            Preference::Right,
            Preference::Wings,
        ] {
            let result =
                interval_binary(BinaryOperator::Add, preference, &two, &octave).unwrap();
            assert_eq!(
                result.value.to_rational(),
                Some(sonicweave_monzo::rational(4, 1)),
                "value must not depend on preference"
            );
        }
        let left = interval_binary(BinaryOperator::Add, Preference::Left, &two, &octave).unwrap();
        assert!(matches!(left.node, Some(IntervalLiteral::Integer(_))));
        let right =
            interval_binary(BinaryOperator::Add, Preference::Right, &two, &octave).unwrap();
        match right.node {
            Some(IntervalLiteral::Nedji(data)) => {
                assert_eq!((data.numerator, data.denominator), (6, 3));
            }
            other => panic!("expected nedji node, got {other:?}"),
        }
    }

    #[test]
    fn fraction_rewrites_keep_the_preferred_denominator() {
        let value = Quantity::from_fraction(4, 3);
        let node = rewrite_fraction(&value, &BigInt::from(6)).unwrap();
        match node {
            IntervalLiteral::Fraction {
                numerator,
                denominator,
            } => {
                assert_eq!(numerator, BigInt::from(8));
                assert_eq!(denominator, BigInt::from(6));
            }
            other => panic!("expected fraction, got {other:?}"),
        }
    }

    #[test]
    fn label_infection_prefers_the_preferred_side(){
        let mut a = integer(2);
        a.label = Some("left".to_owned());
        let mut b = integer(3);
        b.label = Some("right".to_owned());
        let plain = interval_binary(BinaryOperator::Add, Preference::None, &a, &b).unwrap();
        assert_eq!(plain.label.as_deref(), Some("left"));
        let right = interval_binary(BinaryOperator::Add, Preference::Right, &a, &b).unwrap();
        assert_eq!(right.label.as_deref(), Some("right"));

        let mut unlabeled = integer(5);
        unlabeled.label = None;
        let one_sided =
            interval_binary(BinaryOperator::Add, Preference::None, &unlabeled, &b).unwrap();
        assert_eq!(one_sided.label.as_deref(), Some("right"));
    }

    #[test]
    fn tempering_produces_nedji_steps() {
        let val = Val::new(
            TimeMonzo::from_parts(
                Rational::zero(),
                vec![
                    sonicweave_monzo::integer(12),
                    sonicweave_monzo::integer(19),
                    sonicweave_monzo::integer(28),
                ],
                Rational::one(),
            ),
            TimeMonzo::from_int(2),
        );
        let fifth = Interval::linear(Quantity::from_fraction(3, 2));
        let tempered = val_temper(&val, &fifth).unwrap();
        match tempered.node {
            Some(IntervalLiteral::Nedji(data)) => {
                assert_eq!((data.numerator, data.denominator), (7, 12));
            }
            other => panic!("expected nedji node, got {other:?}"),
        }
    }
}
