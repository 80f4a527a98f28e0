//! Native builtins
//!
//! Scale primitives read and write the evaluator's current scale; numeric
//! helpers work on their arguments. Derived riffs live in the prelude and
//! are written in the language itself.

use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};
use sonicweave_ast::{IntervalLiteral, NedjiData};
use sonicweave_core::intern;
use sonicweave_monzo::primes::{nth_prime, prime_index};
use sonicweave_monzo::{rational, Quantity, Rational, TimeMonzo, TimeReal};

use crate::display::{render_interval, render_value};
use crate::error::EvalError;
use crate::interp::Evaluator;
use crate::ops;
use crate::value::{Builtin, Domain, Interval, Val, Value};

macro_rules! register {
    ($evaluator:expr, $($name:literal => $function:ident),+ $(,)?) => {
        $(
            $evaluator.root_env().borrow_mut().declare(
                intern($name),
                Value::Builtin(Builtin { name: $name, run: $function }),
                false,
            );
        )+
    };
}

pub fn install(evaluator: &mut Evaluator) {
    register!(evaluator,
        "abs" => builtin_abs,
        "floor" => builtin_floor,
        "ceil" => builtin_ceil,
        "round" => builtin_round,
        "trunc" => builtin_trunc,
        "length" => builtin_length,
        "simplify" => builtin_simplify,
        "bleach" => builtin_bleach,
        "linear" => builtin_linear,
        "logarithmic" => builtin_logarithmic,
        "cents" => builtin_cents,
        "str" => builtin_str,
        "repr" => builtin_repr,
        "sort" => builtin_sort,
        "sorted" => builtin_sorted,
        "reverse" => builtin_reverse,
        "reversed" => builtin_reversed,
        "rotate" => builtin_rotate,
        "mergeOffset" => builtin_merge_offset,
        "mos" => builtin_mos,
        "hasConstantStructure" => builtin_has_constant_structure,
        "map" => builtin_map,
        "filter" => builtin_filter,
        "arrayReduce" => builtin_array_reduce,
        "track" => builtin_track,
        "wartsToVal" => builtin_warts_to_val,
        "sparseOffsetToVal" => builtin_sparse_offset_to_val,
    );

    let root = evaluator.root_env();
    {
        let mut env = root.borrow_mut();
        // The cent as a bare unit.
        let cent = Quantity::from_int(2)
            .pow_rational(&rational(1, 1200))
            .expect("the cent is exact");
        env.declare(
            intern("c"),
            Value::Interval(Interval::logarithmic(cent).with_node(IntervalLiteral::Cent)),
            false,
        );
        for (name, value) in [
            ("PI", std::f64::consts::PI),
            ("E", std::f64::consts::E),
            ("TAU", std::f64::consts::TAU),
        ] {
            env.declare(
                intern(name),
                Value::Interval(Interval::linear(Quantity::Real(TimeReal::new(value)))),
                false,
            );
        }
        for (name, color) in [
            ("black", "#000000"),
            ("white", "#ffffff"),
            ("red", "#ff0000"),
            ("green", "#008000"),
            ("blue", "#0000ff"),
            ("gray", "#808080"),
            ("silver", "#c0c0c0"),
        ] {
            env.declare(intern(name), Value::Color(color.to_owned()), false);
        }
    }
}

fn expect_interval(value: &Value) -> Result<Interval, EvalError> {
    value
        .as_interval()
        .ok_or_else(|| EvalError::Type(format!("expected an interval, got {}", value.kind())))
}

fn single(mut args: Vec<Value>, name: &str) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::Type(format!("{name} takes one argument")));
    }
    Ok(args.remove(0))
}

// ===== Numeric helpers =====

fn rounding(
    args: Vec<Value>,
    name: &str,
    exact: fn(&Rational) -> Rational,
    real: fn(f64) -> f64,
) -> Result<Value, EvalError> {
    let value = single(args, name)?;
    let interval = expect_interval(&value)?;
    let result = match interval.value.to_rational() {
        Some(fraction) => Quantity::from_rational(&exact(&fraction)),
        None => Quantity::Real(TimeReal::new(real(interval.value.value_f64()))),
    };
    let node = ops::rewrite_node(
        &IntervalLiteral::Integer(BigInt::one()),
        &result,
        interval.steps,
    );
    let mut rounded = interval;
    rounded.value = result;
    rounded.node = node;
    Ok(Value::Interval(rounded))
}

fn builtin_abs(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "abs")?;
    let mut interval = expect_interval(&value)?;
    if interval.value.is_negative() {
        interval.value = interval.value.neg();
        interval.node = None;
    }
    Ok(Value::Interval(interval))
}

fn builtin_floor(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    rounding(args, "floor", |r| r.floor(), f64::floor)
}

fn builtin_ceil(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    rounding(args, "ceil", |r| r.ceil(), f64::ceil)
}

fn builtin_round(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    rounding(args, "round", |r| r.round(), f64::round)
}

fn builtin_trunc(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    rounding(args, "trunc", |r| r.trunc(), f64::trunc)
}

fn builtin_length(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "length")?;
    let length = match &value {
        Value::Array(items) => items.len(),
        Value::Record(entries) => entries.len(),
        Value::Str(text) => text.chars().count(),
        other => {
            return Err(EvalError::Type(format!(
                "length works on containers, got {}",
                other.kind()
            )))
        }
    };
    Ok(Value::Interval(Interval::linear(Quantity::from_int(
        length as i64,
    ))))
}

fn builtin_simplify(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "simplify")?;
    match value {
        Value::Interval(interval) => Ok(Value::Interval(interval.simplified())),
        other => Ok(other),
    }
}

fn builtin_bleach(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "bleach")?;
    match value {
        Value::Interval(mut interval) => {
            interval.color = None;
            Ok(Value::Interval(interval))
        }
        other => Ok(other),
    }
}

fn builtin_linear(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "linear")?;
    let mut interval = expect_interval(&value)?;
    interval.domain = Domain::Linear;
    Ok(Value::Interval(interval))
}

fn builtin_logarithmic(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "logarithmic")?;
    let mut interval = expect_interval(&value)?;
    interval.domain = Domain::Logarithmic;
    Ok(Value::Interval(interval))
}

fn builtin_cents(_: &mut Evaluator, mut args: Vec<Value>) -> Result<Value, EvalError> {
    if args.is_empty() || args.len() > 2 {
        return Err(EvalError::Type("cents takes an interval and optional digits".to_owned()));
    }
    let digits = if args.len() == 2 {
        let digits = expect_interval(&args.pop().expect("checked length"))?;
        digits
            .value
            .to_rational()
            .filter(|r| r.is_integer())
            .and_then(|r| u32::try_from(r.to_integer()).ok())
    } else {
        None
    };
    let mut interval = expect_interval(&args.pop().expect("checked length"))?;
    interval.domain = Domain::Logarithmic;
    match digits {
        None => {
            let exact = match &interval.value {
                Quantity::Exact(monzo) => monzo.cents_fraction(),
                Quantity::Real(_) => None,
            };
            interval.node = Some(match exact {
                Some(amount) => IntervalLiteral::Cents {
                    amount,
                    real: false,
                },
                None => IntervalLiteral::Cents {
                    amount: Rational::zero(),
                    real: true,
                },
            });
        }
        Some(digits) => {
            // Snap the value to the requested precision.
            let scale = BigInt::from(10).pow(digits);
            let cents = interval.value.total_cents();
            let scaled = (cents * 10f64.powi(digits as i32)).round() as i64;
            let amount = Rational::new(BigInt::from(scaled), scale);
            let exponent = &amount / rational(1200, 1);
            interval.value = Quantity::from_int(2).pow_rational(&exponent)?;
            interval.node = Some(IntervalLiteral::Cents {
                amount,
                real: false,
            });
        }
    }
    Ok(Value::Interval(interval))
}

fn builtin_str(evaluator: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "str")?;
    let text = match &value {
        Value::Str(text) => text.clone(),
        Value::Interval(interval) => render_interval(interval, &evaluator.context),
        other => render_value(other, &evaluator.context),
    };
    Ok(Value::Str(text))
}

fn builtin_repr(evaluator: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "repr")?;
    Ok(Value::Str(render_value(&value, &evaluator.context)))
}

// ===== Scale primitives =====

fn interval_items(items: &[Value]) -> Result<Vec<Interval>, EvalError> {
    items.iter().map(expect_interval).collect()
}

fn sort_values(items: &mut [Value]) -> Result<(), EvalError> {
    // Validate up front so sorting cannot observe a type error.
    interval_items(items)?;
    items.sort_by(|a, b| {
        let a = a.as_interval().expect("validated above");
        let b = b.as_interval().expect("validated above");
        a.value.value_cmp(&b.value)
    });
    Ok(())
}

fn builtin_sort(evaluator: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    if args.is_empty() {
        let mut items = evaluator.current_scale().clone();
        sort_values(&mut items)?;
        *evaluator.current_scale_mut() = items;
        return Ok(Value::None);
    }
    builtin_sorted(evaluator, args)
}

fn builtin_sorted(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "sorted")?;
    let Value::Array(mut items) = value else {
        return Err(EvalError::Type("sorted expects an array".to_owned()));
    };
    sort_values(&mut items)?;
    Ok(Value::Array(items))
}

fn builtin_reverse(evaluator: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    if args.is_empty() {
        evaluator.current_scale_mut().reverse();
        return Ok(Value::None);
    }
    builtin_reversed(evaluator, args)
}

fn builtin_reversed(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "reversed")?;
    let Value::Array(mut items) = value else {
        return Err(EvalError::Type("reversed expects an array".to_owned()));
    };
    items.reverse();
    Ok(Value::Array(items))
}

/// Make the given scale degree the new root; degree 0 is the unison.
fn builtin_rotate(evaluator: &mut Evaluator, mut args: Vec<Value>) -> Result<Value, EvalError> {
    let degree = if args.is_empty() {
        1
    } else {
        let value = args.remove(0);
        let interval = expect_interval(&value)?;
        interval
            .value
            .to_rational()
            .filter(|r| r.is_integer())
            .and_then(|r| i64::try_from(r.to_integer()).ok())
            .ok_or_else(|| EvalError::Type("rotate takes an integer degree".to_owned()))?
    };
    let items = interval_items(evaluator.current_scale())?;
    if items.is_empty() {
        return Ok(Value::None);
    }
    let len = items.len() as i64;
    let degree = degree.rem_euclid(len);
    if degree == 0 {
        return Ok(Value::None);
    }
    let root = items[(degree - 1) as usize].clone();
    let equave = items[items.len() - 1].clone();
    let mut rotated = Vec::with_capacity(items.len());
    for interval in items.iter().skip(degree as usize) {
        rotated.push(divide(interval, &root)?);
    }
    for interval in items.iter().take(degree as usize) {
        let raised = ops::interval_binary(
            sonicweave_ast::BinaryOperator::Multiply,
            sonicweave_ast::Preference::None,
            interval,
            &equave,
        )?;
        rotated.push(divide(&raised, &root)?);
    }
    *evaluator.current_scale_mut() = rotated.into_iter().map(Value::Interval).collect();
    Ok(Value::None)
}

fn divide(a: &Interval, b: &Interval) -> Result<Interval, EvalError> {
    ops::interval_binary(
        sonicweave_ast::BinaryOperator::Fraction,
        sonicweave_ast::Preference::None,
        a,
        b,
    )
}

/// Merge offset copies of the scale; notes that overflow the equave drop.
fn builtin_merge_offset(
    evaluator: &mut Evaluator,
    args: Vec<Value>,
) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::Type("mergeOffset needs at least one offset".to_owned()));
    }
    let mut offsets = Vec::new();
    for arg in args {
        match arg {
            Value::Array(items) => offsets.extend(interval_items(&items)?),
            other => offsets.push(expect_interval(&other)?),
        }
    }
    let items = interval_items(evaluator.current_scale())?;
    let Some(equave) = items.last().cloned() else {
        return Ok(Value::None);
    };
    let unison = Interval::unity();
    let mut merged: Vec<Interval> = items[..items.len() - 1].to_vec();
    for offset in &offsets {
        let mut sources = vec![unison.clone()];
        sources.extend_from_slice(&items[..items.len() - 1]);
        for source in sources {
            let shifted = ops::interval_binary(
                sonicweave_ast::BinaryOperator::Multiply,
                sonicweave_ast::Preference::None,
                &source,
                offset,
            )?;
            let in_range = shifted.value.value_cmp(&unison.value)
                == std::cmp::Ordering::Greater
                && shifted.value.value_cmp(&equave.value) == std::cmp::Ordering::Less;
            if in_range {
                merged.push(shifted);
            }
        }
    }
    merged.sort_by(|a, b| a.value.value_cmp(&b.value));
    merged.dedup_by(|a, b| a.value.weak_eq(&b.value));
    merged.push(equave);
    *evaluator.current_scale_mut() = merged.into_iter().map(Value::Interval).collect();
    Ok(Value::None)
}

// ===== Combinatorial generators =====

/// The brightest mode of an l-large, s-small step pattern as steps of
/// (l·sizeL + s·sizeS)-edo.
fn builtin_mos(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    if args.len() < 2 || args.len() > 4 {
        return Err(EvalError::Type(
            "mos takes large and small counts with optional sizes".to_owned(),
        ));
    }
    let mut numbers = Vec::with_capacity(args.len());
    for arg in &args {
        let interval = expect_interval(arg)?;
        let number = interval
            .value
            .to_rational()
            .filter(|r| r.is_integer())
            .and_then(|r| i64::try_from(r.to_integer()).ok())
            .filter(|&n| n >= 0)
            .ok_or_else(|| EvalError::Type("mos takes whole numbers".to_owned()))?;
        numbers.push(number);
    }
    let large = numbers[0];
    let small = numbers[1];
    let size_large = numbers.get(2).copied().unwrap_or(2);
    let size_small = numbers.get(3).copied().unwrap_or(1);
    let count = large + small;
    if count == 0 {
        return Ok(Value::Array(Vec::new()));
    }
    let edo = large * size_large + small * size_small;
    let mut degrees = Vec::with_capacity(count as usize);
    let mut cursor = 0i64;
    let ceil_div = |n: i64, d: i64| (n + d - 1) / d;
    for i in 0..count {
        // Upper mechanical word: the brightest mode.
        let before = ceil_div(i * large, count);
        let after = ceil_div((i + 1) * large, count);
        let step = if after - before == 1 {
            size_large
        } else {
            size_small
        };
        cursor += step;
        let value = Quantity::from_int(2).pow_rational(&rational(cursor, edo))?;
        let interval = Interval::logarithmic(value).with_node(IntervalLiteral::Nedji(NedjiData {
            numerator: cursor,
            denominator: edo,
            equave: None,
        }));
        degrees.push(Value::Interval(interval));
    }
    Ok(Value::Array(degrees))
}

/// Interval-class spectrum check: no width may appear in two classes.
fn builtin_has_constant_structure(
    evaluator: &mut Evaluator,
    args: Vec<Value>,
) -> Result<Value, EvalError> {
    let items = if args.is_empty() {
        interval_items(evaluator.current_scale())?
    } else {
        let value = single(args, "hasConstantStructure")?;
        let Value::Array(items) = value else {
            return Err(EvalError::Type(
                "hasConstantStructure expects a scale".to_owned(),
            ));
        };
        interval_items(&items)?
    };
    let count = items.len();
    if count < 2 {
        return Ok(Value::Boolean(true));
    }
    let equave = items[count - 1].clone();
    let mut degrees = vec![Interval::unity()];
    degrees.extend(items.iter().cloned());
    let mut seen: HashMap<i64, usize> = HashMap::new();
    for class in 1..count {
        for start in 0..count {
            let target = start + class;
            let width = if target <= count {
                divide(&degrees[target], &degrees[start])?
            } else {
                let wrapped = ops::interval_binary(
                    sonicweave_ast::BinaryOperator::Multiply,
                    sonicweave_ast::Preference::None,
                    &degrees[target - count],
                    &equave,
                )?;
                divide(&wrapped, &degrees[start])?
            };
            let key = (width.total_cents() * 10_000.0).round() as i64;
            match seen.get(&key) {
                Some(&existing) if existing != class => return Ok(Value::Boolean(false)),
                _ => {
                    seen.insert(key, class);
                }
            }
        }
    }
    Ok(Value::Boolean(true))
}

// ===== Functional helpers =====

fn builtin_map(evaluator: &mut Evaluator, mut args: Vec<Value>) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::Type("map takes a function and an array".to_owned()));
    }
    let array = args.pop().expect("checked length");
    let function = args.pop().expect("checked length");
    let Value::Array(items) = array else {
        return Err(EvalError::Type("map expects an array".to_owned()));
    };
    let mut results = Vec::with_capacity(items.len());
    for item in items {
        results.push(evaluator.call_value(function.clone(), vec![item])?);
    }
    Ok(Value::Array(results))
}

fn builtin_filter(evaluator: &mut Evaluator, mut args: Vec<Value>) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::Type("filter takes a function and an array".to_owned()));
    }
    let array = args.pop().expect("checked length");
    let function = args.pop().expect("checked length");
    let Value::Array(items) = array else {
        return Err(EvalError::Type("filter expects an array".to_owned()));
    };
    let mut results = Vec::new();
    for item in items {
        if evaluator
            .call_value(function.clone(), vec![item.clone()])?
            .is_truthy()
        {
            results.push(item);
        }
    }
    Ok(Value::Array(results))
}

fn builtin_array_reduce(
    evaluator: &mut Evaluator,
    mut args: Vec<Value>,
) -> Result<Value, EvalError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvalError::Type(
            "arrayReduce takes a function, an array and an optional seed".to_owned(),
        ));
    }
    let seed = if args.len() == 3 { args.pop() } else { None };
    let array = args.pop().expect("checked length");
    let function = args.pop().expect("checked length");
    let Value::Array(items) = array else {
        return Err(EvalError::Type("arrayReduce expects an array".to_owned()));
    };
    let mut iterator = items.into_iter();
    let mut accumulator = match seed {
        Some(seed) => seed,
        None => iterator
            .next()
            .ok_or_else(|| EvalError::Type("cannot reduce an empty array".to_owned()))?,
    };
    for item in iterator {
        accumulator = evaluator.call_value(function.clone(), vec![accumulator, item])?;
    }
    Ok(accumulator)
}

fn builtin_track(evaluator: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "track")?;
    let mut interval = expect_interval(&value)?;
    let id = evaluator.fresh_tracking_id();
    interval.tracking_ids.push(id);
    Ok(Value::Interval(interval))
}

// ===== Val constructors =====

/// Expand a one-element prime basis into the full prime limit.
fn expand_basis(basis: &[Rational]) -> Result<Vec<Rational>, EvalError> {
    if basis.len() == 1 && basis[0].is_integer() {
        if let Some(limit) = basis[0].to_integer().to_u64() {
            if prime_index(limit).is_some() {
                let mut expanded = Vec::new();
                let mut index = 0;
                loop {
                    let p = nth_prime(index);
                    if p > limit {
                        break;
                    }
                    expanded.push(Rational::from_integer(BigInt::from(p)));
                    index += 1;
                }
                return Ok(expanded);
            }
        }
    }
    Ok(basis.to_vec())
}

/// The k:th closest integer to x, counting outward from the nearest.
fn kth_alternative(x: f64, k: u64) -> i64 {
    let base = x.round() as i64;
    if k == 0 {
        return base;
    }
    let direction = if x - base as f64 >= 0.0 { 1 } else { -1 };
    let magnitude = k.div_ceil(2) as i64;
    if k % 2 == 1 {
        base + direction * magnitude
    } else {
        base - direction * magnitude
    }
}

struct ValPlan {
    divisions: u64,
    equave: Option<char>,
    basis: Vec<Rational>,
}

fn patent_mappings(plan: &ValPlan) -> Result<(Vec<(usize, f64)>, TimeMonzo), EvalError> {
    let equave = match plan.equave {
        Some(letter) => {
            let index = (letter as u8 - b'a') as usize;
            Rational::from_integer(BigInt::from(nth_prime(index)))
        }
        None => plan
            .basis
            .first()
            .cloned()
            .unwrap_or_else(|| Rational::from_integer(BigInt::from(2))),
    };
    let equave_log = sonicweave_monzo::rational_log2(&equave);
    if equave_log <= 0.0 {
        return Err(EvalError::Domain("equaves exceed unity".to_owned()));
    }
    let mut mappings = Vec::with_capacity(plan.basis.len());
    for element in &plan.basis {
        if !element.is_integer() {
            return Err(EvalError::Type(
                "subgroup vals need prime bases".to_owned(),
            ));
        }
        let prime = element
            .to_integer()
            .to_u64()
            .and_then(|p| prime_index(p).map(|i| (p, i)));
        let Some((prime, index)) = prime else {
            return Err(EvalError::Type(
                "subgroup vals need prime bases".to_owned(),
            ));
        };
        let x = plan.divisions as f64 * (prime as f64).log2() / equave_log;
        mappings.push((index, x));
    }
    Ok((mappings, TimeMonzo::from_rational(&equave)))
}

fn finish_val(
    mappings: Vec<(usize, i64)>,
    equave: TimeMonzo,
) -> Val {
    let len = mappings.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
    let mut exponents = vec![Rational::zero(); len];
    for (index, mapping) in mappings {
        exponents[index] = Rational::from_integer(BigInt::from(mapping));
    }
    let value = TimeMonzo::from_parts(Rational::zero(), exponents, Rational::one());
    Val::new(value, equave)
}

/// Bit-exact constructor for warts notation.
pub fn val_from_literal(node: &IntervalLiteral) -> Result<Val, EvalError> {
    match node {
        IntervalLiteral::Warts {
            equave,
            divisions,
            warts,
            basis,
        } => {
            let plan = ValPlan {
                divisions: *divisions,
                equave: *equave,
                basis: expand_basis(basis)?,
            };
            let (raw, equave_monzo) = patent_mappings(&plan)?;
            let mut adjustments: HashMap<usize, u64> = HashMap::new();
            for wart in warts {
                let index = (*wart as u8 - b'a') as usize;
                *adjustments.entry(index).or_default() += 1;
            }
            let mut mappings = Vec::with_capacity(raw.len());
            for (index, x) in raw {
                let count = adjustments.get(&index).copied().unwrap_or(0);
                mappings.push((index, kth_alternative(x, count)));
            }
            Ok(finish_val(mappings, equave_monzo))
        }
        IntervalLiteral::SparseOffsetVal {
            equave,
            divisions,
            tweaks,
            basis,
        } => {
            let plan = ValPlan {
                divisions: *divisions,
                equave: *equave,
                basis: expand_basis(basis)?,
            };
            let (raw, equave_monzo) = patent_mappings(&plan)?;
            let mut offsets: HashMap<usize, i64> = HashMap::new();
            for (offset, prime) in tweaks {
                let index = prime_index(*prime).ok_or_else(|| {
                    EvalError::Type("tweaks target primes".to_owned())
                })?;
                *offsets.entry(index).or_default() += offset;
            }
            let mut mappings = Vec::with_capacity(raw.len());
            for (index, x) in raw {
                let offset = offsets.get(&index).copied().unwrap_or(0);
                mappings.push((index, x.round() as i64 + offset));
            }
            Ok(finish_val(mappings, equave_monzo))
        }
        _ => Err(EvalError::Type("not a val literal".to_owned())),
    }
}

fn builtin_warts_to_val(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "wartsToVal")?;
    let Value::Str(text) = value else {
        return Err(EvalError::Type("wartsToVal parses a string".to_owned()));
    };
    let node = sonicweave_parser::literal::parse_warts(&text, sonicweave_core::Span::dummy())
        .map_err(|e| EvalError::Parse(e.to_string()))?;
    let val = val_from_literal(&node)?;
    Ok(Value::Val(Val {
        node: Some(node),
        ..val
    }))
}

fn builtin_sparse_offset_to_val(_: &mut Evaluator, args: Vec<Value>) -> Result<Value, EvalError> {
    let value = single(args, "sparseOffsetToVal")?;
    let Value::Str(text) = value else {
        return Err(EvalError::Type(
            "sparseOffsetToVal parses a string".to_owned(),
        ));
    };
    let node =
        sonicweave_parser::literal::parse_sparse_offset(&text, sonicweave_core::Span::dummy())
            .map_err(|e| EvalError::Parse(e.to_string()))?;
    let val = val_from_literal(&node)?;
    Ok(Value::Val(Val {
        node: Some(node),
        ..val
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternatives_walk_outward() {
        // x = 4.3: nearest 4, then 5 (the side of the fraction), then 3.
        assert_eq!(kth_alternative(4.3, 0), 4);
        assert_eq!(kth_alternative(4.3, 1), 5);
        assert_eq!(kth_alternative(4.3, 2), 3);
        // x = 4.7 rounds to 5; the fraction is negative.
        assert_eq!(kth_alternative(4.7, 0), 5);
        assert_eq!(kth_alternative(4.7, 1), 4);
        assert_eq!(kth_alternative(4.7, 2), 6);
    }

    #[test]
    fn warts_construct_patent_and_adjusted_vals() {
        let node = sonicweave_parser::literal::parse_warts(
            "12@2.3.5",
            sonicweave_core::Span::dummy(),
        )
        .unwrap();
        let val = val_from_literal(&node).unwrap();
        assert_eq!(val.value.exponent(0), rational(12, 1));
        assert_eq!(val.value.exponent(1), rational(19, 1));
        assert_eq!(val.value.exponent(2), rational(28, 1));

        // 17c moves the mapping of 5 to the second-nearest integer.
        let node = sonicweave_parser::literal::parse_warts(
            "17c@2.3.5",
            sonicweave_core::Span::dummy(),
        )
        .unwrap();
        let val = val_from_literal(&node).unwrap();
        let patent = sonicweave_parser::literal::parse_warts(
            "17@2.3.5",
            sonicweave_core::Span::dummy(),
        )
        .unwrap();
        let patent = val_from_literal(&patent).unwrap();
        assert_eq!(patent.value.exponent(2), rational(39, 1));
        assert_eq!(val.value.exponent(2), rational(40, 1));
    }
}
