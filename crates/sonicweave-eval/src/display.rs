//! Rendering of runtime values
//!
//! Interval text is driven by the formatting node when one is present and
//! re-derived from the value otherwise. Aspiring FJS nodes consult the
//! current context, so a scale printed after an up declaration reflects the
//! new up value.

use itertools::Itertools;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use sonicweave_ast::{DecimalFlavor, IntervalLiteral};
use sonicweave_monzo::fjs::{uninflect, FjsFlavor};
use sonicweave_monzo::pyth::{Pythagorean, Quality, NOMINALS};
use sonicweave_monzo::{Quantity, Rational, TimeMonzo};

use crate::context::RootContext;
use crate::value::{Domain, Interval, Val, Value};

/// Exact decimal expansion; `None` when the denominator is not 10-smooth.
pub fn decimal_expansion(value: &Rational) -> Option<String> {
    if !crate::ops::is_ten_smooth(value.denom()) {
        return None;
    }
    let mut twos = 0u32;
    let mut fives = 0u32;
    let mut denominator = value.denom().clone();
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    while (&denominator % &two).is_zero() {
        denominator /= &two;
        twos += 1;
    }
    while (&denominator % &five).is_zero() {
        denominator /= &five;
        fives += 1;
    }
    let places = twos.max(fives);
    let scale = BigInt::from(10).pow(places) / value.denom();
    let scaled = value.numer() * scale;
    let negative = scaled.is_negative();
    let digits = scaled.abs().to_string();
    let mut text = String::new();
    if negative {
        text.push('-');
    }
    if places == 0 {
        text.push_str(&digits);
        return Some(text);
    }
    let places = places as usize;
    if digits.len() <= places {
        text.push_str("0.");
        for _ in 0..places - digits.len() {
            text.push('0');
        }
        text.push_str(&digits);
    } else {
        let (whole, fraction) = digits.split_at(digits.len() - places);
        text.push_str(whole);
        text.push('.');
        text.push_str(fraction);
    }
    Some(text)
}

fn render_big_fraction(numerator: &BigInt, denominator: &BigInt) -> String {
    if denominator.is_one() {
        numerator.to_string()
    } else {
        format!("{numerator}/{denominator}")
    }
}

fn render_rational(value: &Rational) -> String {
    render_big_fraction(value.numer(), value.denom())
}

fn render_basis(basis: &[Rational]) -> String {
    basis.iter().map(render_rational).join(".")
}

fn render_arrows(symbol_up: char, symbol_down: char, count: i32) -> String {
    let symbol = if count >= 0 { symbol_up } else { symbol_down };
    std::iter::repeat(symbol)
        .take(count.unsigned_abs() as usize)
        .collect()
}

fn render_inflections(
    superscripts: &[(u64, FjsFlavor)],
    subscripts: &[(u64, FjsFlavor)],
) -> String {
    let mut text = String::new();
    for (number, flavor) in superscripts {
        text.push('^');
        text.push_str(&number.to_string());
        text.push_str(flavor.tag());
    }
    for (number, flavor) in subscripts {
        text.push('_');
        text.push_str(&number.to_string());
        text.push_str(flavor.tag());
    }
    text
}

/// Cents text always keeps a decimal point so it re-parses as cents.
fn cents_text(amount: &Rational) -> Option<String> {
    let mut text = decimal_expansion(amount)?;
    if !text.contains('.') {
        text.push('.');
    }
    Some(text)
}

fn real_cents_text(cents: f64) -> String {
    let mut text = format!("{cents}");
    if !text.contains('.') {
        text.push('.');
    }
    text.push_str("rc");
    text
}

/// The time-exponent tail of a default absolute rendering: ` * 1Hz`, ` * 1s^2`.
fn unit_tail(time_exponent: &Rational) -> String {
    let (unit, magnitude) = if time_exponent.is_negative() {
        ("Hz", -time_exponent.clone())
    } else {
        ("s", time_exponent.clone())
    };
    if magnitude.is_one() {
        format!(" * 1{unit}")
    } else {
        format!(" * 1{unit}^{}", render_rational(&magnitude))
    }
}

fn quality_sharps(quality: Quality) -> Option<i64> {
    match quality {
        Quality::Perfect | Quality::Major => Some(0),
        Quality::Minor => Some(-1),
        Quality::Neutral => None,
        Quality::Augmented(count) => Some(count as i64),
        Quality::Diminished(count) => Some(-(count as i64)),
    }
}

/// Spell an interval above C4 as nominal + accidentals + octave.
fn spell_absolute(pythagorean: &Pythagorean, is_perfect_class: bool) -> Option<String> {
    let degree = pythagorean.degree;
    if degree == 0 {
        return None;
    }
    let step = ((degree - 1) % 7) as usize;
    let octave = 4 + (degree - 1) / 7;
    let mut sharps = quality_sharps(pythagorean.quality)?;
    // Diminished imperfect degrees sit one more apotome below major.
    if matches!(pythagorean.quality, Quality::Diminished(_)) && !is_perfect_class {
        sharps -= 1;
    }
    let mut text = String::new();
    text.push(NOMINALS[step]);
    if sharps > 0 {
        for _ in 0..sharps {
            text.push('#');
        }
    } else {
        for _ in 0..-sharps {
            text.push('b');
        }
    }
    text.push_str(&octave.to_string());
    Some(text)
}

/// Try to spell a value in FJS against the current context.
fn render_aspiring(
    interval: &Interval,
    flavor: FjsFlavor,
    absolute: bool,
    context: &RootContext,
) -> Option<String> {
    let mut value = interval.value.clone();
    let mut ups = 0i32;
    if interval.steps != 0 {
        if context.up.steps != 0 && interval.steps % context.up.steps == 0 {
            ups = i32::try_from(interval.steps / context.up.steps).ok()?;
            for _ in 0..ups.unsigned_abs() {
                value = if ups > 0 {
                    value.div(&context.up.value).ok()?
                } else {
                    value.mul(&context.up.value)
                };
            }
        } else {
            return None;
        }
    }
    if absolute {
        if !value.is_relative() {
            let frequency = context.unison_frequency.as_ref()?;
            value = value.div(frequency).ok()?;
        }
        value = value.div(&context.c4).ok()?;
    }
    let Quantity::Exact(monzo) = value else {
        return None;
    };
    let (pythagorean, superscripts, subscripts) = uninflect(&monzo, flavor)?;
    let superscripts: Vec<_> = superscripts.into_iter().map(|p| (p, flavor)).collect();
    let subscripts: Vec<_> = subscripts.into_iter().map(|p| (p, flavor)).collect();
    let mut text = render_arrows('^', 'v', ups);
    if absolute {
        let step = ((pythagorean.degree.checked_sub(1)?) % 7) as usize;
        let perfect_class = matches!(step, 0 | 3 | 4);
        text.push_str(&spell_absolute(&pythagorean, perfect_class)?);
    } else {
        text.push_str(&pythagorean.to_string());
    }
    text.push_str(&render_inflections(&superscripts, &subscripts));
    Some(text)
}

fn render_node(
    node: &IntervalLiteral,
    interval: &Interval,
    context: &RootContext,
) -> Option<String> {
    match node {
        IntervalLiteral::Integer(value) => Some(value.to_string()),
        IntervalLiteral::Fraction {
            numerator,
            denominator,
        } => Some(format!("{numerator}/{denominator}")),
        IntervalLiteral::Decimal { amount, flavor } => match flavor {
            DecimalFlavor::Exact => {
                let mut text = decimal_expansion(amount)?;
                if !text.contains('.') {
                    text.push('.');
                }
                text.push('e');
                Some(text)
            }
            DecimalFlavor::Real => {
                let value = interval.value.value_f64();
                Some(format!("{value}r"))
            }
            DecimalFlavor::Hertz => {
                let mut text = decimal_expansion(amount)?;
                if !text.contains('.') {
                    text.push('.');
                }
                text.push('z');
                Some(text)
            }
        },
        IntervalLiteral::Cents { amount, real } => {
            if *real {
                Some(real_cents_text(interval.value.total_cents()))
            } else {
                cents_text(amount)
            }
        }
        IntervalLiteral::Cent => Some("¢".to_owned()),
        IntervalLiteral::Nedji(data) => {
            let mut text = format!("{}\\{}", data.numerator, data.denominator);
            if let Some((numerator, denominator)) = data.equave {
                if denominator == 1 {
                    text.push_str(&format!("<{numerator}>"));
                } else {
                    text.push_str(&format!("<{numerator}/{denominator}>"));
                }
            }
            Some(text)
        }
        IntervalLiteral::Step(steps) => Some(format!("{steps}\\")),
        IntervalLiteral::Radical { radicand, exponent } => {
            if !radicand.is_integer() {
                return None;
            }
            Some(format!(
                "{}^{}",
                radicand.numer(),
                render_rational(exponent)
            ))
        }
        IntervalLiteral::SquareSuperparticular(index) => Some(format!("S{index}")),
        IntervalLiteral::Monzo { components, basis } => {
            let body = components.iter().map(render_rational).join(" ");
            let mut text = format!("[{body}>");
            if let Some(basis) = basis {
                text.push('@');
                text.push_str(&render_basis(basis));
            }
            Some(text)
        }
        IntervalLiteral::Val { components, basis } => {
            let body = components.iter().map(render_rational).join(" ");
            let mut text = format!("<{body}]");
            if let Some(basis) = basis {
                text.push('@');
                text.push_str(&render_basis(basis));
            }
            Some(text)
        }
        IntervalLiteral::Warts {
            equave,
            divisions,
            warts,
            basis,
        } => {
            let mut text = String::new();
            if let Some(letter) = equave {
                text.push(*letter);
            }
            text.push_str(&divisions.to_string());
            text.extend(warts.iter());
            text.push('@');
            text.push_str(&render_basis(basis));
            Some(text)
        }
        IntervalLiteral::SparseOffsetVal {
            equave,
            divisions,
            tweaks,
            basis,
        } => {
            let mut text = String::new();
            if let Some(letter) = equave {
                text.push(*letter);
            }
            text.push_str(&divisions.to_string());
            text.push('[');
            let mut first = true;
            for (offset, prime) in tweaks {
                if !first {
                    text.push(',');
                }
                first = false;
                let arrows = render_arrows('^', 'v', *offset as i32);
                text.push_str(&arrows);
                text.push_str(&prime.to_string());
            }
            text.push(']');
            text.push('@');
            text.push_str(&render_basis(basis));
            Some(text)
        }
        IntervalLiteral::Fjs {
            ups,
            lifts,
            pythagorean,
            superscripts,
            subscripts,
        } => {
            let mut text = render_arrows('/', '\\', *lifts);
            text.push_str(&render_arrows('^', 'v', *ups));
            text.push_str(&pythagorean.to_string());
            text.push_str(&render_inflections(superscripts, subscripts));
            Some(text)
        }
        IntervalLiteral::AbsoluteFjs {
            ups,
            lifts,
            nominal,
            accidentals,
            octave,
            superscripts,
            subscripts,
        } => {
            let mut text = render_arrows('/', '\\', *lifts);
            text.push_str(&render_arrows('^', 'v', *ups));
            text.push(*nominal);
            for accidental in accidentals {
                text.push(accidental.symbol());
            }
            text.push_str(&octave.to_string());
            text.push_str(&render_inflections(superscripts, subscripts));
            Some(text)
        }
        IntervalLiteral::AspiringFjs { flavor } => {
            render_aspiring(interval, *flavor, false, context)
        }
        IntervalLiteral::AspiringAbsoluteFjs { flavor } => {
            render_aspiring(interval, *flavor, true, context)
        }
        IntervalLiteral::Hertz { prefix } | IntervalLiteral::Second { prefix } => {
            let unit = match node {
                IntervalLiteral::Hertz { .. } => "Hz",
                _ => "s",
            };
            let factor = Quantity::from_rational(&prefix.factor());
            let magnitude = interval.value.div(&factor).ok()?;
            let text = match magnitude.to_rational() {
                Some(fraction) => render_rational(&fraction),
                None => {
                    let value = magnitude.value_f64();
                    format!("{value}r")
                }
            };
            Some(format!("{text} {}{unit}", prefix.symbol()))
        }
        IntervalLiteral::True => Some("true".to_owned()),
        IntervalLiteral::False => Some("false".to_owned()),
    }
}

fn default_monzo_render(monzo: &TimeMonzo) -> Option<String> {
    if !monzo.residual().is_one() || !monzo.time_exponent().is_zero() {
        return None;
    }
    let body = monzo.exponents().iter().map(render_rational).join(" ");
    Some(format!("[{body}>"))
}

fn default_render(interval: &Interval, _context: &RootContext) -> String {
    match &interval.value {
        Quantity::Real(real) => {
            if interval.domain == Domain::Logarithmic {
                real_cents_text(real.total_cents())
            } else if real.time_exponent != 0.0 {
                let tail = unit_tail(&Rational::from_integer(BigInt::from(
                    real.time_exponent as i64,
                )));
                format!("{}r{tail}", real.value)
            } else {
                format!("{}r", real.value)
            }
        }
        Quantity::Exact(monzo) => {
            let tail = if monzo.time_exponent().is_zero() {
                String::new()
            } else {
                unit_tail(monzo.time_exponent())
            };
            // Pure step counts print as such.
            if interval.steps != 0 && monzo.is_unity() && tail.is_empty() {
                return format!("{}\\", interval.steps);
            }
            let relative = monzo
                .clone()
                .with_time_exponent(Rational::zero());
            if interval.domain == Domain::Logarithmic && tail.is_empty() {
                if let Some(amount) = relative.cents_fraction() {
                    if let Some(text) = cents_text(&amount) {
                        let mut text = text;
                        if interval.steps != 0 {
                            text = format!("{}\\ + {text}", interval.steps);
                        }
                        return text;
                    }
                }
                if let Some(text) = default_monzo_render(&relative) {
                    let mut text = text;
                    if interval.steps != 0 {
                        text = format!("{}\\ + {text}", interval.steps);
                    }
                    return text;
                }
                return real_cents_text(relative.total_cents());
            }
            if let Some(fraction) = relative.to_rational() {
                return format!("{}{tail}", render_rational(&fraction));
            }
            if let Some((radicand, degree)) = relative.radical_parts() {
                if radicand.is_integer() && !radicand.is_negative() {
                    return format!("{}^1/{degree}{tail}", radicand.numer());
                }
            }
            match default_monzo_render(&relative) {
                Some(text) => format!("{text}{tail}"),
                None => {
                    let value = relative.value_f64();
                    format!("{value}r{tail}")
                }
            }
        }
    }
}

pub fn render_interval(interval: &Interval, context: &RootContext) -> String {
    if let Some(node) = &interval.node {
        if let Some(text) = render_node(node, interval, context) {
            return text;
        }
    }
    default_render(interval, context)
}

pub fn render_val(val: &Val, context: &RootContext) -> String {
    if let Some(node) = &val.node {
        let as_interval = Interval::linear(Quantity::Exact(val.value.clone()));
        if let Some(text) = render_node(node, &as_interval, context) {
            return text;
        }
    }
    let body = val.value.exponents().iter().map(render_rational).join(" ");
    format!("<{body}]")
}

/// Repr-style rendering used by the CLI and error payloads.
pub fn render_value(value: &Value, context: &RootContext) -> String {
    match value {
        Value::None => "niente".to_owned(),
        Value::Boolean(true) => "true".to_owned(),
        Value::Boolean(false) => "false".to_owned(),
        Value::Interval(interval) => render_interval(interval, context),
        Value::Val(val) => render_val(val, context),
        Value::Color(color) => color.clone(),
        Value::Str(text) => format!("{text:?}"),
        Value::Array(items) => {
            let body = items.iter().map(|item| render_value(item, context)).join(", ");
            format!("[{body}]")
        }
        Value::Record(entries) => {
            let body = entries
                .iter()
                .map(|(key, value)| format!("{key}: {}", render_value(value, context)))
                .join(", ");
            format!("{{{body}}}")
        }
        Value::Function(closure) => format!("{closure:?}"),
        Value::Builtin(builtin) => format!("{builtin:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonicweave_monzo::rational;

    #[test]
    fn decimal_expansions() {
        assert_eq!(decimal_expansion(&rational(6, 5)).unwrap(), "1.2");
        assert_eq!(decimal_expansion(&rational(140391, 200)).unwrap(), "701.955");
        assert_eq!(decimal_expansion(&rational(3, 1)).unwrap(), "3");
        assert_eq!(decimal_expansion(&rational(1, 3)), None);
        assert_eq!(decimal_expansion(&rational(-1, 4)).unwrap(), "-0.25");
    }

    #[test]
    fn default_rendering_of_radicals() {
        let context = RootContext::default();
        let value = Quantity::from_int(2)
            .pow_rational(&rational(1, 2))
            .unwrap();
        let interval = Interval::linear(value);
        assert_eq!(render_interval(&interval, &context), "2^1/2");
    }

    #[test]
    fn default_rendering_of_absolute_values() {
        let context = RootContext::default();
        let hertz = Quantity::Exact(TimeMonzo::hertz());
        let value = Quantity::from_int(440).mul(&hertz);
        let interval = Interval::linear(value);
        assert_eq!(render_interval(&interval, &context), "440 * 1Hz");
    }

    #[test]
    fn aspiring_fjs_renders_against_the_context() {
        let context = RootContext::default();
        let five_over_four = Interval::linear(Quantity::from_fraction(5, 4)).with_node(
            IntervalLiteral::AspiringFjs {
                flavor: FjsFlavor::Formal,
            },
        );
        assert_eq!(render_interval(&five_over_four, &context), "M3^5");
    }
}
