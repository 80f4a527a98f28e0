//! JSON serialization of runtime values
//!
//! Intervals carry their exact value, domain, steps, metadata and the
//! formatting node as a tagged variant. Deserialization reconstructs strict
//! equality; numerators and denominators travel as decimal strings so
//! arbitrary precision survives the trip.

use num_bigint::BigInt;
use num_traits::{Num, Zero};
use serde_json::{json, Map, Value as Json};
use sonicweave_ast::{
    Accidental, DecimalFlavor, IntervalLiteral, MetricPrefix, NedjiData,
};
use sonicweave_monzo::fjs::FjsFlavor;
use sonicweave_monzo::pyth::{Pythagorean, Quality};
use sonicweave_monzo::{Quantity, Rational, TimeMonzo, TimeReal};

use crate::error::EvalError;
use crate::value::{Domain, Interval, Val, Value};

fn bad(message: impl Into<String>) -> EvalError {
    EvalError::Type(format!("malformed serialization: {}", message.into()))
}

// ===== Rationals =====

fn rational_to_json(value: &Rational) -> Json {
    json!({
        "n": value.numer().to_string(),
        "d": value.denom().to_string(),
    })
}

fn rational_from_json(json: &Json) -> Result<Rational, EvalError> {
    let n = json
        .get("n")
        .and_then(Json::as_str)
        .ok_or_else(|| bad("missing numerator"))?;
    let d = json
        .get("d")
        .and_then(Json::as_str)
        .ok_or_else(|| bad("missing denominator"))?;
    let numerator =
        BigInt::from_str_radix(n, 10).map_err(|_| bad("invalid numerator"))?;
    let denominator =
        BigInt::from_str_radix(d, 10).map_err(|_| bad("invalid denominator"))?;
    if denominator.is_zero() {
        return Err(bad("zero denominator"));
    }
    Ok(Rational::new(numerator, denominator))
}

// ===== Quantities =====

fn quantity_to_json(value: &Quantity) -> Json {
    match value {
        Quantity::Exact(monzo) => json!({
            "type": "TimeMonzo",
            "timeExponent": rational_to_json(monzo.time_exponent()),
            "primeExponents": monzo
                .exponents()
                .iter()
                .map(rational_to_json)
                .collect::<Vec<_>>(),
            "residual": rational_to_json(monzo.residual()),
        }),
        Quantity::Real(real) => json!({
            "type": "TimeReal",
            "timeExponent": real.time_exponent,
            "value": real.value,
        }),
    }
}

fn quantity_from_json(json: &Json) -> Result<Quantity, EvalError> {
    match json.get("type").and_then(Json::as_str) {
        Some("TimeMonzo") => {
            let time_exponent = rational_from_json(
                json.get("timeExponent")
                    .ok_or_else(|| bad("missing time exponent"))?,
            )?;
            let exponents = json
                .get("primeExponents")
                .and_then(Json::as_array)
                .ok_or_else(|| bad("missing prime exponents"))?
                .iter()
                .map(rational_from_json)
                .collect::<Result<Vec<_>, _>>()?;
            let residual = rational_from_json(
                json.get("residual")
                    .ok_or_else(|| bad("missing residual"))?,
            )?;
            Ok(Quantity::Exact(TimeMonzo::from_parts(
                time_exponent,
                exponents,
                residual,
            )))
        }
        Some("TimeReal") => {
            let time_exponent = json
                .get("timeExponent")
                .and_then(Json::as_f64)
                .ok_or_else(|| bad("missing time exponent"))?;
            let value = json
                .get("value")
                .and_then(Json::as_f64)
                .ok_or_else(|| bad("missing value"))?;
            Ok(Quantity::Real(TimeReal::with_time_exponent(
                value,
                time_exponent,
            )))
        }
        _ => Err(bad("unknown quantity type")),
    }
}

// ===== Literal nodes =====

fn flavor_to_json(flavor: FjsFlavor) -> Json {
    Json::String(if flavor.tag().is_empty() {
        "c".to_owned()
    } else {
        flavor.tag().to_owned()
    })
}

fn flavor_from_json(json: &Json) -> Result<FjsFlavor, EvalError> {
    json.as_str()
        .and_then(FjsFlavor::from_tag)
        .ok_or_else(|| bad("unknown flavor"))
}

fn inflections_to_json(list: &[(u64, FjsFlavor)]) -> Json {
    Json::Array(
        list.iter()
            .map(|(number, flavor)| json!([number, flavor_to_json(*flavor)]))
            .collect(),
    )
}

fn inflections_from_json(json: &Json) -> Result<Vec<(u64, FjsFlavor)>, EvalError> {
    json.as_array()
        .ok_or_else(|| bad("inflections are arrays"))?
        .iter()
        .map(|pair| {
            let items = pair.as_array().ok_or_else(|| bad("inflection pairs"))?;
            let number = items
                .first()
                .and_then(Json::as_u64)
                .ok_or_else(|| bad("inflection number"))?;
            let flavor = flavor_from_json(items.get(1).ok_or_else(|| bad("inflection flavor"))?)?;
            Ok((number, flavor))
        })
        .collect()
}

fn quality_to_json(quality: Quality) -> Json {
    Json::String(quality.to_string())
}

fn quality_from_json(json: &Json) -> Result<Quality, EvalError> {
    let text = json.as_str().ok_or_else(|| bad("quality"))?;
    match text {
        "m" => Ok(Quality::Minor),
        "n" => Ok(Quality::Neutral),
        "M" => Ok(Quality::Major),
        "P" => Ok(Quality::Perfect),
        _ if !text.is_empty() && text.chars().all(|c| c == 'a') => {
            Ok(Quality::Augmented(text.len() as u32))
        }
        _ if !text.is_empty() && text.chars().all(|c| c == 'd') => {
            Ok(Quality::Diminished(text.len() as u32))
        }
        _ => Err(bad("quality")),
    }
}

fn node_to_json(node: &IntervalLiteral) -> Json {
    let mut object = Map::new();
    object.insert("type".to_owned(), Json::String(node.tag().to_owned()));
    match node {
        IntervalLiteral::Integer(value) => {
            object.insert("value".to_owned(), Json::String(value.to_string()));
        }
        IntervalLiteral::Fraction {
            numerator,
            denominator,
        } => {
            object.insert("numerator".to_owned(), Json::String(numerator.to_string()));
            object.insert(
                "denominator".to_owned(),
                Json::String(denominator.to_string()),
            );
        }
        IntervalLiteral::Decimal { amount, flavor } => {
            object.insert("amount".to_owned(), rational_to_json(amount));
            let flavor = match flavor {
                DecimalFlavor::Exact => "e",
                DecimalFlavor::Real => "r",
                DecimalFlavor::Hertz => "z",
            };
            object.insert("flavor".to_owned(), Json::String(flavor.to_owned()));
        }
        IntervalLiteral::Cents { amount, real } => {
            object.insert("amount".to_owned(), rational_to_json(amount));
            object.insert("real".to_owned(), Json::Bool(*real));
        }
        IntervalLiteral::Cent => {}
        IntervalLiteral::Nedji(data) => {
            object.insert("numerator".to_owned(), json!(data.numerator));
            object.insert("denominator".to_owned(), json!(data.denominator));
            if let Some((n, d)) = data.equave {
                object.insert("equave".to_owned(), json!([n, d]));
            }
        }
        IntervalLiteral::Step(count) => {
            object.insert("count".to_owned(), json!(count));
        }
        IntervalLiteral::Radical { radicand, exponent } => {
            object.insert("radicand".to_owned(), rational_to_json(radicand));
            object.insert("exponent".to_owned(), rational_to_json(exponent));
        }
        IntervalLiteral::SquareSuperparticular(index) => {
            object.insert("index".to_owned(), json!(index));
        }
        IntervalLiteral::Monzo { components, basis } => {
            object.insert(
                "components".to_owned(),
                Json::Array(components.iter().map(rational_to_json).collect()),
            );
            if let Some(basis) = basis {
                object.insert(
                    "basis".to_owned(),
                    Json::Array(basis.iter().map(rational_to_json).collect()),
                );
            }
        }
        IntervalLiteral::Val { components, basis } => {
            object.insert(
                "components".to_owned(),
                Json::Array(components.iter().map(rational_to_json).collect()),
            );
            if let Some(basis) = basis {
                object.insert(
                    "basis".to_owned(),
                    Json::Array(basis.iter().map(rational_to_json).collect()),
                );
            }
        }
        IntervalLiteral::Warts {
            equave,
            divisions,
            warts,
            basis,
        } => {
            if let Some(letter) = equave {
                object.insert("equave".to_owned(), Json::String(letter.to_string()));
            }
            object.insert("divisions".to_owned(), json!(divisions));
            object.insert(
                "warts".to_owned(),
                Json::Array(
                    warts
                        .iter()
                        .map(|c| Json::String(c.to_string()))
                        .collect(),
                ),
            );
            object.insert(
                "basis".to_owned(),
                Json::Array(basis.iter().map(rational_to_json).collect()),
            );
        }
        IntervalLiteral::SparseOffsetVal {
            equave,
            divisions,
            tweaks,
            basis,
        } => {
            if let Some(letter) = equave {
                object.insert("equave".to_owned(), Json::String(letter.to_string()));
            }
            object.insert("divisions".to_owned(), json!(divisions));
            object.insert(
                "tweaks".to_owned(),
                Json::Array(
                    tweaks
                        .iter()
                        .map(|(offset, prime)| json!([offset, prime]))
                        .collect(),
                ),
            );
            object.insert(
                "basis".to_owned(),
                Json::Array(basis.iter().map(rational_to_json).collect()),
            );
        }
        IntervalLiteral::Fjs {
            ups,
            lifts,
            pythagorean,
            superscripts,
            subscripts,
        } => {
            object.insert("ups".to_owned(), json!(ups));
            object.insert("lifts".to_owned(), json!(lifts));
            object.insert("quality".to_owned(), quality_to_json(pythagorean.quality));
            object.insert("degree".to_owned(), json!(pythagorean.degree));
            object.insert("superscripts".to_owned(), inflections_to_json(superscripts));
            object.insert("subscripts".to_owned(), inflections_to_json(subscripts));
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
            object.insert("ups".to_owned(), json!(ups));
            object.insert("lifts".to_owned(), json!(lifts));
            object.insert("nominal".to_owned(), Json::String(nominal.to_string()));
            object.insert(
                "accidentals".to_owned(),
                Json::String(accidentals.iter().map(Accidental::symbol).collect()),
            );
            object.insert("octave".to_owned(), json!(octave));
            object.insert("superscripts".to_owned(), inflections_to_json(superscripts));
            object.insert("subscripts".to_owned(), inflections_to_json(subscripts));
        }
        IntervalLiteral::AspiringFjs { flavor }
        | IntervalLiteral::AspiringAbsoluteFjs { flavor } => {
            object.insert("flavor".to_owned(), flavor_to_json(*flavor));
        }
        IntervalLiteral::Hertz { prefix } | IntervalLiteral::Second { prefix } => {
            object.insert(
                "prefix".to_owned(),
                Json::String(prefix.symbol().to_owned()),
            );
        }
        IntervalLiteral::True | IntervalLiteral::False => {}
    }
    Json::Object(object)
}

fn node_from_json(json: &Json) -> Result<IntervalLiteral, EvalError> {
    let tag = json
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| bad("node tag"))?;
    let big = |key: &str| -> Result<BigInt, EvalError> {
        json.get(key)
            .and_then(Json::as_str)
            .and_then(|s| BigInt::from_str_radix(s, 10).ok())
            .ok_or_else(|| bad(format!("node field {key}")))
    };
    let int = |key: &str| -> Result<i64, EvalError> {
        json.get(key)
            .and_then(Json::as_i64)
            .ok_or_else(|| bad(format!("node field {key}")))
    };
    let rat = |key: &str| -> Result<Rational, EvalError> {
        rational_from_json(json.get(key).ok_or_else(|| bad(format!("node field {key}")))?)
    };
    let rationals = |key: &str| -> Result<Vec<Rational>, EvalError> {
        json.get(key)
            .and_then(Json::as_array)
            .ok_or_else(|| bad(format!("node field {key}")))?
            .iter()
            .map(rational_from_json)
            .collect()
    };
    match tag {
        "IntegerLiteral" => Ok(IntervalLiteral::Integer(big("value")?)),
        "FractionLiteral" => Ok(IntervalLiteral::Fraction {
            numerator: big("numerator")?,
            denominator: big("denominator")?,
        }),
        "DecimalLiteral" => {
            let flavor = match json.get("flavor").and_then(Json::as_str) {
                Some("e") => DecimalFlavor::Exact,
                Some("r") => DecimalFlavor::Real,
                Some("z") => DecimalFlavor::Hertz,
                _ => return Err(bad("decimal flavor")),
            };
            Ok(IntervalLiteral::Decimal {
                amount: rat("amount")?,
                flavor,
            })
        }
        "CentsLiteral" => Ok(IntervalLiteral::Cents {
            amount: rat("amount")?,
            real: json
                .get("real")
                .and_then(Json::as_bool)
                .unwrap_or(false),
        }),
        "CentLiteral" => Ok(IntervalLiteral::Cent),
        "NedjiLiteral" => {
            let equave = match json.get("equave").and_then(Json::as_array) {
                Some(pair) => {
                    let n = pair.first().and_then(Json::as_i64).ok_or_else(|| bad("equave"))?;
                    let d = pair.get(1).and_then(Json::as_i64).ok_or_else(|| bad("equave"))?;
                    Some((n, d))
                }
                None => None,
            };
            Ok(IntervalLiteral::Nedji(NedjiData {
                numerator: int("numerator")?,
                denominator: int("denominator")?,
                equave,
            }))
        }
        "StepLiteral" => Ok(IntervalLiteral::Step(int("count")?)),
        "RadicalLiteral" => Ok(IntervalLiteral::Radical {
            radicand: rat("radicand")?,
            exponent: rat("exponent")?,
        }),
        "SquareSuperparticular" => {
            let index = json
                .get("index")
                .and_then(Json::as_u64)
                .ok_or_else(|| bad("index"))?;
            Ok(IntervalLiteral::SquareSuperparticular(index))
        }
        "MonzoLiteral" => Ok(IntervalLiteral::Monzo {
            components: rationals("components")?,
            basis: match json.get("basis") {
                Some(_) => Some(rationals("basis")?),
                None => None,
            },
        }),
        "ValLiteral" => Ok(IntervalLiteral::Val {
            components: rationals("components")?,
            basis: match json.get("basis") {
                Some(_) => Some(rationals("basis")?),
                None => None,
            },
        }),
        "WartsLiteral" => {
            let warts = json
                .get("warts")
                .and_then(Json::as_array)
                .ok_or_else(|| bad("warts"))?
                .iter()
                .map(|w| {
                    w.as_str()
                        .and_then(|s| s.chars().next())
                        .ok_or_else(|| bad("wart letter"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(IntervalLiteral::Warts {
                equave: json
                    .get("equave")
                    .and_then(Json::as_str)
                    .and_then(|s| s.chars().next()),
                divisions: json
                    .get("divisions")
                    .and_then(Json::as_u64)
                    .ok_or_else(|| bad("divisions"))?,
                warts,
                basis: rationals("basis")?,
            })
        }
        "SparseOffsetVal" => {
            let tweaks = json
                .get("tweaks")
                .and_then(Json::as_array)
                .ok_or_else(|| bad("tweaks"))?
                .iter()
                .map(|pair| {
                    let items = pair.as_array().ok_or_else(|| bad("tweak"))?;
                    let offset = items
                        .first()
                        .and_then(Json::as_i64)
                        .ok_or_else(|| bad("tweak offset"))?;
                    let prime = items
                        .get(1)
                        .and_then(Json::as_u64)
                        .ok_or_else(|| bad("tweak prime"))?;
                    Ok((offset, prime))
                })
                .collect::<Result<Vec<_>, EvalError>>()?;
            Ok(IntervalLiteral::SparseOffsetVal {
                equave: json
                    .get("equave")
                    .and_then(Json::as_str)
                    .and_then(|s| s.chars().next()),
                divisions: json
                    .get("divisions")
                    .and_then(Json::as_u64)
                    .ok_or_else(|| bad("divisions"))?,
                tweaks,
                basis: rationals("basis")?,
            })
        }
        "FJS" => Ok(IntervalLiteral::Fjs {
            ups: int("ups")? as i32,
            lifts: int("lifts")? as i32,
            pythagorean: Pythagorean::new(
                quality_from_json(json.get("quality").ok_or_else(|| bad("quality"))?)?,
                int("degree")? as u32,
            ),
            superscripts: inflections_from_json(
                json.get("superscripts").ok_or_else(|| bad("superscripts"))?,
            )?,
            subscripts: inflections_from_json(
                json.get("subscripts").ok_or_else(|| bad("subscripts"))?,
            )?,
        }),
        "AbsoluteFJS" => {
            let accidentals = json
                .get("accidentals")
                .and_then(Json::as_str)
                .ok_or_else(|| bad("accidentals"))?
                .chars()
                .map(|c| Accidental::from_char(c).ok_or_else(|| bad("accidental")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(IntervalLiteral::AbsoluteFjs {
                ups: int("ups")? as i32,
                lifts: int("lifts")? as i32,
                nominal: json
                    .get("nominal")
                    .and_then(Json::as_str)
                    .and_then(|s| s.chars().next())
                    .ok_or_else(|| bad("nominal"))?,
                accidentals,
                octave: int("octave")? as i32,
                superscripts: inflections_from_json(
                    json.get("superscripts").ok_or_else(|| bad("superscripts"))?,
                )?,
                subscripts: inflections_from_json(
                    json.get("subscripts").ok_or_else(|| bad("subscripts"))?,
                )?,
            })
        }
        "AspiringFJS" => Ok(IntervalLiteral::AspiringFjs {
            flavor: flavor_from_json(json.get("flavor").ok_or_else(|| bad("flavor"))?)?,
        }),
        "AspiringAbsoluteFJS" => Ok(IntervalLiteral::AspiringAbsoluteFjs {
            flavor: flavor_from_json(json.get("flavor").ok_or_else(|| bad("flavor"))?)?,
        }),
        "HertzLiteral" | "SecondLiteral" => {
            let prefix = json
                .get("prefix")
                .and_then(Json::as_str)
                .and_then(MetricPrefix::from_symbol)
                .ok_or_else(|| bad("prefix"))?;
            Ok(if tag == "HertzLiteral" {
                IntervalLiteral::Hertz { prefix }
            } else {
                IntervalLiteral::Second { prefix }
            })
        }
        "TrueLiteral" => Ok(IntervalLiteral::True),
        "FalseLiteral" => Ok(IntervalLiteral::False),
        _ => Err(bad(format!("unknown node tag {tag}"))),
    }
}

// ===== Values =====

pub fn value_to_json(value: &Value) -> Result<Json, EvalError> {
    match value {
        Value::None => Ok(Json::Null),
        Value::Boolean(flag) => Ok(Json::Bool(*flag)),
        Value::Str(text) => Ok(Json::String(text.clone())),
        Value::Color(color) => Ok(json!({"type": "Color", "value": color})),
        Value::Interval(interval) => {
            let domain = match interval.domain {
                Domain::Linear => "linear",
                Domain::Logarithmic => "logarithmic",
            };
            Ok(json!({
                "type": "Interval",
                "value": quantity_to_json(&interval.value),
                "domain": domain,
                "steps": interval.steps,
                "label": interval.label,
                "trackingIds": interval.tracking_ids,
                "node": interval.node.as_ref().map(node_to_json),
                "color": interval.color,
            }))
        }
        Value::Val(val) => Ok(json!({
            "type": "Val",
            "value": quantity_to_json(&Quantity::Exact(val.value.clone())),
            "equave": quantity_to_json(&Quantity::Exact(val.equave.clone())),
            "node": val.node.as_ref().map(node_to_json),
        })),
        Value::Array(items) => Ok(Json::Array(
            items
                .iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Value::Record(entries) => {
            let mut object = Map::new();
            for (key, value) in entries {
                object.insert(key.clone(), value_to_json(value)?);
            }
            Ok(json!({"type": "Record", "entries": Json::Object(object)}))
        }
        Value::Function(_) | Value::Builtin(_) => Err(EvalError::Type(
            "functions do not serialize".to_owned(),
        )),
    }
}

pub fn value_from_json(json: &Json) -> Result<Value, EvalError> {
    match json {
        Json::Null => Ok(Value::None),
        Json::Bool(flag) => Ok(Value::Boolean(*flag)),
        Json::String(text) => Ok(Value::Str(text.clone())),
        Json::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(value_from_json)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Json::Object(_) => match json.get("type").and_then(Json::as_str) {
            Some("Color") => Ok(Value::Color(
                json.get("value")
                    .and_then(Json::as_str)
                    .ok_or_else(|| bad("color value"))?
                    .to_owned(),
            )),
            Some("Interval") => {
                let value = quantity_from_json(
                    json.get("value").ok_or_else(|| bad("interval value"))?,
                )?;
                let domain = match json.get("domain").and_then(Json::as_str) {
                    Some("linear") => Domain::Linear,
                    Some("logarithmic") => Domain::Logarithmic,
                    _ => return Err(bad("domain")),
                };
                let steps = json
                    .get("steps")
                    .and_then(Json::as_i64)
                    .ok_or_else(|| bad("steps"))?;
                let node = match json.get("node") {
                    Some(Json::Null) | None => None,
                    Some(node) => Some(node_from_json(node)?),
                };
                let tracking_ids = json
                    .get("trackingIds")
                    .and_then(Json::as_array)
                    .map(|ids| {
                        ids.iter()
                            .map(|id| id.as_u64().ok_or_else(|| bad("tracking id")))
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .transpose()?
                    .unwrap_or_default();
                Ok(Value::Interval(Interval {
                    value,
                    domain,
                    steps,
                    node,
                    color: json
                        .get("color")
                        .and_then(Json::as_str)
                        .map(str::to_owned),
                    label: json
                        .get("label")
                        .and_then(Json::as_str)
                        .map(str::to_owned),
                    tracking_ids,
                }))
            }
            Some("Val") => {
                let value = quantity_from_json(
                    json.get("value").ok_or_else(|| bad("val value"))?,
                )?;
                let equave = quantity_from_json(
                    json.get("equave").ok_or_else(|| bad("val equave"))?,
                )?;
                let (Quantity::Exact(value), Quantity::Exact(equave)) = (value, equave) else {
                    return Err(bad("vals are exact"));
                };
                let node = match json.get("node") {
                    Some(Json::Null) | None => None,
                    Some(node) => Some(node_from_json(node)?),
                };
                Ok(Value::Val(Val {
                    value,
                    equave,
                    node,
                }))
            }
            Some("Record") => {
                let entries = json
                    .get("entries")
                    .and_then(Json::as_object)
                    .ok_or_else(|| bad("record entries"))?;
                let mut record = indexmap::IndexMap::new();
                for (key, value) in entries {
                    record.insert(key.clone(), value_from_json(value)?);
                }
                Ok(Value::Record(record))
            }
            _ => Err(bad("unknown value type")),
        },
        Json::Number(_) => Err(bad("bare numbers do not deserialize")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonicweave_monzo::rational;

    #[test]
    fn interval_round_trip_preserves_strict_equality() {
        let interval = Interval::linear(Quantity::from_fraction(3, 2)).with_node(
            IntervalLiteral::Fraction {
                numerator: BigInt::from(3),
                denominator: BigInt::from(2),
            },
        );
        let json = value_to_json(&Value::Interval(interval.clone())).unwrap();
        let Value::Interval(back) = value_from_json(&json).unwrap() else {
            panic!("expected an interval");
        };
        assert!(interval.strict_eq(&back));
        assert_eq!(interval.node, back.node);
    }

    #[test]
    fn real_values_survive() {
        let interval = Interval::logarithmic(Quantity::Real(TimeReal::new(1.5)));
        let json = value_to_json(&Value::Interval(interval.clone())).unwrap();
        let Value::Interval(back) = value_from_json(&json).unwrap() else {
            panic!("expected an interval");
        };
        assert!(interval.value.strict_eq(&back.value));
    }

    #[test]
    fn nested_containers() {
        let fraction = Interval::linear(Quantity::from_fraction(5, 4));
        let array = Value::Array(vec![
            Value::Interval(fraction),
            Value::Str("third".to_owned()),
            Value::None,
        ]);
        let json = value_to_json(&array).unwrap();
        let back = value_from_json(&json).unwrap();
        assert!(crate::ops::strict_value_eq(&array, &back));
    }

    #[test]
    fn exotic_rationals_use_strings() {
        let value = rational(1, 3);
        let json = rational_to_json(&value);
        assert_eq!(json.get("n").unwrap(), "1");
        assert_eq!(json.get("d").unwrap(), "3");
        assert_eq!(rational_from_json(&json).unwrap(), value);
    }
}
