//! End-to-end evaluation tests

use sonicweave_eval::{evaluate_source, value_from_json, value_to_json, Evaluator, Value};

fn scale(source: &str) -> Vec<String> {
    evaluate_source(source).unwrap_or_else(|e| panic!("evaluation of {source:?} failed: {e}"))
}

fn joined(source: &str) -> String {
    scale(source).join(";")
}

// ===== Literal evaluation =====

#[test]
fn integers_print_as_themselves() {
    assert_eq!(joined("3;"), "3");
}

#[test]
fn fractions_keep_their_spelling() {
    assert_eq!(joined("3/2;"), "3/2");
    assert_eq!(joined("6/4;"), "6/4");
}

#[test]
fn nedji_and_cents_literals() {
    assert_eq!(joined("7\\12;"), "7\\12");
    assert_eq!(joined("6\\13<3>;"), "6\\13<3>");
    assert_eq!(joined("701.955;"), "701.955");
    assert_eq!(joined("1.955c;"), "1.955");
}

#[test]
fn monzo_and_fjs_literals() {
    assert_eq!(joined("[-4 4 -1>;"), "[-4 4 -1>");
    assert_eq!(joined("M3^5;"), "M3^5");
    assert_eq!(joined("A4;"), "A4");
    assert_eq!(joined("S9;"), "S9");
}

#[test]
fn hertz_literals_survive_multiplication() {
    assert_eq!(joined("440 Hz;"), "440 Hz");
    assert_eq!(joined("2 * 440 Hz;"), "880 Hz");
}

// ===== The preference protocol =====

#[test]
fn plain_addition_merges_nedji() {
    assert_eq!(joined("4\\12 + 2\\12;"), "6\\12");
}

#[test]
fn left_preference_keeps_integer_formatting() {
    assert_eq!(joined("2 ~+ 3\\3;"), "4");
}

#[test]
fn right_preference_rewrites_the_nedji() {
    assert_eq!(joined("2 +~ 3\\3;"), "6\\3");
}

#[test]
fn preference_never_changes_the_value() {
    for source in ["2 + 3\\3;", "2 ~+ 3\\3;", "2 +~ 3\\3;", "2 ~+~ 3\\3;"] {
        let mut evaluator = Evaluator::new();
        evaluator.run_source(source).unwrap();
        let Some(Value::Interval(interval)) = evaluator.current_scale().first() else {
            panic!("expected an interval from {source:?}");
        };
        assert_eq!(
            interval.value.to_rational(),
            Some(sonicweave_monzo::rational(4, 1)),
            "{source:?} must evaluate to 4"
        );
    }
}

#[test]
fn fraction_preservation_through_addition() {
    // A common factor does not collapse the preferred denominator.
    assert_eq!(joined("1/4 ~+ 1/4;"), "2/4");
}

// ===== Scale accumulation =====

#[test]
fn arrays_extend_the_scale() {
    assert_eq!(joined("[9/8, 3/2];2;"), "9/8;3/2;2");
}

#[test]
fn strings_label_and_colors_paint_the_last_interval() {
    let mut evaluator = Evaluator::new();
    evaluator
        .run_source("3/2;\"fifth\";#ff0000;")
        .unwrap();
    let Some(Value::Interval(interval)) = evaluator.current_scale().first() else {
        panic!("expected an interval");
    };
    assert_eq!(interval.label.as_deref(), Some("fifth"));
    assert_eq!(interval.color.as_deref(), Some("#ff0000"));
}

#[test]
fn functions_map_over_the_scale() {
    assert_eq!(joined("16/8;simplify;"), "2");
}

#[test]
fn blocks_merge_into_the_parent_scale() {
    assert_eq!(joined("9/8;{3/2;2;}"), "9/8;3/2;2");
}

#[test]
fn harmonic_segments_and_chords() {
    assert_eq!(joined("4::8;"), "5/4;6/4;7/4;8/4");
    assert_eq!(joined("4:5:6;"), "5/4;6/4");
}

#[test]
fn ranges_and_comprehensions() {
    assert_eq!(joined("[1..4];"), "1;2;3;4");
    assert_eq!(joined("[1,3..7];"), "1;3;5;7");
    assert_eq!(joined("[i * 2 for i of [1..3]];"), "2;4;6");
}

// ===== Control flow =====

#[test]
fn loops_and_conditionals() {
    assert_eq!(
        joined("let i = 0;while i < 3 { i = i + 1; i; }"),
        "1;2;3"
    );
    assert_eq!(joined("if 1 < 2 { 3/2; } else { 4/3; }"), "3/2");
}

#[test]
fn riffs_return_their_scale() {
    assert_eq!(joined("riff pair { 9/8; 3/2; }\npair();"), "9/8;3/2");
}

#[test]
fn arrow_functions_close_over_their_environment() {
    assert_eq!(
        joined("let factor = 3;\nlet triple = x => x * factor;\ntriple(2);"),
        "6"
    );
}

#[test]
fn lest_recovers_from_errors() {
    assert_eq!(joined("(1 % 0) lest 3;"), "3");
}

#[test]
fn throw_unwinds_to_the_top() {
    let error = evaluate_source("throw \"no thanks\";").unwrap_err();
    assert!(error.to_string().contains("no thanks"));
}

// ===== Standard library scenarios =====

#[test]
fn midi_to_frequency() {
    assert_eq!(joined("mtof(60);"), "4685120000^1/4 * 1Hz");
}

#[test]
fn rank2_with_offset_rotation_and_simplify() {
    assert_eq!(
        joined("rank2(3/2,3); mergeOffset(5/4); rotate(4); simplify;"),
        "9/8;5/4;4/3;3/2;5/3;15/8;2"
    );
}

#[test]
fn alternating_generator_sequences() {
    assert_eq!(
        joined("ags([8/7, 7/6], 3);"),
        "64/63;8/7;32/27;8/6;256/189;32/21;128/81;16/9;2"
    );
}

#[test]
fn diatonic_in_twelve_edo_is_not_cs() {
    assert_eq!(joined("hasConstantStructure(mos(5, 2))"), "false");
}

#[test]
fn edo_generates_every_degree() {
    assert_eq!(joined("edo(4);"), "1\\4;2\\4;3\\4;4\\4");
}

// ===== Vals =====

#[test]
fn val_literals_and_mapping() {
    assert_eq!(joined("<12 19 28] dot 3/2;"), "7");
    assert_eq!(joined("12@2.3.5 dot 3/2;"), "7");
}

#[test]
fn tempering_renders_nedji_steps() {
    assert_eq!(joined("12@2.3.5 tmpr 3/2;"), "7\\12");
}

// ===== Round-trips =====

#[test]
fn rendered_scales_reparse_to_strict_equality() {
    for source in [
        "3;",
        "3/2;",
        "7\\12;",
        "[-4 4 -1>;",
        "M3^5;",
        "701.955;",
        "4\\12 + 2\\12;",
        "2 +~ 3\\3;",
        "440 Hz;",
        "S9;",
    ] {
        let mut first = Evaluator::new();
        first.run_source(source).unwrap();
        let rendered = first.rendered_scale().join(";") + ";";
        let mut second = Evaluator::new();
        second.run_source(&rendered).unwrap();
        let a = first.current_scale();
        let b = second.current_scale();
        assert_eq!(a.len(), b.len(), "{source:?} changed length");
        for (x, y) in a.iter().zip(b.iter()) {
            let (Value::Interval(x), Value::Interval(y)) = (x, y) else {
                panic!("expected intervals from {source:?}");
            };
            assert!(
                x.strict_eq(y),
                "{source:?} rendered as {rendered:?} which is not strictly equal"
            );
        }
    }
}

#[test]
fn serialization_round_trips_the_scale() {
    let mut evaluator = Evaluator::new();
    evaluator
        .run_source("rank2(3/2,3); mergeOffset(5/4); rotate(4);")
        .unwrap();
    let scale = Value::Array(evaluator.current_scale().clone());
    let json = value_to_json(&scale).unwrap();
    let text = serde_json::to_string(&json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let back = value_from_json(&parsed).unwrap();
    let (Value::Array(original), Value::Array(restored)) = (&scale, &back) else {
        panic!("expected arrays");
    };
    assert_eq!(original.len(), restored.len());
    for (x, y) in original.iter().zip(restored.iter()) {
        let (Value::Interval(x), Value::Interval(y)) = (x, y) else {
            panic!("expected intervals");
        };
        assert!(x.strict_eq(y));
    }
}

// ===== Domains and simplification =====

#[test]
fn domain_conversions_preserve_value() {
    let mut evaluator = Evaluator::new();
    evaluator
        .run_source("linear(logarithmic(3/2)); logarithmic(linear(7\\12));")
        .unwrap();
    let items = evaluator.current_scale();
    let Value::Interval(first) = &items[0] else {
        panic!("expected an interval");
    };
    assert_eq!(
        first.value.to_rational(),
        Some(sonicweave_monzo::rational(3, 2))
    );
    let Value::Interval(second) = &items[1] else {
        panic!("expected an interval");
    };
    assert!((second.total_cents() - 700.0).abs() < 1e-9);
}

// ===== Context declarations =====

#[test]
fn pitch_declarations_anchor_frequencies() {
    assert_eq!(joined("1/1 = 440 Hz;\nA4;"), "A4");
    let mut evaluator = Evaluator::new();
    evaluator.run_source("A=4 = 440 Hz = 27/16;").unwrap();
    // The unison frequency lives on the context, not the scale.
    let unison = evaluator.context.unison_frequency.as_ref().unwrap();
    let expected = sonicweave_monzo::Quantity::from_fraction(7040, 27)
        .mul(&sonicweave_monzo::Quantity::Exact(
            sonicweave_monzo::TimeMonzo::hertz(),
        ));
    assert!(unison.weak_eq(&expected));
}

#[test]
fn up_declarations_change_the_up_value() {
    let mut evaluator = Evaluator::new();
    evaluator.run_source("^ = 81/80;\n^M3;").unwrap();
    let Some(Value::Interval(interval)) = evaluator.current_scale().first() else {
        panic!("expected an interval");
    };
    // An up major third with ^ = 81/80 lands on 5/4 times 81/64... the up
    // multiplies the Pythagorean third by the syntonic comma.
    assert_eq!(
        interval.value.to_rational(),
        Some(sonicweave_monzo::rational(6561, 5120))
    );
}

// ===== Resource bounds =====

#[test]
fn gas_runs_out_on_infinite_loops() {
    let mut evaluator = Evaluator::with_gas(10_000);
    let error = evaluator
        .run_source("let i = 0;while true { i = i + 1; }")
        .unwrap_err();
    assert!(matches!(error, sonicweave_eval::EvalError::OutOfGas));
}
