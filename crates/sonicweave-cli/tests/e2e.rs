//! End-to-end tests for the sonicweave CLI

use std::process::Command;

fn sonicweave_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sonicweave"))
}

fn create_temp_file(content: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::with_suffix(".sw").unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn run_expression(source: &str) -> String {
    let output = sonicweave_cmd()
        .args(["-e", source])
        .output()
        .expect("failed to execute sonicweave");
    assert!(
        output.status.success(),
        "{source:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.trim().lines().collect::<Vec<_>>().join(";")
}

// ===== Seed scenarios =====

#[test]
fn evaluates_a_bare_integer() {
    assert_eq!(run_expression("3;"), "3");
}

#[test]
fn adds_equal_divisions() {
    assert_eq!(run_expression("4\\12 + 2\\12;"), "6\\12");
}

#[test]
fn honors_the_left_preference() {
    assert_eq!(run_expression("2 ~+ 3\\3;"), "4");
}

#[test]
fn honors_the_right_preference() {
    assert_eq!(run_expression("2 +~ 3\\3;"), "6\\3");
}

#[test]
fn converts_midi_to_frequency() {
    assert_eq!(run_expression("mtof(60);"), "4685120000^1/4 * 1Hz");
}

#[test]
fn builds_a_rank_two_scale() {
    assert_eq!(
        run_expression("rank2(3/2,3); mergeOffset(5/4); rotate(4); simplify;"),
        "9/8;5/4;4/3;3/2;5/3;15/8;2"
    );
}

#[test]
fn stacks_alternating_generators() {
    assert_eq!(
        run_expression("ags([8/7, 7/6], 3);"),
        "64/63;8/7;32/27;8/6;256/189;32/21;128/81;16/9;2"
    );
}

#[test]
fn checks_constant_structure() {
    assert_eq!(run_expression("hasConstantStructure(mos(5, 2))"), "false");
}

// ===== File evaluation =====

#[test]
fn evaluates_files() {
    let file = create_temp_file("9/8;\n3/2;\n2;\n");
    let output = sonicweave_cmd()
        .arg(file.path())
        .output()
        .expect("failed to execute sonicweave");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim().lines().collect::<Vec<_>>(), ["9/8", "3/2", "2"]);
}

#[test]
fn reports_parse_errors_with_nonzero_exit() {
    let file = create_temp_file("let = ;");
    let output = sonicweave_cmd()
        .arg(file.path())
        .output()
        .expect("failed to execute sonicweave");
    assert!(!output.status.success());
}

#[test]
fn reports_runtime_errors_with_nonzero_exit() {
    let output = sonicweave_cmd()
        .args(["-e", "throw \"sour note\";"])
        .output()
        .expect("failed to execute sonicweave");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sour note"));
}

// ===== Serialization =====

#[test]
fn serializes_scales_as_json() {
    let output = sonicweave_cmd()
        .args(["-e", "3/2;2;", "--json"])
        .output()
        .expect("failed to execute sonicweave");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    let items = json.as_array().expect("scale serializes as an array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["type"], "Interval");
    assert_eq!(items[0]["domain"], "linear");
}

#[test]
fn respects_the_gas_budget() {
    let output = sonicweave_cmd()
        .args(["-e", "let i = 0;while true { i = i + 1; }", "--gas", "5000"])
        .output()
        .expect("failed to execute sonicweave");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("gas"));
}
