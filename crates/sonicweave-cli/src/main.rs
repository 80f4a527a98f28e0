//! Command-line interface
//!
//! Evaluates a file or an inline expression and prints the resulting scale,
//! one interval per line.

use std::path::PathBuf;
use std::process::ExitCode;

use ariadne::{Label, Report, ReportKind, Source};
use clap::Parser;
use sonicweave_eval::{value_to_json, Evaluator, Value};

#[derive(Parser)]
#[command(name = "sonicweave", about = "Evaluate sonicweave scale programs")]
struct Cli {
    /// Source file to evaluate
    file: Option<PathBuf>,

    /// Inline source text
    #[arg(short = 'e', long = "expression", conflicts_with = "file")]
    expression: Option<String>,

    /// Print the scale as JSON instead of source text
    #[arg(long)]
    json: bool,

    /// Gas budget for the evaluation
    #[arg(long, default_value_t = 1_000_000)]
    gas: i64,
}

fn report_diagnostics(name: &str, source: &str, diagnostics: &sonicweave_core::Diagnostics) {
    for diagnostic in diagnostics.iter().filter(|d| d.is_error()) {
        let report = Report::build(ReportKind::Error, name, diagnostic.span.start)
            .with_message(&diagnostic.message)
            .with_label(
                Label::new((name, diagnostic.span.to_range())).with_message(&diagnostic.message),
            )
            .finish();
        let _ = report.eprint((name, Source::from(source)));
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (name, source) = match (&cli.file, &cli.expression) {
        (Some(path), None) => match std::fs::read_to_string(path) {
            Ok(source) => (path.display().to_string(), source),
            Err(error) => {
                eprintln!("error: cannot read {}: {error}", path.display());
                return ExitCode::FAILURE;
            }
        },
        (None, Some(expression)) => ("<expression>".to_owned(), expression.clone()),
        _ => {
            eprintln!("error: provide a file or -e <expression>");
            return ExitCode::FAILURE;
        }
    };

    let (program, diagnostics) = sonicweave_parser::parse(&source);
    if diagnostics.has_errors() {
        report_diagnostics(&name, &source, &diagnostics);
        return ExitCode::FAILURE;
    }

    let mut evaluator = Evaluator::with_gas(cli.gas);
    if let Err(error) = evaluator.run_program(&program) {
        eprintln!("error: {error}");
        return ExitCode::FAILURE;
    }

    if cli.json {
        let scale = Value::Array(evaluator.current_scale().clone());
        match value_to_json(&scale) {
            Ok(json) => println!("{json}"),
            Err(error) => {
                eprintln!("error: {error}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for line in evaluator.rendered_scale() {
            println!("{line}");
        }
    }
    ExitCode::SUCCESS
}
