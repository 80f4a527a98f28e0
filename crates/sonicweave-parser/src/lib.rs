//! Parser for the sonicweave language
//!
//! Hand-written recursive descent over the lexer's tokens with a Pratt
//! expression core. Errors are collected as diagnostics; parsing synchronizes
//! at statement boundaries and keeps going.

mod error;
mod expr;
pub mod literal;
mod parser;

pub use error::{ParseError, ParseResult};
pub use parser::Parser;

use sonicweave_ast::Program;
use sonicweave_core::Diagnostics;

/// Parse a complete source text.
pub fn parse(source: &str) -> (Program, Diagnostics) {
    Parser::new(source).parse_program()
}

#[cfg(test)]
mod tests {
    use sonicweave_ast::{Expr, Statement};

    fn parse_ok(source: &str) -> sonicweave_ast::Program {
        let (program, diagnostics) = super::parse(source);
        assert!(
            !diagnostics.has_errors(),
            "unexpected diagnostics for {source:?}: {:?}",
            diagnostics.iter().collect::<Vec<_>>()
        );
        program
    }

    #[test]
    fn parses_expression_statements() {
        let program = parse_ok("3;\n4\\12 + 2\\12;");
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(
            program.statements[0].node,
            Statement::Expression(_)
        ));
    }

    #[test]
    fn parses_declarations() {
        let program = parse_ok("let x = 3/2;\nconst y = 7\\12;");
        assert!(matches!(
            program.statements[0].node,
            Statement::VariableDeclaration { mutable: true, .. }
        ));
        assert!(matches!(
            program.statements[1].node,
            Statement::VariableDeclaration { mutable: false, .. }
        ));
    }

    #[test]
    fn parses_riffs_and_loops() {
        let program = parse_ok("riff double x { x * 2; }\nfor i of [1..4] { i; }");
        assert!(matches!(
            program.statements[0].node,
            Statement::FunctionDeclaration { .. }
        ));
        assert!(matches!(program.statements[1].node, Statement::ForOf { .. }));
    }

    #[test]
    fn parses_preference_decorations() {
        use sonicweave_ast::Preference;
        let program = parse_ok("2 ~+ 3\\3; 2 +~ 3\\3; 2 ~+~ 3\\3;");
        let prefs: Vec<_> = program
            .statements
            .iter()
            .map(|s| match &s.node {
                Statement::Expression(e) => match &e.node {
                    Expr::Binary { preference, .. } => *preference,
                    other => panic!("expected binary, got {other:?}"),
                },
                other => panic!("expected expression, got {other:?}"),
            })
            .collect();
        assert_eq!(
            prefs,
            vec![Preference::Left, Preference::Right, Preference::Wings]
        );
    }

    #[test]
    fn parses_pitch_declarations() {
        let program = parse_ok("A=4 = 440 Hz = 27/16;");
        assert!(matches!(
            program.statements[0].node,
            Statement::PitchDeclaration {
                middle: Some(_),
                ..
            }
        ));
    }
}
