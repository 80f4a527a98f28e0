//! Shared infrastructure for the sonicweave crates

mod diagnostics;
mod intern;
mod span;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use intern::{intern, intern_string, InternedStr};
pub use span::{Span, Spanned};
