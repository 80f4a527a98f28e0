//! Tokenizer for the sonicweave language

mod lexer;
mod token;

pub use lexer::{Lexer, Token};
pub use token::TokenKind;
