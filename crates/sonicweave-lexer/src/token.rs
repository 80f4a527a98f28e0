//! Token definitions
//!
//! Numeric literals keep their raw text; the parser unpacks the payload.
//! Notation-heavy forms (FJS, absolute pitches, warts, sparse-offset vals)
//! lex as single tokens because their superscripts would otherwise collide
//! with the exponentiation operator.

use logos::Logos;

fn text(lex: &mut logos::Lexer<TokenKind>) -> String {
    lex.slice().to_owned()
}

#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum TokenKind {
    // ===== Keywords =====
    #[token("let")]
    Let,

    #[token("const")]
    Const,

    #[token("riff")]
    Riff,

    #[token("fn")]
    Fn,

    #[token("while")]
    While,

    #[token("for")]
    For,

    #[token("of")]
    Of,

    #[token("in")]
    In,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("return")]
    Return,

    #[token("throw")]
    Throw,

    #[token("break")]
    Break,

    #[token("continue")]
    Continue,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("niente")]
    Niente,

    #[token("not")]
    Not,

    #[token("and")]
    And,

    #[token("or")]
    Or,

    #[token("lest")]
    Lest,

    // ===== Named operators =====
    #[token("mod")]
    Mod,

    #[token("modc")]
    ModCeiling,

    #[token("rd")]
    Reduce,

    #[token("rdc")]
    ReduceCeiling,

    #[token("dot")]
    #[token("·")]
    Dot,

    #[token("tns")]
    #[token("⊗")]
    Tensor,

    #[token("ed")]
    Ed,

    #[token("tmpr")]
    Tempered,

    #[token("to")]
    To,

    #[token("by")]
    By,

    #[token("max")]
    Max,

    #[token("min")]
    Min,

    // ===== Punctuation and symbolic operators =====
    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token("<")]
    Less,

    #[token(">")]
    Greater,

    #[token("<=")]
    LessEquals,

    #[token(">=")]
    GreaterEquals,

    #[token("===")]
    StrictEquals,

    #[token("!==")]
    NotStrictEquals,

    #[token("==")]
    Equals,

    #[token("!=")]
    NotEquals,

    #[token("=")]
    Assign,

    #[token("=>")]
    Arrow,

    #[token("+")]
    Plus,

    #[token("++")]
    Increment,

    #[token("--")]
    Decrement,

    #[token("-")]
    #[token("−")]
    Minus,

    #[token("*")]
    #[token("×")]
    Star,

    #[token("%")]
    #[token("÷")]
    Percent,

    #[token("/")]
    #[token("∕")]
    Slash,

    #[token("\\")]
    Backslash,

    #[token("^")]
    Caret,

    #[token("v", priority = 3)]
    DownCaret,

    #[token("/^")]
    Recipropower,

    #[token("/_")]
    LogDivide,

    #[token("/+")]
    #[token("⊕")]
    LensAdd,

    #[token("/-")]
    #[token("⊖")]
    LensSub,

    #[token("~")]
    Tilde,

    #[token("??")]
    Nullish,

    #[token("?")]
    Question,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token("::")]
    DoubleColon,

    #[token("..")]
    Range,

    #[token("...")]
    #[token("…")]
    Spread,

    #[token("@")]
    At,

    /// Subgroup basis on monzo and val literals: `@2.3.5`, `@7/5.11/3`
    #[regex(r"@[0-9]+(/[0-9]+)?(\.[0-9]+(/[0-9]+)?)*", text)]
    BasisAnnotation(String),

    #[token("$$")]
    ParentScale,

    #[token("$")]
    Dollar,

    #[token("\n")]
    Newline,

    // ===== Literals =====
    /// `3`, `1_000_000`
    #[regex(r"[0-9][0-9_]*", text)]
    Integer(String),

    /// Decimals and cents: `1.2e`, `3.14r`, `701.955`, `1.955c`, `600c`,
    /// `123.4rc`, `1.2z`
    #[regex(r"[0-9][0-9_]*\.[0-9]*([eE][+-]?[0-9]+)?(r[c¢]?|[ze¢c])?", text)]
    #[regex(r"[0-9][0-9_]*(r[c¢]?|[ze¢c])", text)]
    Decimal(String),

    /// The cent unit: `c` would collide with identifiers, `¢` does not.
    #[token("¢")]
    Cent,

    /// `S9`
    #[regex(r"S[0-9]+", text, priority = 3)]
    SquareSuperparticular(String),

    /// `17c@2.3.5.7`, `b13@3`, `12@7/5.11/3`
    #[regex(r"[a-z]?[0-9]+[a-z]*@[0-9]+(/[0-9]+)?(\.[0-9]+(/[0-9]+)?)*", text)]
    Warts(String),

    /// `17[^5,v3]@2.3.5`
    #[regex(r"[a-z]?[0-9]+\[[\^v0-9,\+\-]*\]@[0-9]+(/[0-9]+)?(\.[0-9]+(/[0-9]+)?)*", text)]
    SparseOffsetVal(String),

    /// Relative FJS with optional leading ups/downs: `M3`, `vm6_11`, `^n3`,
    /// `aa4`, `dd5^5h`
    #[regex(r"[\^v]*(?:[mnMP]|a+|d+)[0-9]+([\^_][0-9]+[a-z]*)*", text, priority = 3)]
    Fjs(String),

    /// Absolute FJS: `A4`, `Bb5^7`, `C#3`, `E=5`
    #[regex(r"[\^v]*[A-G][#xb♯♭=]*-?[0-9]+([\^_][0-9]+[a-z]*)*", text, priority = 3)]
    AbsoluteFjs(String),

    /// `"label"` or `'label'`
    #[regex(r#""[^"]*""#, text)]
    #[regex(r"'[^']*'", text)]
    String(String),

    /// `#ff00aa`
    #[regex(r"#[0-9a-fA-F]+", text)]
    Color(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", text, priority = 2)]
    Identifier(String),

    Error,
    Eof,
}

impl TokenKind {
    /// True for tokens that end a statement.
    pub fn is_terminator(&self) -> bool {
        matches!(self, TokenKind::Semicolon | TokenKind::Newline | TokenKind::Eof)
    }
}
