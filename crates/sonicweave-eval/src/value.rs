//! Runtime values

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use sonicweave_ast::{Expr, IntervalLiteral, Param, Statement};
use sonicweave_core::{InternedStr, Spanned};
use sonicweave_monzo::{Quantity, TimeMonzo};

use crate::env::Env;
use crate::error::EvalError;
use crate::interp::Evaluator;

/// Opaque CSS color.
pub type Color = String;

/// Interpretation of an interval's value under arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Domain {
    /// Multiplicative: `+` adds the underlying numbers.
    Linear,
    /// Additive: `+` stacks pitches (multiplies the underlying values).
    Logarithmic,
}

/// A pitch quantity with formatting metadata.
#[derive(Clone, Debug)]
pub struct Interval {
    pub value: Quantity,
    pub domain: Domain,
    /// Orthogonal equal-step component, written `7\`.
    pub steps: i64,
    pub node: Option<IntervalLiteral>,
    pub color: Option<Color>,
    pub label: Option<String>,
    pub tracking_ids: Vec<u64>,
}

impl Interval {
    pub fn linear(value: Quantity) -> Self {
        Self::new(value, Domain::Linear)
    }

    pub fn logarithmic(value: Quantity) -> Self {
        Self::new(value, Domain::Logarithmic)
    }

    pub fn new(value: Quantity, domain: Domain) -> Self {
        Self {
            value,
            domain,
            steps: 0,
            node: None,
            color: None,
            label: None,
            tracking_ids: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: IntervalLiteral) -> Self {
        self.node = Some(node);
        self
    }

    pub fn unity() -> Self {
        Self::linear(Quantity::unity())
    }

    /// Booleans become 0/1-valued intervals in arithmetic.
    pub fn from_bool(value: bool) -> Self {
        let node = if value {
            IntervalLiteral::True
        } else {
            IntervalLiteral::False
        };
        Self::linear(if value {
            Quantity::unity()
        } else {
            Quantity::zero()
        })
        .with_node(node)
    }

    /// Identical value, steps and domain; formatting is a rendering choice
    /// and never part of identity.
    pub fn strict_eq(&self, other: &Self) -> bool {
        self.steps == other.steps && self.value.strict_eq(&other.value)
    }

    pub fn weak_eq(&self, other: &Self) -> bool {
        self.steps == other.steps && self.value.weak_eq(&other.value)
    }

    pub fn total_cents(&self) -> f64 {
        self.value.total_cents()
    }

    pub fn is_absolute(&self) -> bool {
        !self.value.is_relative()
    }

    /// Strip formatting, color and label.
    pub fn simplified(&self) -> Self {
        Self {
            value: self.value.clone(),
            domain: self.domain,
            steps: self.steps,
            node: None,
            color: None,
            label: None,
            tracking_ids: self.tracking_ids.clone(),
        }
    }
}

/// A cologarithmic mapping from intervals to steps.
#[derive(Clone, Debug)]
pub struct Val {
    pub value: TimeMonzo,
    pub equave: TimeMonzo,
    pub node: Option<IntervalLiteral>,
}

impl Val {
    pub fn new(value: TimeMonzo, equave: TimeMonzo) -> Self {
        Self {
            value,
            equave,
            node: None,
        }
    }

    /// Divisions of the equave: the val applied to its own equave.
    pub fn divisions(&self) -> Result<sonicweave_monzo::Rational, EvalError> {
        Ok(self.value.dot(&self.equave)?)
    }
}

/// Body of a user function.
#[derive(Clone, Debug)]
pub enum FunctionBody {
    Expression(Rc<Spanned<Expr>>),
    Block(Rc<Vec<Spanned<Statement>>>),
}

/// Closure capturing its defining environment.
#[derive(Clone)]
pub struct Closure {
    pub name: Option<InternedStr>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub env: Rc<RefCell<Env>>,
}

impl std::fmt::Debug for Closure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name {
            Some(name) => write!(f, "<riff {name}>"),
            None => write!(f, "<arrow function>"),
        }
    }
}

/// Native function.
pub type BuiltinFn = fn(&mut Evaluator, Vec<Value>) -> Result<Value, EvalError>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub run: BuiltinFn,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    None,
    Boolean(bool),
    Interval(Interval),
    Val(Val),
    Color(Color),
    Str(String),
    Array(Vec<Value>),
    Record(IndexMap<String, Value>),
    Function(Rc<Closure>),
    Builtin(Builtin),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "niente",
            Value::Boolean(_) => "boolean",
            Value::Interval(_) => "interval",
            Value::Val(_) => "val",
            Value::Color(_) => "color",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
            Value::Function(_) => "function",
            Value::Builtin(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Boolean(value) => *value,
            Value::Interval(interval) => !interval.value.is_zero(),
            Value::Str(text) => !text.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Record(entries) => !entries.is_empty(),
            _ => true,
        }
    }

    /// Upcast booleans for arithmetic.
    pub fn as_interval(&self) -> Option<Interval> {
        match self {
            Value::Interval(interval) => Some(interval.clone()),
            Value::Boolean(value) => Some(Interval::from_bool(*value)),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_))
    }
}
