//! The expression and statement visitors
//!
//! The statement visitor owns the current scale and the environment chain;
//! expressions are evaluated eagerly and every AST visit charges gas.

use std::cell::RefCell;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};
use sonicweave_ast::{
    ArrayElement, AssignmentTarget, BinaryOperator, DecimalFlavor, Expr, IntervalLiteral,
    Param, Preference, Program, Statement, UnaryOperator,
};
use sonicweave_core::Spanned;
use sonicweave_monzo::fjs;
use sonicweave_monzo::pyth::AbsolutePitch;
use sonicweave_monzo::{rational, Quantity, Rational, TimeMonzo, TimeReal};

use crate::builtins;
use crate::context::{Inflection, RootContext};
use crate::display::{render_interval, render_value};
use crate::env::Env;
use crate::error::EvalError;
use crate::ops;
use crate::value::{Closure, Domain, FunctionBody, Interval, Val, Value};

/// Non-local control flow of statements.
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Evaluator {
    pub context: RootContext,
    env: Rc<RefCell<Env>>,
    /// Stack of scales: the top is `$`, the one below `$$`.
    scales: Vec<Vec<Value>>,
    next_tracking_id: u64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        let env = Rc::new(RefCell::new(Env::new()));
        let mut evaluator = Self {
            context: RootContext::default(),
            env,
            scales: vec![Vec::new()],
            next_tracking_id: 1,
        };
        builtins::install(&mut evaluator);
        evaluator.load_prelude();
        evaluator
    }

    pub fn with_gas(gas: i64) -> Self {
        let mut evaluator = Self::new();
        evaluator.context = RootContext::new(gas);
        evaluator
    }

    fn load_prelude(&mut self) {
        let (program, diagnostics) = sonicweave_parser::parse(sonicweave_stdlib::PRELUDE);
        debug_assert!(!diagnostics.has_errors(), "prelude must parse");
        // The prelude may not fail either; a broken install is a build bug.
        self.run_program(&program)
            .expect("prelude must evaluate");
        self.current_scale_mut().clear();
    }

    pub(crate) fn root_env(&self) -> Rc<RefCell<Env>> {
        self.env.clone()
    }

    // ===== Scale plumbing =====

    pub fn current_scale(&self) -> &Vec<Value> {
        self.scales.last().expect("a scale is always in scope")
    }

    pub fn current_scale_mut(&mut self) -> &mut Vec<Value> {
        self.scales.last_mut().expect("a scale is always in scope")
    }

    pub fn parent_scale(&self) -> Option<&Vec<Value>> {
        let len = self.scales.len();
        if len >= 2 {
            self.scales.get(len - 2)
        } else {
            None
        }
    }

    pub fn rendered_scale(&self) -> Vec<String> {
        self.current_scale()
            .iter()
            .map(|item| match item {
                Value::Interval(interval) => render_interval(interval, &self.context),
                other => render_value(other, &self.context),
            })
            .collect()
    }

    // ===== Entry points =====

    pub fn run_source(&mut self, source: &str) -> Result<(), EvalError> {
        let (program, diagnostics) = sonicweave_parser::parse(source);
        if diagnostics.has_errors() {
            let message = diagnostics
                .iter()
                .filter(|d| d.is_error())
                .map(|d| d.message.clone())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(EvalError::Parse(message));
        }
        self.run_program(&program)
    }

    pub fn run_program(&mut self, program: &Program) -> Result<(), EvalError> {
        for statement in &program.statements {
            match self.execute_statement(statement)? {
                Flow::Normal => {}
                Flow::Break | Flow::Continue => {
                    return Err(EvalError::Type(
                        "break and continue belong inside loops".to_owned(),
                    ))
                }
                Flow::Return(_) => {
                    return Err(EvalError::Type(
                        "return belongs inside a function".to_owned(),
                    ))
                }
            }
        }
        Ok(())
    }

    // ===== Statements =====

    fn execute_statement(&mut self, statement: &Spanned<Statement>) -> Result<Flow, EvalError> {
        self.context.spend(1)?;
        match &statement.node {
            Statement::Expression(expr) => {
                let value = self.eval_expr(expr)?;
                self.accumulate(value)?;
                Ok(Flow::Normal)
            }
            Statement::VariableDeclaration {
                name,
                value,
                mutable,
            } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                self.env.borrow_mut().declare(*name, value, *mutable);
                Ok(Flow::Normal)
            }
            Statement::Assignment { target, value } => {
                let value = self.eval_expr(value)?;
                self.assign(target, value)?;
                Ok(Flow::Normal)
            }
            Statement::PitchDeclaration {
                left,
                middle,
                right,
            } => {
                self.pitch_declaration(left, middle.as_ref(), right)?;
                Ok(Flow::Normal)
            }
            Statement::UpDeclaration { value } => {
                let interval = self.expect_interval(value)?;
                self.context.up = Inflection {
                    value: interval.value,
                    steps: interval.steps,
                };
                Ok(Flow::Normal)
            }
            Statement::LiftDeclaration { value } => {
                let interval = self.expect_interval(value)?;
                self.context.lift = Inflection {
                    value: interval.value,
                    steps: interval.steps,
                };
                Ok(Flow::Normal)
            }
            Statement::Block(statements) => {
                self.scales.push(Vec::new());
                let parent_env = self.env.clone();
                self.env = Rc::new(RefCell::new(Env::with_parent(parent_env.clone())));
                let mut flow = Flow::Normal;
                let mut error = None;
                for statement in statements {
                    match self.execute_statement(statement) {
                        Ok(Flow::Normal) => {}
                        Ok(other) => {
                            flow = other;
                            break;
                        }
                        Err(e) => {
                            error = Some(e);
                            break;
                        }
                    }
                }
                self.env = parent_env;
                let inner = self.scales.pop().expect("block scale was pushed");
                if let Some(error) = error {
                    return Err(error);
                }
                self.current_scale_mut().extend(inner);
                Ok(flow)
            }
            Statement::While { test, body } => {
                loop {
                    self.context.spend(1)?;
                    if !self.eval_expr(test)?.is_truthy() {
                        break;
                    }
                    match self.execute_statement(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::ForOf {
                variable,
                iterable,
                body,
            } => {
                let items = self.iterable_items(iterable)?;
                let parent_env = self.env.clone();
                for item in items {
                    self.context.spend(1)?;
                    self.env = Rc::new(RefCell::new(Env::with_parent(parent_env.clone())));
                    self.env.borrow_mut().declare(*variable, item, true);
                    let result = self.execute_statement(body);
                    self.env = parent_env.clone();
                    match result? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.execute_statement(consequent)
                } else if let Some(alternate) = alternate {
                    self.execute_statement(alternate)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::FunctionDeclaration { name, params, body } => {
                let closure = Closure {
                    name: Some(*name),
                    params: params.clone(),
                    body: FunctionBody::Block(Rc::new(body.clone())),
                    env: self.env.clone(),
                };
                self.env
                    .borrow_mut()
                    .declare(*name, Value::Function(Rc::new(closure)), true);
                Ok(Flow::Normal)
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
            Statement::Throw(expr) => {
                let payload = self.eval_expr(expr)?;
                Err(EvalError::Thrown(match payload {
                    Value::Str(text) => text,
                    other => render_value(&other, &self.context),
                }))
            }
            Statement::Break => Ok(Flow::Break),
            Statement::Continue => Ok(Flow::Continue),
        }
    }

    /// The scale-accumulation protocol for expression statements.
    fn accumulate(&mut self, value: Value) -> Result<(), EvalError> {
        match value {
            Value::Interval(_) | Value::Val(_) => {
                self.current_scale_mut().push(value);
            }
            Value::Boolean(flag) => {
                self.current_scale_mut()
                    .push(Value::Interval(Interval::from_bool(flag)));
            }
            Value::Array(items) => {
                self.current_scale_mut().extend(items);
            }
            Value::Str(label) => {
                if let Some(Value::Interval(interval)) = self.current_scale_mut().last_mut() {
                    interval.label = Some(label);
                }
            }
            Value::Color(color) => {
                if let Some(Value::Interval(interval)) = self.current_scale_mut().last_mut() {
                    interval.color = Some(color);
                }
            }
            Value::None => {}
            Value::Function(_) | Value::Builtin(_) => {
                let items = self.current_scale().clone();
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    mapped.push(self.call_value(value.clone(), vec![item])?);
                }
                *self.current_scale_mut() = mapped;
            }
            Value::Record(_) => {}
        }
        Ok(())
    }

    fn assign(&mut self, target: &AssignmentTarget, value: Value) -> Result<(), EvalError> {
        match target {
            AssignmentTarget::Name(name) => self.env.borrow_mut().assign(*name, value),
            AssignmentTarget::Index { object, index } => {
                let index_value = self.eval_expr(index)?;
                match &object.node {
                    Expr::Identifier(name) => {
                        let current = self
                            .env
                            .borrow()
                            .lookup(name)
                            .ok_or_else(|| EvalError::Lookup(name.to_string()))?;
                        let updated = set_indexed(current, &index_value, value)?;
                        self.env.borrow_mut().assign(*name, updated)
                    }
                    Expr::CurrentScale => {
                        let position =
                            resolve_index(&index_value, self.current_scale().len())?;
                        self.current_scale_mut()[position] = value;
                        Ok(())
                    }
                    _ => Err(EvalError::Type(
                        "only named arrays and the scale support element assignment".to_owned(),
                    )),
                }
            }
        }
    }

    fn expect_interval(&mut self, expr: &Spanned<Expr>) -> Result<Interval, EvalError> {
        let value = self.eval_expr(expr)?;
        value
            .as_interval()
            .ok_or_else(|| EvalError::Type(format!("expected an interval, got {}", value.kind())))
    }

    /// `A4 = 440 Hz` and `A4 = 440 Hz = 27/16`: anchor the unison frequency
    /// and, in the three-part form, C4 as well.
    fn pitch_declaration(
        &mut self,
        left: &Spanned<Expr>,
        middle: Option<&Spanned<Expr>>,
        right: &Spanned<Expr>,
    ) -> Result<(), EvalError> {
        if matches!(left.node, Expr::CurrentScale | Expr::ParentScale) {
            return Err(EvalError::Type(
                "the current scale is a read-only alias".to_owned(),
            ));
        }
        let reference = self.expect_interval(left)?;
        if reference.is_absolute() {
            return Err(EvalError::Echelon(
                "the left side of a pitch declaration is relative".to_owned(),
            ));
        }
        match middle {
            None => {
                let frequency = self.expect_interval(right)?;
                if !frequency.is_absolute() {
                    return Err(EvalError::Echelon(
                        "pitch declarations need a frequency".to_owned(),
                    ));
                }
                let unison = frequency.value.div(&reference.value)?;
                self.context.unison_frequency = Some(unison);
            }
            Some(middle) => {
                let frequency = self.expect_interval(middle)?;
                if !frequency.is_absolute() {
                    return Err(EvalError::Echelon(
                        "pitch declarations need a frequency".to_owned(),
                    ));
                }
                let ratio = self.expect_interval(right)?;
                if ratio.is_absolute() {
                    return Err(EvalError::Echelon(
                        "the mapped ratio is relative".to_owned(),
                    ));
                }
                self.context.unison_frequency = Some(frequency.value.div(&ratio.value)?);
                let c4 = self
                    .context
                    .c4
                    .mul(&ratio.value)
                    .div(&reference.value)?;
                self.context.c4 = c4;
            }
        }
        Ok(())
    }

    fn iterable_items(&mut self, expr: &Spanned<Expr>) -> Result<Vec<Value>, EvalError> {
        let value = self.eval_expr(expr)?;
        match value {
            Value::Array(items) => Ok(items),
            Value::Record(entries) => Ok(entries.into_iter().map(|(_, v)| v).collect()),
            Value::Str(text) => Ok(text
                .chars()
                .map(|c| Value::Str(c.to_string()))
                .collect()),
            other => Err(EvalError::Type(format!(
                "cannot iterate over {}",
                other.kind()
            ))),
        }
    }

    // ===== Expressions =====

    pub fn eval_expr(&mut self, expr: &Spanned<Expr>) -> Result<Value, EvalError> {
        self.context.spend(1)?;
        match &expr.node {
            Expr::Literal(node) => self.literal_value(node),
            Expr::String(text) => Ok(Value::Str(text.clone())),
            Expr::Color(color) => Ok(Value::Color(color.clone())),
            Expr::None => Ok(Value::None),
            Expr::Identifier(name) => self
                .env
                .borrow()
                .lookup(name)
                .ok_or_else(|| EvalError::Lookup(name.to_string())),
            Expr::CurrentScale => Ok(Value::Array(self.current_scale().clone())),
            Expr::ParentScale => Ok(Value::Array(
                self.parent_scale().cloned().unwrap_or_default(),
            )),
            Expr::Binary {
                op,
                preference,
                left,
                right,
            } => self.eval_binary(*op, *preference, left, right),
            Expr::Unary {
                op,
                uniform,
                operand,
            } => self.eval_unary(*op, *uniform, operand),
            Expr::Call { callee, args } => {
                let callee = self.eval_expr(callee)?;
                let args = self.eval_arguments(args)?;
                self.call_value(callee, args)
            }
            Expr::ArrowFunction { params, body } => Ok(Value::Function(Rc::new(Closure {
                name: None,
                params: params.clone(),
                body: FunctionBody::Expression(Rc::new((**body).clone())),
                env: self.env.clone(),
            }))),
            Expr::Array(elements) => Ok(Value::Array(self.eval_arguments(elements)?)),
            Expr::Record(entries) => {
                let mut record = indexmap::IndexMap::new();
                for (key, value) in entries {
                    record.insert(key.clone(), self.eval_expr(value)?);
                }
                Ok(Value::Record(record))
            }
            Expr::Range { start, second, end } => self.eval_range(start, second.as_deref(), end),
            Expr::HarmonicSegment { root, end } => self.eval_segment(root, end),
            Expr::EnumeratedChord { intervals } => self.eval_chord(intervals),
            Expr::NedjiProjection {
                numerator,
                denominator,
                equave,
            } => self.eval_nedji(numerator, denominator, equave.as_deref()),
            Expr::Steps(count) => {
                let count = self.expect_integer(count)?;
                let mut interval = Interval::logarithmic(Quantity::unity());
                interval.steps = count;
                interval.node = Some(IntervalLiteral::Step(count));
                Ok(Value::Interval(interval))
            }
            Expr::Access {
                object,
                index,
                nullish,
            } => self.eval_access(object, index, *nullish),
            Expr::Slice {
                object,
                start,
                second,
                end,
            } => self.eval_slice(object, start.as_deref(), second.as_deref(), end.as_deref()),
            Expr::Condition {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.eval_expr(consequent)
                } else {
                    self.eval_expr(alternate)
                }
            }
            Expr::Comprehension {
                expr: body,
                variable,
                iterable,
                test,
            } => {
                let items = self.iterable_items(iterable)?;
                let parent_env = self.env.clone();
                let mut results = Vec::new();
                for item in items {
                    self.context.spend(1)?;
                    self.env = Rc::new(RefCell::new(Env::with_parent(parent_env.clone())));
                    self.env.borrow_mut().declare(*variable, item, true);
                    let keep = match test {
                        Some(test) => self.eval_expr(test)?.is_truthy(),
                        None => true,
                    };
                    let result = if keep {
                        Some(self.eval_expr(body)?)
                    } else {
                        None
                    };
                    self.env = parent_env.clone();
                    if let Some(result) = result {
                        results.push(result);
                    }
                }
                Ok(Value::Array(results))
            }
        }
    }

    fn eval_arguments(&mut self, elements: &[ArrayElement]) -> Result<Vec<Value>, EvalError> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            let value = self.eval_expr(&element.expr)?;
            if element.spread {
                match value {
                    Value::Array(items) => values.extend(items),
                    other => {
                        return Err(EvalError::Type(format!(
                            "cannot spread {}",
                            other.kind()
                        )))
                    }
                }
            } else {
                values.push(value);
            }
        }
        Ok(values)
    }

    fn eval_binary(
        &mut self,
        op: BinaryOperator,
        preference: Preference,
        left: &Spanned<Expr>,
        right: &Spanned<Expr>,
    ) -> Result<Value, EvalError> {
        if op.is_lazy() {
            return match op {
                BinaryOperator::And => {
                    let lhs = self.eval_expr(left)?;
                    if lhs.is_truthy() {
                        self.eval_expr(right)
                    } else {
                        Ok(lhs)
                    }
                }
                BinaryOperator::Or => {
                    let lhs = self.eval_expr(left)?;
                    if lhs.is_truthy() {
                        Ok(lhs)
                    } else {
                        self.eval_expr(right)
                    }
                }
                BinaryOperator::Nullish => {
                    let lhs = self.eval_expr(left)?;
                    if matches!(lhs, Value::None) {
                        self.eval_expr(right)
                    } else {
                        Ok(lhs)
                    }
                }
                BinaryOperator::Lest => match self.eval_expr(left) {
                    Ok(value) => Ok(value),
                    Err(_) => self.eval_expr(right),
                },
                _ => unreachable!("lazy operator list is exhaustive"),
            };
        }
        let lhs = self.eval_expr(left)?;
        let rhs = self.eval_expr(right)?;
        self.apply_binary(op, preference, lhs, rhs)
    }

    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOperator,
        preference: Preference,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, EvalError> {
        use BinaryOperator::*;
        match op {
            StrictEquals => return Ok(Value::Boolean(ops::strict_value_eq(&lhs, &rhs))),
            NotStrictEquals => return Ok(Value::Boolean(!ops::strict_value_eq(&lhs, &rhs))),
            Equals => return Ok(Value::Boolean(ops::weak_value_eq(&lhs, &rhs))),
            NotEquals => return Ok(Value::Boolean(!ops::weak_value_eq(&lhs, &rhs))),
            Less | LessEquals | Greater | GreaterEquals => {
                let ordering = ops::compare_values(&lhs, &rhs)?;
                let result = match op {
                    Less => ordering == std::cmp::Ordering::Less,
                    LessEquals => ordering != std::cmp::Ordering::Greater,
                    Greater => ordering == std::cmp::Ordering::Greater,
                    _ => ordering != std::cmp::Ordering::Less,
                };
                return Ok(Value::Boolean(result));
            }
            Of | NotOf | WeakOf | NotWeakOf => {
                let Value::Array(items) = &rhs else {
                    return Err(EvalError::Type(format!(
                        "membership tests search arrays, got {}",
                        rhs.kind()
                    )));
                };
                let strict = matches!(op, Of | NotOf);
                let found = items.iter().any(|item| {
                    if strict {
                        ops::strict_value_eq(&lhs, item)
                    } else {
                        ops::weak_value_eq(&lhs, item)
                    }
                });
                let negated = matches!(op, NotOf | NotWeakOf);
                return Ok(Value::Boolean(found != negated));
            }
            In | NotIn | WeakIn | NotWeakIn => {
                let found = match (&lhs, &rhs) {
                    (Value::Str(key), Value::Record(entries)) => entries.contains_key(key),
                    (_, Value::Array(items)) => match lhs.as_interval() {
                        Some(interval) => interval
                            .value
                            .to_rational()
                            .and_then(|r| r.is_integer().then(|| r.to_integer()))
                            .and_then(|i| i64::try_from(i).ok())
                            .map(|i| {
                                let len = items.len() as i64;
                                (0..len).contains(&i) || (-len..0).contains(&i)
                            })
                            .unwrap_or(false),
                        None => false,
                    },
                    _ => {
                        return Err(EvalError::Type(format!(
                            "key membership needs an array or record, got {}",
                            rhs.kind()
                        )))
                    }
                };
                let negated = matches!(op, NotIn | NotWeakIn);
                return Ok(Value::Boolean(found != negated));
            }
            _ => {}
        }

        // Broadcast arithmetic over arrays.
        match (&lhs, &rhs) {
            (Value::Array(items), Value::Array(others)) if op == Tensor => {
                let mut rows = Vec::with_capacity(items.len());
                for item in items {
                    let mut row = Vec::with_capacity(others.len());
                    for other in others {
                        row.push(self.apply_binary(
                            Multiply,
                            preference,
                            item.clone(),
                            other.clone(),
                        )?);
                    }
                    rows.push(Value::Array(row));
                }
                return Ok(Value::Array(rows));
            }
            (Value::Array(items), Value::Array(others)) => {
                if items.len() != others.len() {
                    return Err(EvalError::Range {
                        index: others.len() as i64,
                        len: items.len(),
                    });
                }
                let mut results = Vec::with_capacity(items.len());
                for (item, other) in items.iter().zip(others) {
                    results.push(self.apply_binary(
                        op,
                        preference,
                        item.clone(),
                        other.clone(),
                    )?);
                }
                return Ok(Value::Array(results));
            }
            (Value::Array(items), _) => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    results.push(self.apply_binary(op, preference, item.clone(), rhs.clone())?);
                }
                return Ok(Value::Array(results));
            }
            (_, Value::Array(others)) => {
                let mut results = Vec::with_capacity(others.len());
                for other in others {
                    results.push(self.apply_binary(op, preference, lhs.clone(), other.clone())?);
                }
                return Ok(Value::Array(results));
            }
            _ => {}
        }

        // Val arithmetic.
        match (&lhs, &rhs) {
            (Value::Val(a), Value::Val(b)) => {
                return match op {
                    Add => Ok(Value::Val(ops::val_add(a, b, false)?)),
                    Subtract => Ok(Value::Val(ops::val_add(a, b, true)?)),
                    Dot => {
                        let product = a.value.dot(&b.value)?;
                        Ok(Value::Interval(Interval::linear(Quantity::from_rational(
                            &product,
                        ))))
                    }
                    _ => Err(EvalError::Type(format!("vals do not support {op}"))),
                };
            }
            (Value::Val(val), _) | (_, Value::Val(val)) => {
                let val_is_left = matches!(&lhs, Value::Val(_));
                let other = if val_is_left { &rhs } else { &lhs };
                let Some(interval) = other.as_interval() else {
                    return Err(EvalError::Type(format!(
                        "cannot combine a val with {}",
                        other.kind()
                    )));
                };
                return match op {
                    Multiply => Ok(Value::Val(ops::val_scale(val, &interval, false)?)),
                    Divide | Fraction if val_is_left => {
                        Ok(Value::Val(ops::val_scale(val, &interval, true)?))
                    }
                    Dot => {
                        let Quantity::Exact(monzo) = &interval.value else {
                            return Err(EvalError::Type(
                                "cannot map a real value".to_owned(),
                            ));
                        };
                        if !interval.value.is_relative() {
                            return Err(EvalError::Echelon(
                                "vals map relative intervals".to_owned(),
                            ));
                        }
                        let product = val.value.dot(monzo)?;
                        Ok(Value::Interval(Interval::linear(Quantity::from_rational(
                            &product,
                        ))))
                    }
                    Tmpr => ops::val_temper(val, &interval).map(Value::Interval),
                    _ => Err(EvalError::Type(format!("vals do not support {op}"))),
                };
            }
            _ => {}
        }

        let (Some(a), Some(b)) = (lhs.as_interval(), rhs.as_interval()) else {
            return Err(EvalError::Type(format!(
                "{op} expects intervals, got {} and {}",
                lhs.kind(),
                rhs.kind()
            )));
        };
        if op == Tmpr {
            return Err(EvalError::Type("tmpr maps with a val".to_owned()));
        }
        ops::interval_binary(op, preference, &a, &b).map(Value::Interval)
    }

    fn eval_unary(
        &mut self,
        op: UnaryOperator,
        uniform: bool,
        operand: &Spanned<Expr>,
    ) -> Result<Value, EvalError> {
        let value = self.eval_expr(operand)?;
        let result = self.apply_unary(op, uniform, value)?;
        // Increments write back to their operand.
        if matches!(
            op,
            UnaryOperator::Increment | UnaryOperator::Decrement
        ) {
            if let Expr::Identifier(name) = &operand.node {
                self.env.borrow_mut().assign(*name, result.clone())?;
            }
        }
        Ok(result)
    }

    fn apply_unary(
        &mut self,
        op: UnaryOperator,
        uniform: bool,
        value: Value,
    ) -> Result<Value, EvalError> {
        let value = match value {
            Value::Array(items) => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    results.push(self.apply_unary(op, uniform, item)?);
                }
                return Ok(Value::Array(results));
            }
            other => other,
        };
        if matches!(op, UnaryOperator::Not) {
            return Ok(Value::Boolean(!value.is_truthy()));
        }
        let Some(interval) = value.as_interval() else {
            return Err(EvalError::Type(format!(
                "{op} expects an interval, got {}",
                value.kind()
            )));
        };
        let result = match op {
            UnaryOperator::Negate => ops::negate(&interval)?,
            UnaryOperator::Invert => ops::invert(&interval)?,
            UnaryOperator::Up => ops::inflect(&interval, &self.context.up.clone(), 1, false)?,
            UnaryOperator::Down => ops::inflect(&interval, &self.context.up.clone(), -1, false)?,
            UnaryOperator::Lift => ops::inflect(&interval, &self.context.lift.clone(), 1, true)?,
            UnaryOperator::Drop => ops::inflect(&interval, &self.context.lift.clone(), -1, true)?,
            UnaryOperator::Increment | UnaryOperator::Decrement => {
                if interval.domain != Domain::Linear {
                    return Err(EvalError::Domain(
                        "increment needs the linear domain".to_owned(),
                    ));
                }
                let one = Quantity::unity();
                let value = if matches!(op, UnaryOperator::Increment) {
                    interval.value.add(&one)?
                } else {
                    interval.value.sub(&one)?
                };
                let node = interval
                    .node
                    .as_ref()
                    .and_then(|n| ops::rewrite_node(n, &value, interval.steps));
                let mut result = interval.clone();
                result.value = value;
                result.node = node;
                result
            }
            UnaryOperator::Not => unreachable!("handled above"),
        };
        Ok(Value::Interval(result))
    }

    // ===== Compound constructors =====

    fn expect_integer(&mut self, expr: &Spanned<Expr>) -> Result<i64, EvalError> {
        let interval = self.expect_interval(expr)?;
        interval
            .value
            .to_rational()
            .filter(|r| r.is_integer())
            .and_then(|r| i64::try_from(r.to_integer()).ok())
            .ok_or_else(|| EvalError::Type("expected an integer".to_owned()))
    }

    fn eval_range(
        &mut self,
        start: &Spanned<Expr>,
        second: Option<&Spanned<Expr>>,
        end: &Spanned<Expr>,
    ) -> Result<Value, EvalError> {
        let start = self.expect_interval(start)?;
        let end = self.expect_interval(end)?;
        let step = match second {
            Some(second) => {
                let second = self.expect_interval(second)?;
                second.value.sub(&start.value)?
            }
            None => Quantity::unity(),
        };
        let (Some(start), Some(step), Some(end)) = (
            start.value.to_rational(),
            step.to_rational(),
            end.value.to_rational(),
        ) else {
            return Err(EvalError::Type("ranges need rational bounds".to_owned()));
        };
        if step.is_zero() {
            return Err(EvalError::Type("empty range step".to_owned()));
        }
        let ascending = step > Rational::zero();
        let mut cursor = start;
        let mut items = Vec::new();
        loop {
            let done = if ascending {
                cursor > end
            } else {
                cursor < end
            };
            if done {
                break;
            }
            self.context.spend(1)?;
            items.push(Value::Interval(rational_interval(&cursor)));
            cursor += &step;
        }
        Ok(Value::Array(items))
    }

    /// `a::b`: the harmonic segment between two integers, denominators kept.
    fn eval_segment(
        &mut self,
        root: &Spanned<Expr>,
        end: &Spanned<Expr>,
    ) -> Result<Value, EvalError> {
        let root = self.expect_integer(root)?;
        let end = self.expect_integer(end)?;
        if root == 0 || end == 0 {
            return Err(EvalError::Type("harmonic segments start at 1".to_owned()));
        }
        let mut items = Vec::new();
        let range: Box<dyn Iterator<Item = i64>> = if root <= end {
            Box::new(root + 1..=end)
        } else {
            Box::new((end..root).rev())
        };
        for numerator in range {
            self.context.spend(1)?;
            let mut interval = Interval::linear(Quantity::from_fraction(numerator, root));
            interval.node = Some(IntervalLiteral::Fraction {
                numerator: BigInt::from(numerator),
                denominator: BigInt::from(root),
            });
            items.push(Value::Interval(interval));
        }
        Ok(Value::Array(items))
    }

    /// `4:5:6`: an enumerated chord over the first element.
    fn eval_chord(&mut self, intervals: &[Spanned<Expr>]) -> Result<Value, EvalError> {
        let mut evaluated = Vec::with_capacity(intervals.len());
        for expr in intervals {
            evaluated.push(self.expect_interval(expr)?);
        }
        let root = evaluated
            .first()
            .ok_or_else(|| EvalError::Type("empty chord".to_owned()))?
            .clone();
        let mut items = Vec::new();
        for interval in evaluated.iter().skip(1) {
            let mut step =
                ops::interval_binary(BinaryOperator::Fraction, Preference::None, interval, &root)?;
            if let (
                Some(IntervalLiteral::Integer(numerator)),
                Some(IntervalLiteral::Integer(denominator)),
            ) = (&interval.node, &root.node)
            {
                step.node = Some(IntervalLiteral::Fraction {
                    numerator: numerator.clone(),
                    denominator: denominator.clone(),
                });
            }
            items.push(Value::Interval(step));
        }
        Ok(Value::Array(items))
    }

    fn eval_nedji(
        &mut self,
        numerator: &Spanned<Expr>,
        denominator: &Spanned<Expr>,
        equave: Option<&Spanned<Expr>>,
    ) -> Result<Value, EvalError> {
        let numerator = self.expect_integer(numerator)?;
        let denominator = self.expect_integer(denominator)?;
        if denominator == 0 {
            return Err(EvalError::Domain("zero divisions".to_owned()));
        }
        let equave_interval = match equave {
            Some(expr) => Some(self.expect_interval(expr)?),
            None => None,
        };
        let base = match &equave_interval {
            Some(interval) => interval.value.clone(),
            None => Quantity::from_int(2),
        };
        let exponent = rational(numerator, denominator);
        let value = base.pow_rational(&exponent)?;
        let mut interval = Interval::logarithmic(value);
        let equave_fraction = match &equave_interval {
            Some(interval) => interval
                .value
                .to_rational()
                .and_then(|r| {
                    let n = i64::try_from(r.numer().clone()).ok()?;
                    let d = i64::try_from(r.denom().clone()).ok()?;
                    Some((n, d))
                }),
            None => None,
        };
        if equave_interval.is_none() || equave_fraction.is_some() {
            interval.node = Some(IntervalLiteral::Nedji(sonicweave_ast::NedjiData {
                numerator,
                denominator,
                equave: equave_fraction,
            }));
        }
        Ok(Value::Interval(interval))
    }

    fn eval_access(
        &mut self,
        object: &Spanned<Expr>,
        index: &Spanned<Expr>,
        nullish: bool,
    ) -> Result<Value, EvalError> {
        let object = self.eval_expr(object)?;
        let index = self.eval_expr(index)?;
        match (&object, &index) {
            (Value::Record(entries), Value::Str(key)) => match entries.get(key) {
                Some(value) => Ok(value.clone()),
                None if nullish => Ok(Value::None),
                None => Err(EvalError::Lookup(key.clone())),
            },
            (Value::Array(items), _) => {
                let position = match resolve_index(&index, items.len()) {
                    Ok(position) => position,
                    Err(_) if nullish => return Ok(Value::None),
                    Err(error) => return Err(error),
                };
                Ok(items[position].clone())
            }
            _ => Err(EvalError::Type(format!(
                "cannot index {} with {}",
                object.kind(),
                index.kind()
            ))),
        }
    }

    fn eval_slice(
        &mut self,
        object: &Spanned<Expr>,
        start: Option<&Spanned<Expr>>,
        second: Option<&Spanned<Expr>>,
        end: Option<&Spanned<Expr>>,
    ) -> Result<Value, EvalError> {
        let object = self.eval_expr(object)?;
        let Value::Array(items) = &object else {
            return Err(EvalError::Type(format!(
                "cannot slice {}",
                object.kind()
            )));
        };
        let items = items.clone();
        let len = items.len();
        let start_index = match start {
            Some(expr) => {
                let value = self.eval_expr(expr)?;
                resolve_index(&value, len.max(1))? as i64
            }
            None => 0,
        };
        let end_index = match end {
            Some(expr) => {
                let value = self.eval_expr(expr)?;
                resolve_index(&value, len.max(1))? as i64
            }
            None => len.saturating_sub(1) as i64,
        };
        let step = match second {
            Some(expr) => {
                let value = self.eval_expr(expr)?;
                let second_index = resolve_index(&value, len.max(1))? as i64;
                second_index - start_index
            }
            None => {
                if end_index >= start_index {
                    1
                } else {
                    -1
                }
            }
        };
        if step == 0 {
            return Err(EvalError::Type("empty slice step".to_owned()));
        }
        let mut results = Vec::new();
        let mut cursor = start_index;
        while (step > 0 && cursor <= end_index) || (step < 0 && cursor >= end_index) {
            self.context.spend(1)?;
            if cursor < 0 || cursor as usize >= len {
                break;
            }
            results.push(items[cursor as usize].clone());
            cursor += step;
        }
        Ok(Value::Array(results))
    }

    // ===== Calls =====

    pub(crate) fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
    ) -> Result<Value, EvalError> {
        self.context.spend(1)?;
        match callee {
            Value::Builtin(builtin) => (builtin.run)(self, args),
            Value::Function(closure) => self.call_closure(&closure, args),
            other => Err(EvalError::Type(format!(
                "{} is not callable",
                other.kind()
            ))),
        }
    }

    fn bind_params(
        &mut self,
        params: &[Param],
        args: Vec<Value>,
    ) -> Result<(), EvalError> {
        let mut args = args.into_iter();
        for param in params {
            if param.rest {
                let rest: Vec<Value> = args.by_ref().collect();
                self.env
                    .borrow_mut()
                    .declare(param.name, Value::Array(rest), true);
                continue;
            }
            let value = match args.next() {
                Some(value) => value,
                None => match &param.default {
                    Some(default) => self.eval_expr(default)?,
                    None => Value::None,
                },
            };
            self.env.borrow_mut().declare(param.name, value, true);
        }
        Ok(())
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> Result<Value, EvalError> {
        let saved_env = self.env.clone();
        self.env = Rc::new(RefCell::new(Env::with_parent(closure.env.clone())));
        let result = (|| -> Result<Value, EvalError> {
            self.bind_params(&closure.params, args)?;
            match &closure.body {
                FunctionBody::Expression(expr) => self.eval_expr(expr),
                FunctionBody::Block(statements) => {
                    self.scales.push(Vec::new());
                    let mut returned = None;
                    let mut error = None;
                    for statement in statements.iter() {
                        match self.execute_statement(statement) {
                            Ok(Flow::Normal) => {}
                            Ok(Flow::Return(value)) => {
                                returned = Some(value);
                                break;
                            }
                            Ok(Flow::Break | Flow::Continue) => {
                                error = Some(EvalError::Type(
                                    "break and continue belong inside loops".to_owned(),
                                ));
                                break;
                            }
                            Err(e) => {
                                error = Some(e);
                                break;
                            }
                        }
                    }
                    let scale = self.scales.pop().expect("function scale was pushed");
                    if let Some(error) = error {
                        return Err(error);
                    }
                    // A riff without an explicit return yields its scale.
                    Ok(returned.unwrap_or(Value::Array(scale)))
                }
            }
        })();
        self.env = saved_env;
        result
    }

    pub(crate) fn fresh_tracking_id(&mut self) -> u64 {
        let id = self.next_tracking_id;
        self.next_tracking_id += 1;
        id
    }

    // ===== Literals =====

    fn literal_value(&mut self, node: &IntervalLiteral) -> Result<Value, EvalError> {
        match node {
            IntervalLiteral::True => Ok(Value::Boolean(true)),
            IntervalLiteral::False => Ok(Value::Boolean(false)),
            IntervalLiteral::Integer(value) => {
                let interval = Interval::linear(Quantity::Exact(TimeMonzo::from_bigint(
                    value.clone(),
                )))
                .with_node(node.clone());
                Ok(Value::Interval(interval))
            }
            IntervalLiteral::Fraction {
                numerator,
                denominator,
            } => {
                if denominator.is_zero() {
                    return Err(EvalError::Domain("division by zero".to_owned()));
                }
                let value = Rational::new(numerator.clone(), denominator.clone());
                let interval =
                    Interval::linear(Quantity::from_rational(&value)).with_node(node.clone());
                Ok(Value::Interval(interval))
            }
            IntervalLiteral::Decimal { amount, flavor } => {
                let interval = match flavor {
                    DecimalFlavor::Exact => {
                        Interval::linear(Quantity::from_rational(amount)).with_node(node.clone())
                    }
                    DecimalFlavor::Real => {
                        let value = amount.to_f64().unwrap_or(f64::NAN);
                        Interval::linear(Quantity::Real(TimeReal::new(value)))
                            .with_node(node.clone())
                    }
                    DecimalFlavor::Hertz => {
                        let value = Quantity::from_rational(amount)
                            .mul(&Quantity::Exact(TimeMonzo::hertz()));
                        Interval::linear(value).with_node(node.clone())
                    }
                };
                Ok(Value::Interval(interval))
            }
            IntervalLiteral::Cents { amount, real } => {
                let interval = if *real {
                    let cents = amount.to_f64().unwrap_or(f64::NAN);
                    Interval::logarithmic(Quantity::Real(TimeReal::new(
                        (cents / 1200.0).exp2(),
                    )))
                    .with_node(node.clone())
                } else {
                    let exponent = amount / rational(1200, 1);
                    let value = Quantity::from_int(2).pow_rational(&exponent)?;
                    Interval::logarithmic(value).with_node(node.clone())
                };
                Ok(Value::Interval(interval))
            }
            IntervalLiteral::Cent => {
                let value = Quantity::from_int(2).pow_rational(&rational(1, 1200))?;
                Ok(Value::Interval(
                    Interval::logarithmic(value).with_node(node.clone()),
                ))
            }
            IntervalLiteral::Nedji(data) => {
                let base = match data.equave {
                    Some((n, d)) => Quantity::from_fraction(n, d),
                    None => Quantity::from_int(2),
                };
                let value = base.pow_rational(&rational(data.numerator, data.denominator))?;
                Ok(Value::Interval(
                    Interval::logarithmic(value).with_node(node.clone()),
                ))
            }
            IntervalLiteral::Step(count) => {
                let mut interval = Interval::logarithmic(Quantity::unity());
                interval.steps = *count;
                interval.node = Some(node.clone());
                Ok(Value::Interval(interval))
            }
            IntervalLiteral::Radical { radicand, exponent } => {
                let base = Quantity::from_rational(radicand);
                let value = base.pow_rational(exponent)?;
                Ok(Value::Interval(
                    Interval::linear(value).with_node(node.clone()),
                ))
            }
            IntervalLiteral::SquareSuperparticular(index) => {
                let value = fjs::square_superparticular(*index).ok_or_else(|| {
                    EvalError::Type("superparticular indices start at 2".to_owned())
                })?;
                Ok(Value::Interval(
                    Interval::linear(Quantity::Exact(value)).with_node(node.clone()),
                ))
            }
            IntervalLiteral::Monzo { components, basis } => {
                let mut value = Quantity::unity();
                match basis {
                    None => {
                        for (i, component) in components.iter().enumerate() {
                            let prime =
                                Quantity::Exact(TimeMonzo::prime(i));
                            value = value.mul(&prime.pow_rational(component)?);
                        }
                    }
                    Some(basis) => {
                        if basis.len() < components.len() {
                            return Err(EvalError::Type(
                                "monzo has more components than basis elements".to_owned(),
                            ));
                        }
                        for (component, element) in components.iter().zip(basis) {
                            let base = Quantity::from_rational(element);
                            value = value.mul(&base.pow_rational(component)?);
                        }
                    }
                }
                Ok(Value::Interval(
                    Interval::logarithmic(value).with_node(node.clone()),
                ))
            }
            IntervalLiteral::Val { components, basis } => {
                let val = self.build_val(components, basis.as_deref())?;
                Ok(Value::Val(Val {
                    node: Some(node.clone()),
                    ..val
                }))
            }
            IntervalLiteral::Warts { .. } | IntervalLiteral::SparseOffsetVal { .. } => {
                let val = builtins::val_from_literal(node)?;
                Ok(Value::Val(Val {
                    node: Some(node.clone()),
                    ..val
                }))
            }
            IntervalLiteral::Fjs {
                ups,
                lifts,
                pythagorean,
                superscripts,
                subscripts,
            } => {
                let core = pythagorean
                    .monzo()
                    .map_err(|e| EvalError::Type(e.to_string()))?;
                let inflected = fjs::inflect(&core, superscripts, subscripts)
                    .ok_or_else(|| EvalError::Type("unknown FJS inflection".to_owned()))?;
                let mut interval = Interval::logarithmic(Quantity::Exact(inflected));
                self.apply_arrows(&mut interval, *ups, *lifts)?;
                interval.node = Some(node.clone());
                Ok(Value::Interval(interval))
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
                let mut sharps = Rational::zero();
                for accidental in accidentals {
                    sharps += accidental.apotomes();
                }
                let pitch = AbsolutePitch {
                    nominal: *nominal,
                    sharps,
                    octave: *octave,
                };
                let core = pitch
                    .monzo()
                    .map_err(|e| EvalError::Type(e.to_string()))?;
                let inflected = fjs::inflect(&core, superscripts, subscripts)
                    .ok_or_else(|| EvalError::Type("unknown FJS inflection".to_owned()))?;
                let mut value = Quantity::Exact(inflected).mul(&self.context.c4);
                if let Some(frequency) = &self.context.unison_frequency {
                    value = value.mul(frequency);
                }
                let mut interval = Interval::logarithmic(value);
                self.apply_arrows(&mut interval, *ups, *lifts)?;
                interval.node = Some(node.clone());
                Ok(Value::Interval(interval))
            }
            IntervalLiteral::AspiringFjs { .. } | IntervalLiteral::AspiringAbsoluteFjs { .. } => {
                Err(EvalError::Type(
                    "aspiring notation carries no value of its own".to_owned(),
                ))
            }
            IntervalLiteral::Hertz { prefix } => {
                let value = Quantity::from_rational(&prefix.factor())
                    .mul(&Quantity::Exact(TimeMonzo::hertz()));
                Ok(Value::Interval(
                    Interval::linear(value).with_node(node.clone()),
                ))
            }
            IntervalLiteral::Second { prefix } => {
                let value = Quantity::from_rational(&prefix.factor())
                    .mul(&Quantity::Exact(TimeMonzo::second()));
                Ok(Value::Interval(
                    Interval::linear(value).with_node(node.clone()),
                ))
            }
        }
    }

    fn apply_arrows(
        &mut self,
        interval: &mut Interval,
        ups: i32,
        lifts: i32,
    ) -> Result<(), EvalError> {
        if ups != 0 {
            let inflected = ops::inflect(interval, &self.context.up.clone(), ups, false)?;
            interval.value = inflected.value;
            interval.steps = inflected.steps;
        }
        if lifts != 0 {
            let inflected = ops::inflect(interval, &self.context.lift.clone(), lifts, true)?;
            interval.value = inflected.value;
            interval.steps = inflected.steps;
        }
        Ok(())
    }

    /// `<12 19 28]` over the default or an explicit basis.
    pub(crate) fn build_val(
        &mut self,
        components: &[Rational],
        basis: Option<&[Rational]>,
    ) -> Result<Val, EvalError> {
        match basis {
            None => {
                let value = TimeMonzo::from_parts(
                    Rational::zero(),
                    components.to_vec(),
                    Rational::one(),
                );
                Ok(Val::new(value, TimeMonzo::from_int(2)))
            }
            Some(basis) => {
                if basis.len() != components.len() {
                    return Err(EvalError::Type(
                        "val components must match the basis".to_owned(),
                    ));
                }
                let mut exponents = Vec::new();
                for (component, element) in components.iter().zip(basis) {
                    if !element.is_integer() {
                        return Err(EvalError::Type(
                            "val bases are lists of primes".to_owned(),
                        ));
                    }
                    let prime = u64::try_from(element.to_integer())
                        .ok()
                        .and_then(sonicweave_monzo::primes::prime_index)
                        .ok_or_else(|| {
                            EvalError::Type("val bases are lists of primes".to_owned())
                        })?;
                    if exponents.len() <= prime {
                        exponents.resize(prime + 1, Rational::zero());
                    }
                    exponents[prime] = component.clone();
                }
                let equave = TimeMonzo::from_rational(&basis[0]);
                let value =
                    TimeMonzo::from_parts(Rational::zero(), exponents, Rational::one());
                Ok(Val::new(value, equave))
            }
        }
    }
}

fn rational_interval(value: &Rational) -> Interval {
    let node = if value.is_integer() {
        IntervalLiteral::Integer(value.to_integer())
    } else {
        IntervalLiteral::Fraction {
            numerator: value.numer().clone(),
            denominator: value.denom().clone(),
        }
    };
    Interval::linear(Quantity::from_rational(value)).with_node(node)
}

/// Resolve a (possibly negative) interval index against a length.
pub(crate) fn resolve_index(value: &Value, len: usize) -> Result<usize, EvalError> {
    let index = value
        .as_interval()
        .and_then(|interval| interval.value.to_rational())
        .filter(|r| r.is_integer())
        .and_then(|r| i64::try_from(r.to_integer()).ok())
        .ok_or_else(|| EvalError::Type("indices are integers".to_owned()))?;
    let resolved = if index < 0 {
        index + len as i64
    } else {
        index
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(EvalError::Range {
            index,
            len,
        });
    }
    Ok(resolved as usize)
}

fn set_indexed(target: Value, index: &Value, value: Value) -> Result<Value, EvalError> {
    match target {
        Value::Array(mut items) => {
            let position = resolve_index(index, items.len())?;
            items[position] = value;
            Ok(Value::Array(items))
        }
        Value::Record(mut entries) => {
            let Value::Str(key) = index else {
                return Err(EvalError::Type("record keys are strings".to_owned()));
            };
            entries.insert(key.clone(), value);
            Ok(Value::Record(entries))
        }
        other => Err(EvalError::Type(format!(
            "cannot assign into {}",
            other.kind()
        ))),
    }
}
