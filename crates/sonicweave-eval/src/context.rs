//! Root evaluation context
//!
//! Holds the reference pitch, the up/lift amounts, the unison frequency and
//! the gas counter that bounds every run.

use sonicweave_monzo::Quantity;

use crate::error::EvalError;

/// Amount applied by one up or lift inflection: a value together with an
/// orthogonal step count.
#[derive(Clone, Debug)]
pub struct Inflection {
    pub value: Quantity,
    pub steps: i64,
}

impl Inflection {
    fn steps_only(steps: i64) -> Self {
        Self {
            value: Quantity::unity(),
            steps,
        }
    }
}

/// Default gas budget per evaluation.
pub const DEFAULT_GAS: i64 = 1_000_000;

#[derive(Clone, Debug)]
pub struct RootContext {
    /// Value of C4; relative 1/1 until a pitch declaration changes it.
    pub c4: Quantity,
    /// Frequency of the unison, set by a pitch declaration.
    pub unison_frequency: Option<Quantity>,
    pub up: Inflection,
    pub lift: Inflection,
    gas: i64,
}

impl Default for RootContext {
    fn default() -> Self {
        Self::new(DEFAULT_GAS)
    }
}

impl RootContext {
    pub fn new(gas: i64) -> Self {
        Self {
            c4: Quantity::unity(),
            unison_frequency: None,
            up: Inflection::steps_only(1),
            lift: Inflection::steps_only(5),
            gas,
        }
    }

    /// Spend gas; every AST visit and every generated element charges here.
    pub fn spend(&mut self, amount: i64) -> Result<(), EvalError> {
        self.gas -= amount;
        if self.gas < 0 {
            Err(EvalError::OutOfGas)
        } else {
            Ok(())
        }
    }

    pub fn remaining_gas(&self) -> i64 {
        self.gas
    }
}
