//! Lexical environment
//!
//! A chain of scopes with a const/let distinction. Reads fall through to the
//! parent; reassignment walks outward and respects mutability.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use sonicweave_core::InternedStr;

use crate::error::EvalError;
use crate::value::Value;

#[derive(Clone, Debug)]
struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Env {
    bindings: HashMap<InternedStr, Binding>,
    parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Rc<RefCell<Env>>) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    pub fn lookup(&self, name: &InternedStr) -> Option<Value> {
        self.bindings
            .get(name)
            .map(|binding| binding.value.clone())
            .or_else(|| self.parent.as_ref().and_then(|p| p.borrow().lookup(name)))
    }

    /// Declare on the current level, shadowing any outer binding.
    pub fn declare(&mut self, name: InternedStr, value: Value, mutable: bool) {
        self.bindings.insert(name, Binding { value, mutable });
    }

    /// Reassign an existing binding, traversing outward.
    pub fn assign(&mut self, name: InternedStr, value: Value) -> Result<(), EvalError> {
        if let Some(binding) = self.bindings.get_mut(&name) {
            if !binding.mutable {
                return Err(EvalError::Type(format!(
                    "cannot reassign constant {name}"
                )));
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => Err(EvalError::Lookup(name.to_string())),
        }
    }

    pub fn is_declared_here(&self, name: &InternedStr) -> bool {
        self.bindings.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonicweave_core::intern;

    #[test]
    fn reads_fall_through_and_writes_walk_out() {
        let root = Rc::new(RefCell::new(Env::new()));
        root.borrow_mut()
            .declare(intern("x"), Value::Boolean(true), true);
        let child = Env::with_parent(root.clone());
        assert!(matches!(
            child.lookup(&intern("x")),
            Some(Value::Boolean(true))
        ));

        let mut child = child;
        child.assign(intern("x"), Value::Boolean(false)).unwrap();
        assert!(matches!(
            root.borrow().lookup(&intern("x")),
            Some(Value::Boolean(false))
        ));
    }

    #[test]
    fn constants_reject_reassignment() {
        let mut env = Env::new();
        env.declare(intern("k"), Value::None, false);
        assert!(env.assign(intern("k"), Value::Boolean(true)).is_err());
    }
}
