// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical environments for variable binding.

use super::value::Value;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A lexical scope. Closures keep their defining scope alive through this
/// shared handle.
#[derive(Clone, Default)]
pub struct Scope(Rc<RefCell<ScopeData>>);

#[derive(Default)]
struct ScopeData {
    /// The bindings in this scope
    bindings: FxHashMap<String, Binding>,
    /// The enclosing scope
    outer: Option<Scope>,
}

struct Binding {
    value: Value,
    mutable: bool,
}

/// Outcome of assigning to a name through the scope chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The binding was updated
    Done,
    /// No scope declares the name
    Unresolved,
    /// The binding is a `const`
    Constant,
}

impl Scope {
    /// Creates a new outermost scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope nested inside this one.
    pub fn child(&self) -> Self {
        Scope(Rc::new(RefCell::new(ScopeData {
            bindings: FxHashMap::default(),
            outer: Some(self.clone()),
        })))
    }

    /// Declares (or redeclares) a binding in this scope.
    pub fn declare(&self, name: &str, value: Value, mutable: bool) {
        self.0
            .borrow_mut()
            .bindings
            .insert(name.to_string(), Binding { value, mutable });
    }

    /// Declares a `var` binding initialized to `undefined` unless it exists.
    pub fn declare_var(&self, name: &str) {
        self.0
            .borrow_mut()
            .bindings
            .entry(name.to_string())
            .or_insert(Binding {
                value: Value::Undefined,
                mutable: true,
            });
    }

    /// Drops every binding declared in this scope.
    pub(crate) fn clear(&self) {
        let bindings = std::mem::take(&mut self.0.borrow_mut().bindings);
        drop(bindings);
    }

    /// Whether this scope itself declares `name`.
    pub fn has_own(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    /// Looks a name up through the scope chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(binding) = data.bindings.get(name) {
            return Some(binding.value.clone());
        }
        data.outer.as_ref().and_then(|outer| outer.lookup(name))
    }

    /// Assigns to the nearest binding of `name`.
    pub fn assign(&self, name: &str, value: Value) -> Assignment {
        let mut data = self.0.borrow_mut();
        if let Some(binding) = data.bindings.get_mut(name) {
            if !binding.mutable {
                return Assignment::Constant;
            }
            binding.value = value;
            return Assignment::Done;
        }
        match &data.outer {
            Some(outer) => outer.assign(name, value),
            None => Assignment::Unresolved,
        }
    }
}
