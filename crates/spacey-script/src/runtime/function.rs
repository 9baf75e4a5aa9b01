// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Function representation.

use super::environment::Scope;
use super::exception::Exception;
use super::value::Value;
use crate::ast::FunctionNode;
use crate::vm::Runtime;
use std::rc::Rc;
use std::sync::Arc;

/// Signature of a host function: runtime, `this`, arguments.
pub type NativeFn = dyn Fn(&mut Runtime, &Value, &[Value]) -> Result<Value, Exception>;

/// Something that can be called.
#[derive(Clone)]
pub enum Callable {
    /// A function defined in script code, closed over its defining scope.
    Script {
        node: Arc<FunctionNode>,
        scope: Scope,
    },
    /// A function implemented by the host.
    Native { name: String, func: Rc<NativeFn> },
}

impl Callable {
    /// Returns the function name, empty for anonymous functions.
    pub fn name(&self) -> &str {
        match self {
            Callable::Script { node, .. } => node.name.as_deref().unwrap_or(""),
            Callable::Native { name, .. } => name,
        }
    }

    /// The number of declared parameters.
    pub fn arity(&self) -> usize {
        match self {
            Callable::Script { node, .. } => node.params.len(),
            Callable::Native { .. } => 0,
        }
    }
}
