// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tree-walking interpreter.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::ast::*;
use crate::builtins::{self, ErrorKind};
use crate::runtime::{
    Assignment, Callable, Exception, Object, ObjectKind, Scope, Value, number_to_string,
};
use crate::{Error, Program};

/// Nested script function calls beyond this depth throw a `RangeError`.
/// Native functions do not count.
pub const MAX_CALL_DEPTH: usize = 128;

/// Nested expression evaluation beyond this depth throws a `RangeError`.
/// The count runs across calls, so it bounds the whole native stack the
/// evaluator uses.
pub const MAX_EXPRESSION_DEPTH: usize = 512;

/// An execution context: global object, global scope and call state.
///
/// A runtime is single-threaded. Compiled [`Program`]s can be shared between
/// threads, but values and objects belong to the runtime that created them.
pub struct Runtime {
    global: Object,
    global_scope: Scope,
    call_depth: usize,
    expression_depth: usize,
}

/// How a statement finished.
enum Completion {
    /// Fell through, with the value of the last expression statement if any
    Normal(Option<Value>),
    Return(Value),
    Break,
    Continue,
}

/// Per-activation state threaded through statement execution.
#[derive(Clone)]
struct Frame {
    scope: Scope,
    /// Where `var` declarations live
    var_scope: Scope,
    this: Value,
}

impl Frame {
    fn nested(&self) -> Frame {
        Frame {
            scope: self.scope.child(),
            var_scope: self.var_scope.clone(),
            this: self.this.clone(),
        }
    }
}

/// An assignable location.
enum Reference {
    Binding(String),
    Property(Value, String),
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

// The global object refers to itself through `globalThis`, and closures
// stored in globals hold the global scope. Both are cleared so those
// cycles do not outlive the runtime.
impl Drop for Runtime {
    fn drop(&mut self) {
        self.global.clear();
        self.global_scope.clear();
    }
}

impl Runtime {
    /// Creates a runtime with the built-in globals installed.
    pub fn new() -> Self {
        let mut runtime = Self {
            global: Object::ordinary(),
            global_scope: Scope::new(),
            call_depth: 0,
            expression_depth: 0,
        };
        builtins::install(&mut runtime);
        runtime
    }

    /// The global object.
    pub fn global(&self) -> &Object {
        &self.global
    }

    /// Sets a property on the global object.
    pub fn set_global(&self, name: &str, value: impl Into<Value>) {
        self.global.set(name, value.into());
    }

    /// Reads a global: top-level declarations first, then the global object.
    pub fn get_global(&self, name: &str) -> Value {
        self.global_scope
            .lookup(name)
            .unwrap_or_else(|| self.global.get(name))
    }

    /// Allocates an empty object.
    pub fn new_object(&self) -> Object {
        Object::ordinary()
    }

    /// Allocates an array.
    pub fn new_array(&self, elements: Vec<Value>) -> Object {
        Object::array(elements)
    }

    /// Wraps a host closure as a script function.
    pub fn new_function<F>(&self, name: &str, func: F) -> Object
    where
        F: Fn(&mut Runtime, &Value, &[Value]) -> Result<Value, Exception> + 'static,
    {
        let object = Object::new(ObjectKind::Function(Callable::Native {
            name: name.to_string(),
            func: std::rc::Rc::new(func),
        }));
        object.define_hidden("name", Value::from(name));
        object
    }

    /// Allocates an error object of the given kind.
    pub fn new_error(&self, kind: ErrorKind, message: &str) -> Object {
        builtins::make_error(kind.name(), message)
    }

    /// Builds an exception carrying a fresh error object.
    pub fn throw(&self, kind: ErrorKind, message: impl AsRef<str>) -> Exception {
        Exception::new(Value::Object(self.new_error(kind, message.as_ref())))
    }

    /// Shorthand for throwing a plain `Error`.
    pub fn throw_error(&self, message: impl AsRef<str>) -> Exception {
        self.throw(ErrorKind::Error, message)
    }

    /// Shorthand for throwing a `TypeError`.
    pub fn type_error(&self, message: impl AsRef<str>) -> Exception {
        self.throw(ErrorKind::TypeError, message)
    }

    /// Runs a compiled program in the global scope and returns the value of
    /// its last expression statement.
    pub fn run_program(&mut self, program: &Program) -> Result<Value, Error> {
        let frame = Frame {
            scope: self.global_scope.clone(),
            var_scope: self.global_scope.clone(),
            this: Value::Object(self.global.clone()),
        };
        let body = program.body();
        hoist_vars(body, &frame.var_scope);
        self.hoist_functions(body, &frame.scope);

        let mut last = Value::Undefined;
        for statement in body {
            match self.exec_statement(statement, &frame)? {
                Completion::Normal(Some(value)) => last = value,
                Completion::Normal(None) => {}
                Completion::Return(value) => return Ok(value),
                Completion::Break | Completion::Continue => {}
            }
        }
        Ok(last)
    }

    /// Compiles and runs source text. `name` is used in syntax errors.
    pub fn run_string(&mut self, name: &str, source: &str) -> Result<Value, Error> {
        let program = Program::compile(name, source)?;
        self.run_program(&program)
    }

    /// Calls a function value.
    pub fn call(&mut self, func: &Value, this: Value, args: &[Value]) -> Result<Value, Exception> {
        let Some(callable) = func.as_object().and_then(Object::callable) else {
            return Err(self.type_error(format!(
                "{} is not a function",
                func.to_display_string()
            )));
        };
        match callable {
            Callable::Native { func, .. } => func(self, &this, args),
            Callable::Script { node, scope } => {
                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(self.stack_overflow());
                }
                self.call_depth += 1;
                let result = self.call_script(&node, &scope, this, args);
                self.call_depth -= 1;
                result
            }
        }
    }

    fn stack_overflow(&self) -> Exception {
        self.throw(ErrorKind::RangeError, "Maximum call stack size exceeded")
    }

    /// Calls a function as a constructor (`new F(...)`).
    pub fn construct(&mut self, func: &Value, args: &[Value]) -> Result<Value, Exception> {
        if !func.is_callable() {
            return Err(self.type_error(format!(
                "{} is not a constructor",
                func.to_display_string()
            )));
        }
        let instance = Object::ordinary();
        let result = self.call(func, Value::Object(instance.clone()), args)?;
        Ok(match result {
            Value::Object(_) => result,
            _ => Value::Object(instance),
        })
    }

    fn call_script(
        &mut self,
        node: &FunctionNode,
        closure: &Scope,
        this: Value,
        args: &[Value],
    ) -> Result<Value, Exception> {
        let scope = closure.child();
        scope.declare("arguments", Value::Object(Object::array(args.to_vec())), true);
        for (i, param) in node.params.iter().enumerate() {
            scope.declare(param, args.get(i).cloned().unwrap_or_default(), true);
        }
        hoist_vars(&node.body, &scope);
        self.hoist_functions(&node.body, &scope);

        let frame = Frame {
            scope: scope.clone(),
            var_scope: scope,
            this,
        };
        for statement in &node.body {
            if let Completion::Return(value) = self.exec_statement(statement, &frame)? {
                return Ok(value);
            }
        }
        Ok(Value::Undefined)
    }

    fn make_closure(&self, node: &Arc<FunctionNode>, scope: &Scope) -> Object {
        let object = Object::new(ObjectKind::Function(Callable::Script {
            node: Arc::clone(node),
            scope: scope.clone(),
        }));
        object.define_hidden("name", Value::from(node.name.as_deref().unwrap_or("")));
        object.define_hidden("length", Value::Number(node.params.len() as f64));
        object
    }

    /// Binds function declarations of a body before any of it runs.
    fn hoist_functions(&self, body: &[Statement], scope: &Scope) {
        for statement in body {
            if let Statement::FunctionDeclaration(node) = statement {
                let closure = self.make_closure(node, scope);
                let name = node.name.as_deref().unwrap_or("");
                scope.declare(name, Value::Object(closure), true);
            }
        }
    }

    // Statements

    fn exec_statements(
        &mut self,
        statements: &[Statement],
        frame: &Frame,
    ) -> Result<Completion, Exception> {
        let mut last = None;
        for statement in statements {
            match self.exec_statement(statement, frame)? {
                Completion::Normal(Some(value)) => last = Some(value),
                Completion::Normal(None) => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn exec_block(&mut self, statements: &[Statement], frame: &Frame) -> Result<Completion, Exception> {
        let frame = frame.nested();
        self.hoist_functions(statements, &frame.scope);
        self.exec_statements(statements, &frame)
    }

    fn exec_statement(&mut self, statement: &Statement, frame: &Frame) -> Result<Completion, Exception> {
        match statement {
            Statement::VariableDeclaration(declaration) => {
                self.exec_declaration(declaration, frame)?;
                Ok(Completion::Normal(None))
            }
            Statement::FunctionDeclaration(_) | Statement::Empty => Ok(Completion::Normal(None)),
            Statement::Expression(expression) => {
                Ok(Completion::Normal(Some(self.eval(expression, frame)?)))
            }
            Statement::Block(statements) => self.exec_block(statements, frame),
            Statement::If(stmt) => {
                if self.eval(&stmt.test, frame)?.to_boolean() {
                    self.exec_statement(&stmt.consequent, frame)
                } else if let Some(alternate) = &stmt.alternate {
                    self.exec_statement(alternate, frame)
                } else {
                    Ok(Completion::Normal(None))
                }
            }
            Statement::While(stmt) => {
                let mut last = None;
                while self.eval(&stmt.test, frame)?.to_boolean() {
                    match self.exec_statement(&stmt.body, frame)? {
                        Completion::Normal(value) => last = value.or(last),
                        Completion::Continue => {}
                        Completion::Break => break,
                        ret @ Completion::Return(_) => return Ok(ret),
                    }
                }
                Ok(Completion::Normal(last))
            }
            Statement::For(stmt) => self.exec_for(stmt, frame),
            Statement::Return(argument) => {
                let value = match argument {
                    Some(expression) => self.eval(expression, frame)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::Break => Ok(Completion::Break),
            Statement::Continue => Ok(Completion::Continue),
            Statement::Throw(expression) => {
                let value = self.eval(expression, frame)?;
                Err(Exception::new(value))
            }
            Statement::Try(stmt) => self.exec_try(stmt, frame),
        }
    }

    fn exec_declaration(
        &mut self,
        declaration: &VariableDeclaration,
        frame: &Frame,
    ) -> Result<(), Exception> {
        for declarator in &declaration.declarations {
            match declaration.kind {
                VariableKind::Var => {
                    if let Some(init) = &declarator.init {
                        let value = self.eval(init, frame)?;
                        if frame.scope.assign(&declarator.name, value.clone()) != Assignment::Done {
                            frame.var_scope.declare(&declarator.name, value, true);
                        }
                    }
                }
                VariableKind::Let | VariableKind::Const => {
                    let value = match &declarator.init {
                        Some(init) => self.eval(init, frame)?,
                        None => Value::Undefined,
                    };
                    let mutable = declaration.kind == VariableKind::Let;
                    frame.scope.declare(&declarator.name, value, mutable);
                }
            }
        }
        Ok(())
    }

    fn exec_for(&mut self, stmt: &ForStatement, frame: &Frame) -> Result<Completion, Exception> {
        let frame = frame.nested();
        match &stmt.init {
            Some(ForInit::Variable(declaration)) => self.exec_declaration(declaration, &frame)?,
            Some(ForInit::Expression(expression)) => {
                self.eval(expression, &frame)?;
            }
            None => {}
        }

        let mut last = None;
        loop {
            if let Some(test) = &stmt.test {
                if !self.eval(test, &frame)?.to_boolean() {
                    break;
                }
            }
            match self.exec_statement(&stmt.body, &frame)? {
                Completion::Normal(value) => last = value.or(last),
                Completion::Continue => {}
                Completion::Break => break,
                ret @ Completion::Return(_) => return Ok(ret),
            }
            if let Some(update) = &stmt.update {
                self.eval(update, &frame)?;
            }
        }
        Ok(Completion::Normal(last))
    }

    fn exec_try(&mut self, stmt: &TryStatement, frame: &Frame) -> Result<Completion, Exception> {
        let mut result = self.exec_block(&stmt.block, frame);

        if let (Err(exception), Some(handler)) = (&result, &stmt.handler) {
            let catch_frame = frame.nested();
            if let Some(param) = &handler.param {
                catch_frame
                    .scope
                    .declare(param, exception.value().clone(), true);
            }
            result = self.exec_block(&handler.body, &catch_frame);
        }

        if let Some(finalizer) = &stmt.finalizer {
            // An abrupt finally overrides whatever the try/catch produced
            match self.exec_block(finalizer, frame)? {
                Completion::Normal(_) => {}
                abrupt => return Ok(abrupt),
            }
        }
        result
    }

    // Expressions

    fn eval(&mut self, expression: &Expression, frame: &Frame) -> Result<Value, Exception> {
        if self.expression_depth >= MAX_EXPRESSION_DEPTH {
            return Err(self.stack_overflow());
        }
        self.expression_depth += 1;
        let result = self.eval_expression(expression, frame);
        self.expression_depth -= 1;
        result
    }

    fn eval_expression(&mut self, expression: &Expression, frame: &Frame) -> Result<Value, Exception> {
        match expression {
            Expression::Number(n) => Ok(Value::Number(*n)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Boolean(b) => Ok(Value::Boolean(*b)),
            Expression::Null => Ok(Value::Null),
            Expression::This => Ok(frame.this.clone()),
            Expression::Identifier(name) => self.lookup(name, frame),

            Expression::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element, frame)?);
                }
                Ok(Value::Object(Object::array(values)))
            }
            Expression::Object(properties) => {
                let object = Object::ordinary();
                for property in properties {
                    let value = self.eval(&property.value, frame)?;
                    object.set(&property.key, value);
                }
                Ok(Value::Object(object))
            }
            Expression::Function(node) => {
                // A named function expression can refer to itself by name
                let scope = match &node.name {
                    Some(_) => frame.scope.child(),
                    None => frame.scope.clone(),
                };
                let closure = self.make_closure(node, &scope);
                if let Some(name) = &node.name {
                    scope.declare(name, Value::Object(closure.clone()), false);
                }
                Ok(Value::Object(closure))
            }

            Expression::Unary(op, argument) => self.eval_unary(*op, argument, frame),
            Expression::Update { op, prefix, target } => {
                let reference = self.reference(target, frame)?;
                let old = self.get_reference(&reference, frame)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.put_reference(&reference, Value::Number(new), frame)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expression::Binary(..) => self.eval_binary_chain(expression, frame),
            Expression::Logical(op, left, right) => {
                let left = self.eval(left, frame)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.to_boolean(),
                    LogicalOp::Or => left.to_boolean(),
                    LogicalOp::Coalesce => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, frame)
                }
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, frame)?.to_boolean() {
                    self.eval(consequent, frame)
                } else {
                    self.eval(alternate, frame)
                }
            }
            Expression::Assign { op, target, value } => {
                let reference = self.reference(target, frame)?;
                let value = match op {
                    AssignOp::Assign => self.eval(value, frame)?,
                    AssignOp::AddAssign => {
                        let current = self.get_reference(&reference, frame)?;
                        let rhs = self.eval(value, frame)?;
                        binary(BinaryOp::Add, &current, &rhs)
                    }
                    AssignOp::SubAssign => {
                        let current = self.get_reference(&reference, frame)?;
                        let rhs = self.eval(value, frame)?;
                        binary(BinaryOp::Sub, &current, &rhs)
                    }
                };
                self.put_reference(&reference, value.clone(), frame)?;
                Ok(value)
            }
            Expression::Member { object, property } => {
                let object = self.eval(object, frame)?;
                let key = self.property_key(property, frame)?;
                self.get_property(&object, &key)
            }
            Expression::Call { callee, arguments } => {
                let (func, this) = match callee.as_ref() {
                    Expression::Member { object, property } => {
                        let object = self.eval(object, frame)?;
                        let key = self.property_key(property, frame)?;
                        (self.get_property(&object, &key)?, object)
                    }
                    other => (self.eval(other, frame)?, Value::Undefined),
                };
                let args = self.eval_arguments(arguments, frame)?;
                if !func.is_callable() {
                    return Err(self.type_error(format!("{} is not a function", describe(callee))));
                }
                self.call(&func, this, &args)
            }
            Expression::New { callee, arguments } => {
                let func = self.eval(callee, frame)?;
                let args = self.eval_arguments(arguments, frame)?;
                if !func.is_callable() {
                    return Err(self.type_error(format!("{} is not a constructor", describe(callee))));
                }
                self.construct(&func, &args)
            }
            Expression::Sequence(expressions) => {
                let mut last = Value::Undefined;
                for expression in expressions {
                    last = self.eval(expression, frame)?;
                }
                Ok(last)
            }
        }
    }

    /// `a + b + c` nests on the left; walk that spine in a loop so long
    /// chains do not recurse.
    fn eval_binary_chain(&mut self, expression: &Expression, frame: &Frame) -> Result<Value, Exception> {
        let mut spine = Vec::new();
        let mut leftmost = expression;
        while let Expression::Binary(op, left, right) = leftmost {
            spine.push((*op, right.as_ref()));
            leftmost = left;
        }

        let mut value = self.eval(leftmost, frame)?;
        for (op, right) in spine.into_iter().rev() {
            let right = self.eval(right, frame)?;
            value = binary(op, &value, &right);
        }
        Ok(value)
    }

    fn eval_unary(
        &mut self,
        op: UnaryOp,
        argument: &Expression,
        frame: &Frame,
    ) -> Result<Value, Exception> {
        if op == UnaryOp::Typeof {
            // typeof tolerates undeclared identifiers
            if let Expression::Identifier(name) = argument {
                if frame.scope.lookup(name).is_none() && !self.global.has(name) {
                    return Ok(Value::from("undefined"));
                }
            }
        }
        let value = self.eval(argument, frame)?;
        Ok(match op {
            UnaryOp::Not => Value::Boolean(!value.to_boolean()),
            UnaryOp::Minus => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::Typeof => Value::from(value.type_of()),
            UnaryOp::Void => Value::Undefined,
        })
    }

    fn eval_arguments(
        &mut self,
        arguments: &[Expression],
        frame: &Frame,
    ) -> Result<Vec<Value>, Exception> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.eval(argument, frame)?);
        }
        Ok(values)
    }

    fn lookup(&self, name: &str, frame: &Frame) -> Result<Value, Exception> {
        if let Some(value) = frame.scope.lookup(name) {
            return Ok(value);
        }
        if self.global.has(name) {
            return Ok(self.global.get(name));
        }
        Err(self.throw(ErrorKind::ReferenceError, format!("{} is not defined", name)))
    }

    fn property_key(&mut self, property: &MemberProperty, frame: &Frame) -> Result<String, Exception> {
        Ok(match property {
            MemberProperty::Named(name) => name.clone(),
            MemberProperty::Computed(expression) => match self.eval(expression, frame)? {
                Value::Number(n) => number_to_string(n),
                other => other.to_display_string(),
            },
        })
    }

    fn get_property(&self, object: &Value, key: &str) -> Result<Value, Exception> {
        match object {
            Value::Object(o) => Ok(o.get(key)),
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.encode_utf16().count() as f64));
                }
                Ok(key
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| s.chars().nth(index))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or_default())
            }
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                object.to_display_string(),
                key
            ))),
            _ => Ok(Value::Undefined),
        }
    }

    fn set_property(&self, object: &Value, key: &str, value: Value) -> Result<(), Exception> {
        match object {
            Value::Object(o) => {
                o.set(key, value);
                Ok(())
            }
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                object.to_display_string(),
                key
            ))),
            // Writes to primitives are silently dropped
            _ => Ok(()),
        }
    }

    fn reference(&mut self, target: &Expression, frame: &Frame) -> Result<Reference, Exception> {
        match target {
            Expression::Identifier(name) => Ok(Reference::Binding(name.clone())),
            Expression::Member { object, property } => {
                let object = self.eval(object, frame)?;
                let key = self.property_key(property, frame)?;
                Ok(Reference::Property(object, key))
            }
            _ => Err(self.throw(ErrorKind::SyntaxError, "Invalid assignment target")),
        }
    }

    fn get_reference(&self, reference: &Reference, frame: &Frame) -> Result<Value, Exception> {
        match reference {
            Reference::Binding(name) => self.lookup(name, frame),
            Reference::Property(object, key) => self.get_property(object, key),
        }
    }

    fn put_reference(&self, reference: &Reference, value: Value, frame: &Frame) -> Result<(), Exception> {
        match reference {
            Reference::Binding(name) => match frame.scope.assign(name, value.clone()) {
                Assignment::Done => Ok(()),
                // Sloppy-mode assignment to an undeclared name creates a global
                Assignment::Unresolved => {
                    self.global.set(name, value);
                    Ok(())
                }
                Assignment::Constant => Err(self.type_error("Assignment to constant variable.")),
            },
            Reference::Property(object, key) => self.set_property(object, key, value),
        }
    }
}

/// Declares every `var` reachable from a function body without crossing
/// into nested functions.
fn hoist_vars(statements: &[Statement], scope: &Scope) {
    for statement in statements {
        match statement {
            Statement::VariableDeclaration(declaration) => hoist_declaration(declaration, scope),
            Statement::Block(body) => hoist_vars(body, scope),
            Statement::If(stmt) => {
                hoist_vars(std::slice::from_ref(&*stmt.consequent), scope);
                if let Some(alternate) = &stmt.alternate {
                    hoist_vars(std::slice::from_ref(&**alternate), scope);
                }
            }
            Statement::While(stmt) => hoist_vars(std::slice::from_ref(&*stmt.body), scope),
            Statement::For(stmt) => {
                if let Some(ForInit::Variable(declaration)) = &stmt.init {
                    hoist_declaration(declaration, scope);
                }
                hoist_vars(std::slice::from_ref(&*stmt.body), scope);
            }
            Statement::Try(stmt) => {
                hoist_vars(&stmt.block, scope);
                if let Some(handler) = &stmt.handler {
                    hoist_vars(&handler.body, scope);
                }
                if let Some(finalizer) = &stmt.finalizer {
                    hoist_vars(finalizer, scope);
                }
            }
            _ => {}
        }
    }
}

fn hoist_declaration(declaration: &VariableDeclaration, scope: &Scope) {
    if declaration.kind == VariableKind::Var {
        for declarator in &declaration.declarations {
            scope.declare_var(&declarator.name);
        }
    }
}

/// Evaluates a binary operator on two already-evaluated operands.
fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if is_stringish(left) || is_stringish(right) {
                let mut s = left.to_display_string();
                s.push_str(&right.to_display_string());
                Value::String(s)
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => Value::Boolean(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Boolean(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::LtEq => Value::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::GtEq => Value::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => Value::Boolean(left.loose_equals(right)),
        BinaryOp::NotEq => Value::Boolean(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Boolean(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Boolean(!left.strict_equals(right)),
    }
}

/// Objects convert to strings before `+` and comparisons.
fn is_stringish(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Object(_))
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if is_stringish(left) && is_stringish(right) {
        return Some(left.to_display_string().cmp(&right.to_display_string()));
    }
    left.to_number().partial_cmp(&right.to_number())
}

/// A short source-like rendering of a callee for error messages.
fn describe(expression: &Expression) -> String {
    match expression {
        Expression::Identifier(name) => name.clone(),
        Expression::This => "this".to_string(),
        Expression::Member { object, property } => match property {
            MemberProperty::Named(name) => format!("{}.{}", describe(object), name),
            MemberProperty::Computed(_) => format!("{}[...]", describe(object)),
        },
        Expression::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Value {
        let mut runtime = Runtime::new();
        runtime.run_string("test.js", source).unwrap()
    }

    fn eval_err(source: &str) -> Exception {
        let mut runtime = Runtime::new();
        match runtime.run_string("test.js", source) {
            Err(Error::Exception(exception)) => exception,
            other => panic!("expected exception, got {other:?}"),
        }
    }

    fn error_message(exception: &Exception) -> String {
        exception
            .value()
            .as_object()
            .map(|o| o.get("message").to_display_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_arithmetic_and_strings() {
        assert_eq!(eval("1 + 2 * 3"), Value::from(7));
        assert_eq!(eval("'a' + 1 + 2"), Value::from("a12"));
        assert_eq!(eval("7 % 4"), Value::from(3));
        assert_eq!(eval("'3' * '4'"), Value::from(12));
        assert_eq!(eval("'b' > 'a'"), Value::from(true));
    }

    #[test]
    fn test_completion_value_is_last_expression() {
        assert_eq!(eval("var a = 1; a + 1; var b = 2;"), Value::from(2));
        assert_eq!(eval("if (true) { 'yes' } else { 'no' }"), Value::from("yes"));
    }

    #[test]
    fn test_functions_and_closures() {
        let source = "
            function counter() {
                var n = 0;
                return function () { n += 1; return n; };
            }
            var c = counter();
            c(); c();
            c()
        ";
        assert_eq!(eval(source), Value::from(3));
    }

    #[test]
    fn test_hoisting() {
        assert_eq!(eval("var r = f(); function f() { return 'hoisted' } r"), Value::from("hoisted"));
        assert_eq!(eval("typeof x; var x = 1; typeof y"), Value::from("undefined"));
    }

    #[test]
    fn test_this_binding_for_method_calls() {
        let source = "var o = { v: 42, get: function () { return this.v } }; o.get()";
        assert_eq!(eval(source), Value::from(42));
    }

    #[test]
    fn test_loops() {
        let source = "
            var total = 0;
            for (var i = 0; i < 10; i++) {
                if (i == 2) continue;
                if (i == 5) break;
                total += i;
            }
            var j = 0;
            while (j < 3) j++;
            total + j
        ";
        assert_eq!(eval(source), Value::from(11));
    }

    #[test]
    fn test_try_catch_finally() {
        let source = "
            var log = '';
            try { throw 'x' } catch (e) { log += e } finally { log += 'f' }
            try { try { throw 1 } finally { log += 'g' } } catch (e) { log += e }
            log
        ";
        assert_eq!(eval(source), Value::from("xfg1"));
    }

    #[test]
    fn test_thrown_value_is_preserved() {
        let exception = eval_err("throw 'test passed';");
        assert_eq!(exception.value(), &Value::from("test passed"));
    }

    #[test]
    fn test_reference_error() {
        let exception = eval_err("missing + 1");
        assert_eq!(error_message(&exception), "missing is not defined");
        assert_eq!(exception.to_string(), "ReferenceError: missing is not defined");
    }

    #[test]
    fn test_call_non_function() {
        let exception = eval_err("var o = {}; o.nope()");
        assert_eq!(error_message(&exception), "o.nope is not a function");
    }

    #[test]
    fn test_read_property_of_undefined() {
        let exception = eval_err("var u; u.x");
        assert_eq!(
            error_message(&exception),
            "Cannot read properties of undefined (reading 'x')"
        );
    }

    #[test]
    fn test_const_assignment() {
        let exception = eval_err("const c = 1; c = 2;");
        assert_eq!(error_message(&exception), "Assignment to constant variable.");
    }

    #[test]
    fn test_new_error() {
        assert_eq!(eval("new Error('boom').message"), Value::from("boom"));
        assert_eq!(eval("var e = TypeError('t'); e.name"), Value::from("TypeError"));
        assert_eq!(eval("function P(x) { this.x = x } new P(3).x"), Value::from(3));
    }

    #[test]
    fn test_drop_releases_global_cycles() {
        let marker = std::rc::Rc::new(());
        let mut runtime = Runtime::new();
        let held = marker.clone();
        let func = runtime.new_function("marker", move |_rt, _this, _args| {
            let _ = &held;
            Ok(Value::Undefined)
        });
        runtime.set_global("marker", Value::Object(func));
        runtime
            .run_string(
                "test.js",
                "var holder = { f: marker }; function get() { return holder; } globalThis.again = globalThis;",
            )
            .unwrap();
        assert_eq!(std::rc::Rc::strong_count(&marker), 2);
        drop(runtime);
        assert_eq!(std::rc::Rc::strong_count(&marker), 1);
    }

    #[test]
    fn test_call_depth_limit() {
        let exception = eval_err("function f() { return f() } f()");
        assert_eq!(error_message(&exception), "Maximum call stack size exceeded");
        assert_eq!(eval("function g(n) { return n == 0 ? 0 : g(n - 1) } g(50)"), Value::from(0));
    }

    /// Runs `test` on a thread sized like the CLI's, so the depth limits
    /// are reached before the native stack runs out in debug builds.
    fn on_large_stack<T: Send + 'static>(test: impl FnOnce() -> T + Send + 'static) -> T {
        std::thread::Builder::new()
            .stack_size(crate::RECOMMENDED_STACK_SIZE)
            .spawn(test)
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn test_native_calls_do_not_count_toward_call_depth() {
        let value = on_large_stack(|| {
            let mut runtime = Runtime::new();
            let relay = runtime.new_function("relay", |rt, _this, args| {
                let next = args.first().cloned().unwrap_or_default();
                rt.call(&next, Value::Undefined, &args[1..])
            });
            runtime.set_global("relay", relay);
            let source = format!(
                "function f(n) {{ return n == 0 ? 'done' : relay(f, n - 1) }} f({})",
                MAX_CALL_DEPTH - 8
            );
            runtime.run_string("relay.js", &source).unwrap().to_display_string()
        });
        assert_eq!(value, "done");
    }

    #[test]
    fn test_long_binary_chain() {
        let source = format!("1{}", " + 1".repeat(2000));
        assert_eq!(eval(&source), Value::from(2001));
        assert_eq!(eval("'a' + 1 + 2"), Value::from("a12"));
        assert_eq!(eval("10 - 2 - 3"), Value::from(5));
    }

    #[test]
    fn test_expression_depth_limit() {
        let (message, shallow) = on_large_stack(|| {
            // Member chains are built by a loop in the parser, so only evaluation bounds them
            let deep = format!("var o = {{}}; o.o = o; o{}", ".o".repeat(MAX_EXPRESSION_DEPTH + 10));
            let shallow = format!("var o = {{}}; o.o = o; o{}.o === o", ".o".repeat(50));
            (error_message(&eval_err(&deep)), eval(&shallow).to_boolean())
        });
        assert_eq!(message, "Maximum call stack size exceeded");
        assert!(shallow);
    }

    #[test]
    fn test_globals_persist_between_runs() {
        let mut runtime = Runtime::new();
        runtime.run_string("a.js", "var shared = 40; implicit = 2;").unwrap();
        let value = runtime.run_string("b.js", "shared + implicit").unwrap();
        assert_eq!(value, Value::from(42));
        assert_eq!(runtime.get_global("shared"), Value::from(40));
        assert_eq!(runtime.global().get("implicit"), Value::from(2));
    }

    #[test]
    fn test_native_function() {
        let mut runtime = Runtime::new();
        let add = runtime.new_function("add", |_rt, _this, args| {
            let sum: f64 = args.iter().map(Value::to_number).sum();
            Ok(Value::Number(sum))
        });
        runtime.set_global("add", add);
        assert_eq!(runtime.run_string("t.js", "add(1, 2, 3)").unwrap(), Value::from(6));
        assert_eq!(runtime.run_string("t.js", "typeof add").unwrap(), Value::from("function"));
    }

    #[test]
    fn test_call_from_host() {
        let mut runtime = Runtime::new();
        let f = runtime
            .run_string("f.js", "(function (a, b) { return this.base + a + b })")
            .unwrap();
        let this = runtime.new_object();
        this.set("base", Value::from(10));
        let result = runtime
            .call(&f, Value::Object(this), &[Value::from(1), Value::from(2)])
            .unwrap();
        assert_eq!(result, Value::from(13));
    }

    #[test]
    fn test_arrays_and_strings() {
        assert_eq!(eval("var a = [1, 2]; a[2] = 3; a.length"), Value::from(3));
        assert_eq!(eval("'héllo'.length"), Value::from(5));
        assert_eq!(eval("'abc'[1]"), Value::from("b"));
        assert_eq!(eval("[1, [2, 3]] + ''"), Value::from("1,2,3"));
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(eval("null ?? 'd'"), Value::from("d"));
        assert_eq!(eval("0 ?? 'd'"), Value::from(0));
        assert_eq!(eval("0 || 'x'"), Value::from("x"));
        assert_eq!(eval("1 && 'y'"), Value::from("y"));
    }

    #[test]
    fn test_named_function_expression_recursion() {
        let source = "var fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1) }; fact(5)";
        assert_eq!(eval(source), Value::from(120));
    }
}
