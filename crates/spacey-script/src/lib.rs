// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-script
//!
//! A small embeddable JavaScript interpreter.
//!
//! ## Overview
//!
//! The language covered is the subset CommonJS module bodies actually use:
//! `var`/`let`/`const`, functions and closures, objects and arrays, the
//! usual operators, `if`/`while`/`for`, `try`/`catch`/`finally`, and
//! `throw` of arbitrary values. Built-ins are limited to the error
//! constructors and `JSON`.
//!
//! Compilation and execution are separate steps. A [`Program`] is immutable
//! and `Send + Sync`, so one compiled program can be run by many
//! [`Runtime`]s on different threads; each runtime is single-threaded.
//!
//! ## Quick Start
//!
//! ```rust
//! use spacey_script::{Program, Runtime, Value};
//!
//! let program = Program::compile("sum.js", "var x = 1 + 2; x * 2").unwrap();
//! let mut runtime = Runtime::new();
//! assert_eq!(runtime.run_program(&program).unwrap(), Value::Number(6.0));
//! ```

#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

use std::sync::Arc;

pub use builtins::ErrorKind;
pub use runtime::{Exception, NativeFn, Object, ObjectKind, Value};
pub use vm::Runtime;

/// Stack size for threads that run a [`Runtime`].
///
/// Deep enough that [`vm::MAX_CALL_DEPTH`], [`vm::MAX_EXPRESSION_DEPTH`]
/// and [`parser::MAX_NESTING_DEPTH`] are reached, and reported as errors,
/// before the thread's own stack is exhausted, unoptimized builds included.
pub const RECOMMENDED_STACK_SIZE: usize = 16 * 1024 * 1024;

/// A compiled unit of source code.
///
/// Cloning is cheap; clones share the parsed tree.
#[derive(Debug, Clone)]
pub struct Program {
    name: Arc<str>,
    file: Arc<ast::SourceFile>,
}

impl Program {
    /// Parses `source`. Syntax errors are reported as `name:line:column`.
    pub fn compile(name: &str, source: &str) -> Result<Program, Error> {
        let mut parser = parser::Parser::with_name(name, source);
        let file = parser.parse_source_file()?;
        Ok(Program {
            name: Arc::from(name),
            file: Arc::new(file),
        })
    }

    /// The name the program was compiled under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn body(&self) -> &[ast::Statement] {
        &self.file.body
    }
}

/// Errors that can occur while compiling or running code.
#[derive(Debug, Clone)]
pub enum Error {
    /// The source failed to parse
    SyntaxError(String),
    /// Execution threw a value
    Exception(Exception),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SyntaxError(msg) => write!(f, "SyntaxError: {}", msg),
            Error::Exception(exception) => write!(f, "Uncaught {}", exception),
        }
    }
}

impl std::error::Error for Error {}

impl From<Exception> for Error {
    fn from(exception: Exception) -> Self {
        Error::Exception(exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_program_is_shareable() {
        assert_send_sync::<Program>();
    }

    #[test]
    fn test_compile_error_display() {
        let err = Program::compile("bad.js", "var = 1").unwrap_err();
        assert_eq!(err.to_string(), "SyntaxError: bad.js:1:5: unexpected token '='");
    }

    #[test]
    fn test_program_reuse_across_runtimes() {
        let program = Program::compile("counter.js", "var n = (n || 0) + 1; n").unwrap();
        assert_eq!(program.name(), "counter.js");
        let mut first = Runtime::new();
        let mut second = Runtime::new();
        assert_eq!(first.run_program(&program).unwrap(), Value::Number(1.0));
        assert_eq!(first.run_program(&program).unwrap(), Value::Number(2.0));
        assert_eq!(second.run_program(&program).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_uncaught_display() {
        let mut runtime = Runtime::new();
        let err = runtime.run_string("t.js", "throw new TypeError('nope')").unwrap_err();
        assert_eq!(err.to_string(), "Uncaught TypeError: nope");
    }
}
