// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-require
//!
//! Node.js-style CommonJS `require()` for the Spacey script interpreter.
//!
//! ## Overview
//!
//! A [`Registry`] holds what every runtime shares: the source loader,
//! compiled programs, native modules and global search folders. Enabling a
//! [`Runtime`](spacey_script::Runtime) installs a global `require` and
//! returns the runtime's [`ModuleResolver`].
//!
//! Resolution follows Node.js: relative and absolute paths with `.js` and
//! `.json` probing, `package.json` `main`, `index` files, `node_modules`
//! lookup up the directory tree, and global folders. Each module runs once
//! per runtime; cyclic requires see partially populated exports.
//!
//! ## Quick Start
//!
//! ```rust
//! use spacey_require::{Registry, RequireError};
//! use spacey_script::{Runtime, Value};
//!
//! let registry = Registry::with_loader(|path| match path {
//!     "/app/main.js" => Ok(b"exports.answer = require('./answer.json').value".to_vec()),
//!     "/app/answer.json" => Ok(br#"{"value": 42}"#.to_vec()),
//!     _ => Err(RequireError::ModuleNotExist),
//! });
//!
//! let mut runtime = Runtime::new();
//! let resolver = registry.enable(&mut runtime).unwrap();
//! let exports = resolver.require(&mut runtime, "/app/main").unwrap();
//! assert_eq!(exports.as_object().unwrap().get("answer"), Value::Number(42.0));
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod globals;
pub mod module_system;
pub mod modules;

pub use error::{RequireError, Result};
pub use globals::console::{Console, Printer, PrinterFn, StdPrinter};
pub use globals::process::Process;
pub use module_system::{
    CompiledModule, Module, ModuleResolver, NativeModule, Registry, RegistryBuilder, SourceLoader,
    SourceMap, default_source_loader,
};
pub use modules::util::Util;

use spacey_script::{Runtime, Value};

/// Calls the `require` installed in `runtime` from host code.
///
/// Relative specifiers resolve from the module or script currently
/// executing, or from `.` when called outside of any.
pub fn require(runtime: &mut Runtime, name: &str) -> Result<Value> {
    let require = runtime.get_global("require");
    if !require.is_callable() {
        return Err(RequireError::NotEnabled);
    }
    Ok(runtime.call(&require, Value::Undefined, &[Value::from(name)])?)
}

/// Registers `node:util`, `node:console` and `node:process` with their
/// default settings.
pub fn register_builtins(registry: &Registry) {
    registry.register_native_module(modules::util::MODULE_NAME, Util);
    registry.register_native_module(globals::console::MODULE_NAME, Console::new());
    registry.register_native_module(globals::process::MODULE_NAME, Process::new());
}
