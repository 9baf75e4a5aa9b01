// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `console` global

use crate::error::{RequireError, Result};
use crate::module_system::NativeModule;
use crate::modules::util;
use spacey_script::{Object, Runtime, Value};
use std::io::Write;
use std::sync::Arc;

/// Name the module is registered under
pub const MODULE_NAME: &str = "node:console";

/// Receives each formatted console line.
pub trait Printer: Send + Sync {
    fn log(&self, line: &str);
    fn warn(&self, line: &str);
    fn error(&self, line: &str);
}

/// A printer that sends every level to one closure.
pub struct PrinterFn<F>(pub F);

impl<F> Printer for PrinterFn<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        (self.0)(line)
    }

    fn warn(&self, line: &str) {
        (self.0)(line)
    }

    fn error(&self, line: &str) {
        (self.0)(line)
    }
}

/// `log` to stdout, `warn` and `error` to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdPrinter;

impl Printer for StdPrinter {
    fn log(&self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
    }

    fn warn(&self, line: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }

    fn error(&self, line: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Log,
    Warn,
    Error,
}

impl Level {
    fn name(self) -> &'static str {
        match self {
            Level::Log => "log",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

/// The `node:console` native module. Enabling it installs a global
/// `console` whose methods format through `util.format`.
#[derive(Clone)]
pub struct Console {
    printer: Arc<dyn Printer>,
}

impl Console {
    pub fn new() -> Self {
        Self::with_printer(StdPrinter)
    }

    pub fn with_printer<P: Printer + 'static>(printer: P) -> Self {
        Self {
            printer: Arc::new(printer),
        }
    }

    fn method(&self, runtime: &Runtime, util: &Object, level: Level) -> Object {
        let printer = Arc::clone(&self.printer);
        let util = util.clone();
        runtime.new_function(level.name(), move |rt, _this, args| {
            let format = util.get("format");
            if !format.is_callable() {
                return Err(rt.type_error("util.format is not a function"));
            }
            let line = rt.call(&format, Value::Object(util.clone()), args)?.to_display_string();
            match level {
                Level::Log => printer.log(&line),
                Level::Warn => printer.warn(&line),
                Level::Error => printer.error(&line),
            }
            Ok(Value::Undefined)
        })
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeModule for Console {
    fn enable(&self, runtime: &mut Runtime) -> Result<()> {
        let exports = crate::require(runtime, util::MODULE_NAME)?;
        let util_object = exports
            .as_object()
            .cloned()
            .ok_or_else(|| RequireError::Native(format!("{} did not export an object", util::MODULE_NAME)))?;

        let console = runtime.new_object();
        for level in [Level::Log, Level::Error, Level::Warn] {
            let method = self.method(runtime, &util_object, level);
            console.set(level.name(), Value::Object(method));
        }
        runtime.set_global("console", console);
        Ok(())
    }

    fn export(&self, _runtime: &mut Runtime, _module: &Object) -> Result<()> {
        Ok(())
    }
}
