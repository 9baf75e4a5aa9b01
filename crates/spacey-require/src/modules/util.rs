// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Node.js `util` module implementation

use crate::error::{RequireError, Result};
use crate::module_system::NativeModule;
use spacey_script::builtins::number_to_json;
use spacey_script::runtime::number_to_string;
use spacey_script::{Object, Runtime, Value};

/// Name the module is registered under
pub const MODULE_NAME: &str = "node:util";

/// Placeholder `%j` prints for an object that contains itself
pub const CIRCULAR: &str = "[Circular]";

/// The `node:util` native module. Exports `format`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Util;

impl NativeModule for Util {
    fn enable(&self, _runtime: &mut Runtime) -> Result<()> {
        Ok(())
    }

    fn export(&self, runtime: &mut Runtime, module: &Object) -> Result<()> {
        let exports = module
            .get("exports")
            .as_object()
            .cloned()
            .ok_or_else(|| RequireError::Native(format!("{} has no exports object", MODULE_NAME)))?;
        let format_fn = runtime.new_function("format", |_rt, _this, args| Ok(Value::String(format_args(args))));
        exports.set("format", Value::Object(format_fn));
        Ok(())
    }
}

/// `util.format(...args)`: the first argument is the format string unless
/// it is undefined.
pub fn format_args(args: &[Value]) -> String {
    match args.split_first() {
        Some((fmt, rest)) if !fmt.is_undefined() => format(&fmt.to_display_string(), rest),
        Some((_, rest)) => format("", rest),
        None => String::new(),
    }
}

/// util.format(format, ...args) - Printf-like formatting
///
/// Supports `%s`, `%d`, `%i`, `%j` and `%%`. Specifiers with no argument
/// left are copied through; unknown specifiers are copied through without
/// consuming an argument; leftover arguments are appended after a space.
pub fn format(fmt: &str, args: &[Value]) -> String {
    let mut result = String::new();
    let mut arg_index = 0;
    let mut chars = fmt.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            result.push(c);
            continue;
        }
        // A trailing lone '%' is dropped
        let Some(verb) = chars.next() else { break };

        if arg_index >= args.len() {
            result.push('%');
            result.push(verb);
            continue;
        }
        let arg = &args[arg_index];
        match verb {
            's' => result.push_str(&arg.to_display_string()),
            'd' => result.push_str(&number_to_string(arg.to_number())),
            'i' => result.push_str(&integer_string(arg.to_number())),
            'j' => result.push_str(&json_with_circular(arg)),
            '%' => {
                result.push('%');
                continue;
            }
            other => {
                result.push('%');
                result.push(other);
                continue;
            }
        }
        arg_index += 1;
    }

    for arg in &args[arg_index..] {
        result.push(' ');
        result.push_str(&arg.to_display_string());
    }
    result
}

fn integer_string(n: f64) -> String {
    if n.is_finite() {
        number_to_string(n.trunc())
    } else {
        number_to_string(n)
    }
}

/// JSON for `%j`. Where JSON.stringify would throw on a cycle, the
/// repeated object is written as `[Circular]` instead.
pub fn json_with_circular(value: &Value) -> String {
    let mut ancestors = Vec::new();
    let mut out = String::new();
    if !write_json(value, &mut ancestors, &mut out) {
        return "undefined".to_string();
    }
    out
}

/// Appends the JSON form of `value`; returns false for values JSON skips.
fn write_json(value: &Value, ancestors: &mut Vec<Object>, out: &mut String) -> bool {
    match value {
        Value::Undefined => return false,
        Value::Null => out.push_str("null"),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if n.is_finite() {
                out.push_str(&number_to_json(*n).to_string());
            } else {
                out.push_str("null");
            }
        }
        Value::String(s) => out.push_str(&quote(s)),
        Value::Object(object) => {
            if object.is_callable() {
                return false;
            }
            if ancestors.iter().any(|a| a.ptr_eq(object)) {
                out.push_str(CIRCULAR);
                return true;
            }
            ancestors.push(object.clone());
            if let Some(elements) = object.array_elements() {
                out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if !write_json(element, ancestors, out) {
                        out.push_str("null");
                    }
                }
                out.push(']');
            } else {
                out.push('{');
                let mut first = true;
                for (key, property) in object.entries() {
                    let mut item = String::new();
                    if !write_json(&property, ancestors, &mut item) {
                        continue;
                    }
                    if !first {
                        out.push(',');
                    }
                    first = false;
                    out.push_str(&quote(&key));
                    out.push(':');
                    out.push_str(&item);
                }
                out.push('}');
            }
            ancestors.pop();
        }
    }
    true
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
