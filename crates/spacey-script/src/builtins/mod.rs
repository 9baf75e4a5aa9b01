// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in globals.
//!
//! - `globalThis`, `undefined`, `NaN`, `Infinity`
//! - `Error`, `TypeError`, `RangeError`, `ReferenceError`, `SyntaxError`
//! - `JSON.parse` / `JSON.stringify`

mod error;
mod json;

pub use error::{ErrorKind, make_error};
pub use json::{CircularStructure, json_to_value, number_to_json, value_to_json};

use crate::runtime::Value;
use crate::vm::Runtime;

/// Installs every built-in on a fresh runtime.
pub(crate) fn install(runtime: &mut Runtime) {
    let global = runtime.global().clone();
    global.define_hidden("globalThis", Value::Object(global.clone()));
    global.define_hidden("undefined", Value::Undefined);
    global.define_hidden("NaN", Value::Number(f64::NAN));
    global.define_hidden("Infinity", Value::Number(f64::INFINITY));

    error::install(runtime);
    json::install(runtime);
}
