// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error constructors.

use crate::runtime::{Object, ObjectKind, Value};
use crate::vm::Runtime;

/// The built-in error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
}

impl ErrorKind {
    const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
    ];

    /// The constructor name, also used as the error's `name` property.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
        }
    }
}

/// Allocates an error object with hidden `name` and `message`.
pub fn make_error(name: &str, message: &str) -> Object {
    let error = Object::new(ObjectKind::Error);
    error.define_hidden("name", Value::from(name));
    error.define_hidden("message", Value::from(message));
    error
}

pub(super) fn install(runtime: &mut Runtime) {
    for kind in ErrorKind::ALL {
        let name = kind.name();
        // Called with or without `new`, the constructor returns a fresh error
        let constructor = runtime.new_function(name, move |_rt, _this, args| {
            let message = match args.first() {
                None | Some(Value::Undefined) => String::new(),
                Some(value) => value.to_display_string(),
            };
            Ok(Value::Object(make_error(name, &message)))
        });
        runtime.global().define_hidden(name, Value::Object(constructor));
    }
}
