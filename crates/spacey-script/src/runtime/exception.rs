// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

use super::value::Value;
use std::fmt;

/// A value thrown by script code (or by the host on its behalf).
///
/// The payload is kept exactly as thrown: `throw 'boom'` surfaces as the
/// string `"boom"`, not as a wrapping error object.
#[derive(Clone, PartialEq)]
pub struct Exception {
    value: Value,
}

impl Exception {
    /// Wraps a thrown value.
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The thrown value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the exception, returning the thrown value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value.to_display_string())
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exception({:?})", self.value.to_display_string())
    }
}

impl std::error::Error for Exception {}

impl From<Value> for Exception {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
