// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! JavaScript value representation.

use super::object::Object;
use std::fmt;

/// A JavaScript value.
///
/// Objects are reference-counted handles owned by a single runtime, so a
/// `Value` is neither `Send` nor `Sync`.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Object reference (ordinary objects, arrays, errors, functions)
    Object(Object),
}

/// Strict equality (`===`).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN compares unequal to itself through IEEE semantics
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value is nullish (null or undefined).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true if this value can be called.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Object(o) if o.is_callable())
    }

    /// Returns the object handle, if this is an object.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Returns the string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value to a boolean (ToBoolean).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !(*n == 0.0 || n.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Converts the value to a number (ToNumber).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) => string_to_number(&self.to_display_string()),
        }
    }

    /// Converts the value to a string (ToString).
    pub fn to_display_string(&self) -> String {
        let mut seen = Vec::new();
        self.display_into(&mut seen)
    }

    fn display_into(&self, seen: &mut Vec<Object>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Object(o) => {
                let kind = o.kind_name();
                match kind {
                    "Array" => {
                        // Cyclic arrays render the repeated reference as empty
                        if seen.iter().any(|s| s.ptr_eq(o)) {
                            return String::new();
                        }
                        seen.push(o.clone());
                        let parts: Vec<String> = o
                            .array_elements()
                            .unwrap_or_default()
                            .iter()
                            .map(|v| {
                                if v.is_nullish() {
                                    String::new()
                                } else {
                                    v.display_into(seen)
                                }
                            })
                            .collect();
                        seen.pop();
                        parts.join(",")
                    }
                    "Error" => {
                        let name = o.get("name");
                        let message = o.get("message");
                        let name = if name.is_undefined() {
                            "Error".to_string()
                        } else {
                            name.display_into(seen)
                        };
                        let message = if message.is_undefined() {
                            String::new()
                        } else {
                            message.display_into(seen)
                        };
                        match (name.is_empty(), message.is_empty()) {
                            (_, true) => name,
                            (true, false) => message,
                            (false, false) => format!("{}: {}", name, message),
                        }
                    }
                    "Function" => {
                        format!("function {}() {{ [native code] }}", o.get("name").display_into(seen))
                    }
                    _ => "[object Object]".to_string(),
                }
            }
        }
    }

    /// Returns the result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(o) if o.is_callable() => "function",
            Value::Object(_) => "object",
        }
    }

    /// Strict equality (`===`).
    pub fn strict_equals(&self, other: &Value) -> bool {
        self == other
    }

    /// Abstract equality (`==`).
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,

            // If one is number and other is string, convert string to number
            (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
                *n == string_to_number(s)
            }

            // If one is boolean, convert it to number and compare
            (Value::Boolean(b), other) | (other, Value::Boolean(b)) => {
                let num = if *b { 1.0 } else { 0.0 };
                Value::Number(num).loose_equals(other)
            }

            // Object against primitive compares through ToPrimitive
            (Value::Number(_) | Value::String(_), Value::Object(o))
            | (Value::Object(o), Value::Number(_) | Value::String(_)) => {
                let primitive = Value::String(Value::Object(o.clone()).to_display_string());
                let primitive_side = if matches!(self, Value::Object(_)) { other } else { self };
                primitive.loose_equals(primitive_side)
            }

            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_display_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

/// Formats a number the way `Number.prototype.toString()` does.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }
    // Exponential form; JavaScript always signs the exponent
    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

/// StringToNumber for the literal forms the interpreter understands.
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust accepts spellings like "inf" and "NaN" that JavaScript rejects
    if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}
