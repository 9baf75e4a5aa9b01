// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `JSON` object, backed by `serde_json`.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::ErrorKind;
use crate::runtime::{Exception, Object, Value};
use crate::vm::Runtime;

/// Largest integer an f64 represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(super) fn install(runtime: &mut Runtime) {
    let json = runtime.new_object();
    json.define_hidden("parse", Value::Object(runtime.new_function("parse", parse)));
    json.define_hidden(
        "stringify",
        Value::Object(runtime.new_function("stringify", stringify)),
    );
    runtime.global().define_hidden("JSON", Value::Object(json));
}

fn parse(runtime: &mut Runtime, _this: &Value, args: &[Value]) -> Result<Value, Exception> {
    let text = args.first().cloned().unwrap_or_default().to_display_string();
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| runtime.throw(ErrorKind::SyntaxError, format!("JSON.parse: {}", e)))?;
    Ok(json_to_value(&json))
}

fn stringify(runtime: &mut Runtime, _this: &Value, args: &[Value]) -> Result<Value, Exception> {
    let value = args.first().cloned().unwrap_or_default();
    let indent = match args.get(2) {
        Some(Value::Number(n)) if *n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Some(Value::String(s)) => s.chars().take(10).collect(),
        _ => String::new(),
    };

    let json = value_to_json(&value).map_err(|_| {
        runtime.type_error("Converting circular structure to JSON")
    })?;
    let Some(json) = json else {
        return Ok(Value::Undefined);
    };

    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = Serializer::with_formatter(&mut buf, formatter);
        json.serialize(&mut serializer)
            .map(|()| String::from_utf8_lossy(&buf).into_owned())
    };
    text.map(Value::String)
        .map_err(|e| runtime.throw_error(format!("JSON.stringify: {}", e)))
}

/// Converts parsed JSON into script values, keeping key order.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Object(Object::array(items.iter().map(json_to_value).collect()))
        }
        serde_json::Value::Object(map) => {
            let object = Object::ordinary();
            for (key, value) in map {
                object.set(key, json_to_value(value));
            }
            Value::Object(object)
        }
    }
}

/// Returned by [`value_to_json`] when an object contains itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircularStructure;

/// Converts a script value to JSON the way `JSON.stringify` does.
///
/// `Ok(None)` means the value has no JSON form (`undefined` or a function).
pub fn value_to_json(value: &Value) -> Result<Option<serde_json::Value>, CircularStructure> {
    let mut stack = Vec::new();
    to_json(value, &mut stack)
}

fn to_json(
    value: &Value,
    stack: &mut Vec<Object>,
) -> Result<Option<serde_json::Value>, CircularStructure> {
    let object = match value {
        Value::Undefined => return Ok(None),
        Value::Null => return Ok(Some(serde_json::Value::Null)),
        Value::Boolean(b) => return Ok(Some(serde_json::Value::Bool(*b))),
        Value::Number(n) => return Ok(Some(number_to_json(*n))),
        Value::String(s) => return Ok(Some(serde_json::Value::String(s.clone()))),
        Value::Object(o) if o.is_callable() => return Ok(None),
        Value::Object(o) => o,
    };

    if stack.iter().any(|ancestor| ancestor.ptr_eq(object)) {
        return Err(CircularStructure);
    }
    stack.push(object.clone());

    let json = if let Some(elements) = object.array_elements() {
        let mut items = Vec::with_capacity(elements.len());
        for element in &elements {
            items.push(to_json(element, stack)?.unwrap_or(serde_json::Value::Null));
        }
        serde_json::Value::Array(items)
    } else {
        let mut map = serde_json::Map::new();
        for (key, value) in object.entries() {
            if let Some(json) = to_json(&value, stack)? {
                map.insert(key, json);
            }
        }
        serde_json::Value::Object(map)
    };

    stack.pop();
    Ok(Some(json))
}

/// Integral numbers serialize without a fractional part; NaN and the
/// infinities become `null`.
pub fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
