// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Heap objects.

use super::function::Callable;
use super::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A handle to a heap object. Cloning the handle aliases the same object.
#[derive(Clone)]
pub struct Object(Rc<RefCell<ObjectData>>);

/// What kind of object a handle refers to.
#[derive(Clone)]
pub enum ObjectKind {
    /// A plain `{}` object
    Ordinary,
    /// An array with dense element storage
    Array(Vec<Value>),
    /// An error object (`name` and `message` are hidden properties)
    Error,
    /// A script or native function
    Function(Callable),
}

struct PropertySlot {
    key: String,
    value: Value,
    enumerable: bool,
}

struct ObjectData {
    kind: ObjectKind,
    // Insertion order is observable through keys() and JSON.stringify
    properties: Vec<PropertySlot>,
}

impl Object {
    /// Allocates an object of the given kind with no properties.
    pub fn new(kind: ObjectKind) -> Self {
        Object(Rc::new(RefCell::new(ObjectData {
            kind,
            properties: Vec::new(),
        })))
    }

    /// Allocates an empty ordinary object.
    pub fn ordinary() -> Self {
        Self::new(ObjectKind::Ordinary)
    }

    /// Allocates an array holding `elements`.
    pub fn array(elements: Vec<Value>) -> Self {
        Self::new(ObjectKind::Array(elements))
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A stable identity for cycle detection.
    pub fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    /// Reads a property, returning `undefined` when absent.
    pub fn get(&self, key: &str) -> Value {
        let data = self.0.borrow();
        if let ObjectKind::Array(elements) = &data.kind {
            if key == "length" {
                return Value::Number(elements.len() as f64);
            }
            if let Some(index) = array_index(key) {
                return elements.get(index).cloned().unwrap_or_default();
            }
        }
        data.properties
            .iter()
            .find(|slot| slot.key == key)
            .map(|slot| slot.value.clone())
            .unwrap_or_default()
    }

    /// Writes an enumerable property, keeping its original position if it exists.
    pub fn set(&self, key: &str, value: Value) {
        let mut data = self.0.borrow_mut();
        if let ObjectKind::Array(elements) = &mut data.kind {
            if key == "length" {
                let len = value.to_number();
                if len >= 0.0 && len.fract() == 0.0 {
                    elements.resize(len as usize, Value::Undefined);
                }
                return;
            }
            if let Some(index) = array_index(key) {
                if index >= elements.len() {
                    elements.resize(index + 1, Value::Undefined);
                }
                elements[index] = value;
                return;
            }
        }
        if let Some(slot) = data.properties.iter_mut().find(|slot| slot.key == key) {
            slot.value = value;
        } else {
            data.properties.push(PropertySlot {
                key: key.to_string(),
                value,
                enumerable: true,
            });
        }
    }

    /// Defines a property that `keys()` and serialization skip.
    pub fn define_hidden(&self, key: &str, value: Value) {
        let mut data = self.0.borrow_mut();
        if let Some(slot) = data.properties.iter_mut().find(|slot| slot.key == key) {
            slot.value = value;
            slot.enumerable = false;
        } else {
            data.properties.push(PropertySlot {
                key: key.to_string(),
                value,
                enumerable: false,
            });
        }
    }

    /// Whether the object has an own property named `key`.
    pub fn has(&self, key: &str) -> bool {
        let data = self.0.borrow();
        if let ObjectKind::Array(elements) = &data.kind {
            if key == "length" {
                return true;
            }
            if let Some(index) = array_index(key) {
                return index < elements.len();
            }
        }
        data.properties.iter().any(|slot| slot.key == key)
    }

    /// Removes an own property. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut data = self.0.borrow_mut();
        let before = data.properties.len();
        data.properties.retain(|slot| slot.key != key);
        before != data.properties.len()
    }

    /// Drops every own property and array element.
    pub(crate) fn clear(&self) {
        let (properties, kind) = {
            let mut data = self.0.borrow_mut();
            let kind = match &mut data.kind {
                ObjectKind::Array(elements) => Some(std::mem::take(elements)),
                _ => None,
            };
            (std::mem::take(&mut data.properties), kind)
        };
        drop(properties);
        drop(kind);
    }

    /// Own enumerable keys: array indices first, then properties in insertion order.
    pub fn keys(&self) -> Vec<String> {
        let data = self.0.borrow();
        let mut keys = Vec::new();
        if let ObjectKind::Array(elements) = &data.kind {
            keys.extend((0..elements.len()).map(|i| i.to_string()));
        }
        keys.extend(
            data.properties
                .iter()
                .filter(|slot| slot.enumerable)
                .map(|slot| slot.key.clone()),
        );
        keys
    }

    /// Own enumerable key/value pairs, in `keys()` order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.keys()
            .into_iter()
            .map(|key| {
                let value = self.get(&key);
                (key, value)
            })
            .collect()
    }

    /// Returns a copy of the elements if this is an array.
    pub fn array_elements(&self) -> Option<Vec<Value>> {
        match &self.0.borrow().kind {
            ObjectKind::Array(elements) => Some(elements.clone()),
            _ => None,
        }
    }

    /// Appends to an array. Does nothing for other objects.
    pub fn push(&self, value: Value) {
        if let ObjectKind::Array(elements) = &mut self.0.borrow_mut().kind {
            elements.push(value);
        }
    }

    /// Returns the function behind this object, if it is callable.
    pub fn callable(&self) -> Option<Callable> {
        match &self.0.borrow().kind {
            ObjectKind::Function(callable) => Some(callable.clone()),
            _ => None,
        }
    }

    /// Returns true if the object is a function.
    pub fn is_callable(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Function(_))
    }

    /// Returns true if the object is an array.
    pub fn is_array(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Array(_))
    }

    /// Returns true if the object is an error.
    pub fn is_error(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Error)
    }

    /// The built-in class this object belongs to.
    pub fn kind_name(&self) -> &'static str {
        match self.0.borrow().kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Error => "Error",
            ObjectKind::Function(_) => "Function",
        }
    }
}

impl fmt::Debug for Object {
    // Shallow, so cyclic graphs print without recursing
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {:p}]", self.kind_name(), self.as_ptr())
    }
}

/// Parses a canonical array index ("0", "17", never "01").
fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_keep_insertion_order() {
        let object = Object::ordinary();
        object.set("b", Value::from(1));
        object.set("a", Value::from(2));
        object.set("b", Value::from(3));
        assert_eq!(object.keys(), vec!["b", "a"]);
        assert_eq!(object.get("b"), Value::from(3));
        assert!(object.get("missing").is_undefined());
    }

    #[test]
    fn test_hidden_properties() {
        let object = Object::ordinary();
        object.define_hidden("secret", Value::from("x"));
        object.set("shown", Value::Null);
        assert_eq!(object.keys(), vec!["shown"]);
        assert!(object.has("secret"));
        assert_eq!(object.get("secret"), Value::from("x"));
    }

    #[test]
    fn test_array_indices_and_length() {
        let array = Object::array(vec![Value::from(1)]);
        array.set("2", Value::from(3));
        assert_eq!(array.get("length"), Value::from(3));
        assert!(array.get("1").is_undefined());
        array.set("length", Value::from(1));
        assert_eq!(array.array_elements().unwrap(), vec![Value::from(1)]);
        assert!(!array.has("01"));
        array.push(Value::from("x"));
        assert_eq!(array.keys(), vec!["0", "1"]);
    }

    #[test]
    fn test_identity() {
        let a = Object::ordinary();
        let alias = a.clone();
        assert!(a.ptr_eq(&alias));
        assert!(!a.ptr_eq(&Object::ordinary()));
    }

    #[test]
    fn test_delete() {
        let object = Object::ordinary();
        object.set("x", Value::from(1));
        assert!(object.delete("x"));
        assert!(!object.delete("x"));
        assert!(!object.has("x"));
    }
}
