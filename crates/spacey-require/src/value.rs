// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host-side JavaScript values and objects.
//!
//! Module exports and namespace objects are shared between require
//! capabilities, so objects are reference counted and compared by identity.

use crate::error::Result;
use crate::globals::LazyBinding;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A JavaScript value.
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
    /// Object reference
    Object(Arc<JsObject>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN != NaN falls out of f64 comparison
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Wrap an object into a value
    pub fn object(obj: JsObject) -> Self {
        Value::Object(Arc::new(obj))
    }

    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns the string contents if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the object if this value is an object.
    pub fn as_object(&self) -> Option<&Arc<JsObject>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object", // Historical quirk
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "[object Object]"),
        }
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

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => {
                let obj = JsObject::new();
                for (i, v) in arr.iter().enumerate() {
                    obj.set(&i.to_string(), Value::from(v));
                }
                obj.define(
                    "length",
                    Value::Number(arr.len() as f64),
                    PropertyFlags::HIDDEN,
                );
                Value::object(obj)
            }
            serde_json::Value::Object(map) => {
                let obj = JsObject::new();
                for (k, v) in map {
                    obj.set(k, Value::from(v));
                }
                Value::object(obj)
            }
        }
    }
}

/// Attributes of an own property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags {
    /// Shows up in `keys()`
    pub enumerable: bool,
    /// Can be deleted or redefined
    pub configurable: bool,
}

impl PropertyFlags {
    /// Ordinary assignment semantics
    pub const DEFAULT: PropertyFlags = PropertyFlags {
        enumerable: true,
        configurable: true,
    };

    /// Configurable but hidden from enumeration
    pub const HIDDEN: PropertyFlags = PropertyFlags {
        enumerable: false,
        configurable: true,
    };
}

/// What a property slot holds
#[derive(Debug, Clone)]
enum Slot {
    Data(Value),
    Lazy(Arc<LazyBinding>),
}

#[derive(Debug, Clone)]
struct Property {
    slot: Slot,
    flags: PropertyFlags,
}

/// A plain JavaScript object with own properties.
///
/// Lazy slots stand in for accessor properties: reading resolves them
/// through their [`LazyBinding`], assigning replaces them with data.
#[derive(Default)]
pub struct JsObject {
    properties: RwLock<HashMap<String, Property>>,
}

impl JsObject {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a property, resolving lazy bindings. Missing keys read as undefined.
    pub fn get(&self, key: &str) -> Result<Value> {
        let binding = {
            let props = self.properties.read();
            match props.get(key) {
                None => return Ok(Value::Undefined),
                Some(Property {
                    slot: Slot::Data(value),
                    ..
                }) => return Ok(value.clone()),
                Some(Property {
                    slot: Slot::Lazy(binding),
                    ..
                }) => Arc::clone(binding),
            }
        };
        // Lock released: the binding's loader may read this object again.
        binding.get()
    }

    /// Assign a property with ordinary `obj[key] = value` semantics.
    ///
    /// Assigning over a lazy slot drops the binding and leaves a plain,
    /// enumerable data property behind.
    pub fn set(&self, key: &str, value: Value) {
        let mut props = self.properties.write();
        if let Some(Property {
            slot: Slot::Data(existing),
            ..
        }) = props.get_mut(key)
        {
            *existing = value;
            return;
        }
        if let Some(Property {
            slot: Slot::Lazy(binding),
            ..
        }) = props.get(key)
        {
            binding.override_with(value.clone());
        }
        props.insert(
            key.to_string(),
            Property {
                slot: Slot::Data(value),
                flags: PropertyFlags::DEFAULT,
            },
        );
    }

    /// Define a data property with explicit flags, replacing any existing one.
    pub fn define(&self, key: &str, value: Value, flags: PropertyFlags) {
        self.properties.write().insert(
            key.to_string(),
            Property {
                slot: Slot::Data(value),
                flags,
            },
        );
    }

    /// Define a lazily resolved property.
    pub fn define_lazy(&self, key: &str, binding: Arc<LazyBinding>, flags: PropertyFlags) {
        self.properties.write().insert(
            key.to_string(),
            Property {
                slot: Slot::Lazy(binding),
                flags,
            },
        );
    }

    /// Delete an own property. Non-configurable properties are kept.
    pub fn delete(&self, key: &str) -> bool {
        let mut props = self.properties.write();
        match props.get(key) {
            Some(prop) if !prop.flags.configurable => false,
            Some(_) => {
                props.remove(key);
                true
            }
            None => true,
        }
    }

    /// Check for an own property
    pub fn has(&self, key: &str) -> bool {
        self.properties.read().contains_key(key)
    }

    /// Flags of an own property
    pub fn flags(&self, key: &str) -> Option<PropertyFlags> {
        self.properties.read().get(key).map(|p| p.flags)
    }

    /// Whether the own property is still backed by a lazy binding
    pub fn is_lazy(&self, key: &str) -> bool {
        matches!(
            self.properties.read().get(key),
            Some(Property {
                slot: Slot::Lazy(_),
                ..
            })
        )
    }

    /// Enumerable own keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .properties
            .read()
            .iter()
            .filter(|(_, p)| p.flags.enumerable)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// All own keys, enumerable or not, sorted
    pub fn own_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.properties.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Objects may be cyclic (`global.global`), so only list keys.
        f.debug_struct("JsObject")
            .field("keys", &self.own_keys())
            .finish()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for JsObject {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let obj = JsObject::new();
        for (k, v) in iter {
            obj.set(&k.into(), v);
        }
        obj
    }
}
