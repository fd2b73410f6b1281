// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module export values.
//!
//! Objects and functions are shared handles: cloning a [`Value`] that holds
//! one clones the handle, so two requires of the same module observe the same
//! object and see each other's mutations.

use crate::error::{LoaderError, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A JavaScript-like value exported by a module.
#[derive(Debug, Clone)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Shared mutable object
    Object(Object),
    /// Shared native function
    Function(Function),
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
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
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

    /// Returns true if this value is a function.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Converts the value to a boolean (ToBoolean).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
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
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// The string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The object handle, if this is an object.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Property lookup; `undefined` for non-objects and missing keys.
    pub fn get(&self, key: &str) -> Value {
        self.as_object()
            .and_then(|obj| obj.get(key))
            .unwrap_or_default()
    }

    /// Call this value as a function.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Function(func) => func.call(args),
            other => Err(LoaderError::type_error(format!(
                "{} is not a function",
                other.type_of()
            ))),
        }
    }

    /// Identity comparison: objects and functions compare by handle,
    /// everything else by value.
    pub fn same_value(&self, other: &Value) -> bool {
        self == other
    }

    /// Convert parsed JSON into a value.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => Value::Array(arr.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => {
                let obj = Object::new();
                for (key, value) in map {
                    obj.set(key.clone(), Value::from_json(value));
                }
                Value::Object(obj)
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
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
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(func) => write!(f, "[Function: {}]", func.name()),
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
        Value::Number(f64::from(n))
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

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

fn unexpected(expected: &str, found: &Value) -> LoaderError {
    LoaderError::type_error(format!("expected {}, found {}", expected, found.type_of()))
}

impl TryFrom<Value> for bool {
    type Error = LoaderError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(unexpected("boolean", &other)),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = LoaderError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Number(n) => Ok(n),
            other => Err(unexpected("number", &other)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = LoaderError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(unexpected("string", &other)),
        }
    }
}

impl TryFrom<Value> for Object {
    type Error = LoaderError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(obj) => Ok(obj),
            other => Err(unexpected("object", &other)),
        }
    }
}

impl TryFrom<Value> for Function {
    type Error = LoaderError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Function(func) => Ok(func),
            other => Err(unexpected("function", &other)),
        }
    }
}

/// A shared, mutable property bag.
#[derive(Clone, Default)]
pub struct Object {
    properties: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl Object {
    /// Create a new empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property
    pub fn get(&self, key: &str) -> Option<Value> {
        self.properties.read().get(key).cloned()
    }

    /// Set a property
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.write().insert(key.into(), value.into());
    }

    /// Check if a property exists
    pub fn has(&self, key: &str) -> bool {
        self.properties.read().contains_key(key)
    }

    /// Property names in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.properties.read().keys().cloned().collect()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.read().len()
    }

    /// Whether the object has no properties
    pub fn is_empty(&self) -> bool {
        self.properties.read().is_empty()
    }

    /// Whether both handles point at the same object
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.properties, &other.properties)
    }
}

// Keys only: objects may reference themselves.
impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object").field("keys", &self.keys()).finish()
    }
}

/// Signature of a native function body.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

struct NativeFunction {
    name: String,
    func: Box<NativeFn>,
}

/// A shared native (Rust) function.
#[derive(Clone)]
pub struct Function {
    inner: Arc<NativeFunction>,
}

impl Function {
    /// Wrap a Rust closure as a function value.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(NativeFunction {
                name: name.into(),
                func: Box::new(func),
            }),
        }
    }

    /// The function name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Invoke the function
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.inner.func)(args)
    }

    /// Whether both handles point at the same function
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.inner.name)
    }
}
