//! The state value type: immutable nested records.
//!
//! States are immutable nested records: scalar leaves, homogeneous arrays,
//! and objects. `Array`/`Object` use `im`'s persistent collections so that
//! [`crate::path::with_value_at`] can produce a new state that shares
//! untouched substructure with its parent, rather than deep-cloning the
//! whole tree on every mutation.

use std::fmt;

use im::{OrdMap, Vector};

/// A single state value. Objects are `im::OrdMap`, so iteration order is
/// always the sorted key order — this is also what makes the default codex's
/// "canonicalize by sorting object keys" step free (see [`crate::codex`]).
#[derive(Debug, Clone)]
pub enum State {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vector<State>),
    Object(OrdMap<String, State>),
}

/// Coarse type category used by the effect compiler's mutation-typing
/// invariant: a leaf must keep its category across most operations, or
/// become `Absent` via `unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Absent,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeCategory::Absent => "absent",
            TypeCategory::Null => "null",
            TypeCategory::Bool => "boolean",
            TypeCategory::Number => "number",
            TypeCategory::String => "string",
            TypeCategory::Array => "array",
            TypeCategory::Object => "object",
        };
        f.write_str(s)
    }
}

impl State {
    pub fn category(&self) -> TypeCategory {
        match self {
            State::Null => TypeCategory::Null,
            State::Bool(_) => TypeCategory::Bool,
            State::Number(_) => TypeCategory::Number,
            State::String(_) => TypeCategory::String,
            State::Array(_) => TypeCategory::Array,
            State::Object(_) => TypeCategory::Object,
        }
    }

    pub fn object(fields: impl IntoIterator<Item = (String, State)>) -> Self {
        State::Object(fields.into_iter().collect())
    }

    pub fn array(items: impl IntoIterator<Item = State>) -> Self {
        State::Array(items.into_iter().collect())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            State::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            State::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            State::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vector<State>> {
        match self {
            State::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&OrdMap<String, State>> {
        match self {
            State::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Converts to a `serde_json::Value`. Object keys come out already
    /// sorted because `OrdMap` iterates in key order.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            State::Null => serde_json::Value::Null,
            State::Bool(b) => serde_json::Value::Bool(*b),
            State::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            State::String(s) => serde_json::Value::String(s.clone()),
            State::Array(items) => {
                serde_json::Value::Array(items.iter().map(State::to_json).collect())
            }
            State::Object(fields) => serde_json::Value::Object(
                fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Converts from a `serde_json::Value`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => State::Null,
            serde_json::Value::Bool(b) => State::Bool(*b),
            serde_json::Value::Number(n) => State::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => State::String(s.clone()),
            serde_json::Value::Array(items) => {
                State::Array(items.iter().map(State::from_json).collect())
            }
            serde_json::Value::Object(fields) => State::Object(
                fields.iter().map(|(k, v)| (k.clone(), State::from_json(v))).collect(),
            ),
        }
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (State::Null, State::Null) => true,
            (State::Bool(a), State::Bool(b)) => a == b,
            (State::Number(a), State::Number(b)) => a == b,
            (State::String(a), State::String(b)) => a == b,
            (State::Array(a), State::Array(b)) => a == b,
            (State::Object(a), State::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for State {
    fn from(b: bool) -> Self {
        State::Bool(b)
    }
}

impl From<f64> for State {
    fn from(n: f64) -> Self {
        State::Number(n)
    }
}

impl From<&str> for State {
    fn from(s: &str) -> Self {
        State::String(s.to_string())
    }
}

impl From<String> for State {
    fn from(s: String) -> Self {
        State::String(s)
    }
}
