//! Effect compilation.
//!
//! A rule's effect list is an ordered sequence of mutation instructions.
//! Each compiles to a boxed `Fn(&State) -> Result<State, EffectError>` that
//! is threaded through the list by [`crate::evaluate::apply`], one state in,
//! one state out, each effect seeing the previous effect's output.

use std::sync::Arc;

use crate::error::EffectError;
use crate::path::{self, Path};
use crate::state::State;

/// Named transforms for the `transform` effect (closed vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedTransform {
    ToString,
    ToNumber,
    ToLowerCase,
    ToUpperCase,
    Reverse,
    Sort,
    Unique,
    Length,
}

/// Declarative effect description, prior to compilation.
#[derive(Clone)]
pub enum EffectOp {
    Set { path: String, value: State },
    Unset { path: String },
    Copy { from: String, to: String },
    Increment { path: String, by: f64 },
    Decrement { path: String, by: f64 },
    Append { path: String, value: State },
    Prepend { path: String, value: State },
    Remove { path: String, index: usize },
    Clear { path: String },
    Merge { path: String, with: State },
    Transform { path: String, transform: NamedTransform },
}

/// A compiled effect.
#[derive(Clone)]
pub struct ExecutableEffect {
    apply: Arc<dyn Fn(&State) -> Result<State, EffectError> + Send + Sync>,
}

impl ExecutableEffect {
    pub fn apply(&self, state: &State) -> Result<State, EffectError> {
        (self.apply)(state)
    }
}

pub fn compile(op: EffectOp) -> Result<ExecutableEffect, EffectError> {
    let apply: Arc<dyn Fn(&State) -> Result<State, EffectError> + Send + Sync> = match op {
        EffectOp::Set { path, value } => {
            let parsed = Path::parse(&path)?;
            Arc::new(move |state: &State| {
                if let Ok(existing) = path::value_at(state, &parsed) {
                    if existing.category() != value.category() {
                        return Err(EffectError::TypeMismatch {
                            path: parsed.to_string(),
                            expected: existing.category().to_string(),
                            found: value.category().to_string(),
                        });
                    }
                }
                Ok(path::with_value_at_create(state, &parsed, value.clone())?)
            })
        }
        EffectOp::Unset { path } => {
            let parsed = Path::parse(&path)?;
            Arc::new(move |state: &State| Ok(path::without_value_at(state, &parsed)?))
        }
        EffectOp::Copy { from, to } => {
            let from = Path::parse(&from)?;
            let to = Path::parse(&to)?;
            Arc::new(move |state: &State| {
                let value = path::value_at(state, &from)?.clone();
                Ok(path::with_value_at_create(state, &to, value)?)
            })
        }
        EffectOp::Increment { path, by } => numeric_delta(path, by)?,
        EffectOp::Decrement { path, by } => numeric_delta(path, -by)?,
        EffectOp::Append { path, value } => {
            let parsed = Path::parse(&path)?;
            Arc::new(move |state: &State| {
                let current = path::value_at(state, &parsed)?;
                let mut items = expect_array(&parsed, current)?.clone();
                items.push_back(value.clone());
                Ok(path::with_value_at(state, &parsed, State::Array(items))?)
            })
        }
        EffectOp::Prepend { path, value } => {
            let parsed = Path::parse(&path)?;
            Arc::new(move |state: &State| {
                let current = path::value_at(state, &parsed)?;
                let mut items = expect_array(&parsed, current)?.clone();
                items.push_front(value.clone());
                Ok(path::with_value_at(state, &parsed, State::Array(items))?)
            })
        }
        EffectOp::Remove { path, index } => {
            let parsed = Path::parse(&path)?;
            Arc::new(move |state: &State| {
                let current = path::value_at(state, &parsed)?;
                let mut items = expect_array(&parsed, current)?.clone();
                if index >= items.len() {
                    return Err(EffectError::Other(format!(
                        "remove index {index} out of bounds at {parsed}"
                    )));
                }
                items.remove(index);
                Ok(path::with_value_at(state, &parsed, State::Array(items))?)
            })
        }
        EffectOp::Clear { path } => {
            let parsed = Path::parse(&path)?;
            Arc::new(move |state: &State| {
                let current = path::value_at(state, &parsed)?;
                let cleared = match current {
                    State::Array(_) => State::Array(im::Vector::new()),
                    State::Object(_) => State::Object(im::OrdMap::new()),
                    other => {
                        return Err(EffectError::TypeMismatch {
                            path: parsed.to_string(),
                            expected: "array or object".to_string(),
                            found: other.category().to_string(),
                        })
                    }
                };
                Ok(path::with_value_at(state, &parsed, cleared)?)
            })
        }
        EffectOp::Merge { path, with } => {
            let parsed = Path::parse(&path)?;
            Arc::new(move |state: &State| {
                let current = path::value_at(state, &parsed)?;
                let merged = merge_objects(&parsed, current, &with)?;
                Ok(path::with_value_at(state, &parsed, merged)?)
            })
        }
        EffectOp::Transform { path, transform } => {
            let parsed = Path::parse(&path)?;
            Arc::new(move |state: &State| {
                let current = path::value_at(state, &parsed)?;
                let transformed = apply_transform(&parsed, transform, current)?;
                Ok(path::with_value_at(state, &parsed, transformed)?)
            })
        }
    };
    Ok(ExecutableEffect { apply })
}

fn numeric_delta(
    path: String,
    delta: f64,
) -> Result<Arc<dyn Fn(&State) -> Result<State, EffectError> + Send + Sync>, EffectError> {
    let parsed = Path::parse(&path)?;
    Ok(Arc::new(move |state: &State| {
        let current = path::value_at(state, &parsed)?;
        let n = current.as_f64().ok_or_else(|| EffectError::TypeMismatch {
            path: parsed.to_string(),
            expected: "number".to_string(),
            found: current.category().to_string(),
        })?;
        Ok(path::with_value_at(state, &parsed, State::Number(n + delta))?)
    }))
}

fn expect_array<'a>(path: &Path, value: &'a State) -> Result<&'a im::Vector<State>, EffectError> {
    value.as_array().ok_or_else(|| EffectError::TypeMismatch {
        path: path.to_string(),
        expected: "array".to_string(),
        found: value.category().to_string(),
    })
}

fn merge_objects(path: &Path, current: &State, with: &State) -> Result<State, EffectError> {
    let base = current.as_object().ok_or_else(|| EffectError::TypeMismatch {
        path: path.to_string(),
        expected: "object".to_string(),
        found: current.category().to_string(),
    })?;
    let addition = with.as_object().ok_or_else(|| EffectError::Other(
        format!("merge source at {path} is not an object"),
    ))?;
    let mut merged = base.clone();
    for (key, value) in addition.iter() {
        merged.insert(key.clone(), value.clone());
    }
    Ok(State::Object(merged))
}

fn apply_transform(
    path: &Path,
    transform: NamedTransform,
    value: &State,
) -> Result<State, EffectError> {
    let mismatch = |expected: &str| EffectError::UnsupportedInput {
        op: format!("{transform:?}"),
        path: path.to_string(),
        expected: expected.to_string(),
        found: value.category().to_string(),
    };
    match transform {
        NamedTransform::ToString => Ok(State::String(scalar_to_string(value))),
        NamedTransform::ToNumber => {
            let n = match value {
                State::Number(n) => *n,
                State::String(s) => s.parse::<f64>().map_err(|_| {
                    EffectError::Other(format!("cannot parse {s:?} as a number at {path}"))
                })?,
                State::Bool(b) => {
                    if *b {
                        1.0
                    } else {
                        0.0
                    }
                }
                _ => return Err(mismatch("number, string, or boolean")),
            };
            Ok(State::Number(n))
        }
        NamedTransform::ToLowerCase => {
            Ok(State::String(value.as_str().ok_or_else(|| mismatch("string"))?.to_lowercase()))
        }
        NamedTransform::ToUpperCase => {
            Ok(State::String(value.as_str().ok_or_else(|| mismatch("string"))?.to_uppercase()))
        }
        NamedTransform::Reverse => match value {
            State::String(s) => Ok(State::String(s.chars().rev().collect())),
            State::Array(items) => Ok(State::Array(items.iter().rev().cloned().collect())),
            _ => Err(mismatch("string or array")),
        },
        NamedTransform::Sort => match value {
            State::Array(items) => {
                use itertools::Itertools;
                Ok(State::Array(items.iter().cloned().sorted_by(compare_states).collect()))
            }
            _ => Err(mismatch("array")),
        },
        NamedTransform::Unique => match value {
            State::Array(items) => {
                let mut seen = Vec::new();
                for item in items.iter() {
                    if !seen.contains(item) {
                        seen.push(item.clone());
                    }
                }
                Ok(State::Array(seen.into_iter().collect()))
            }
            _ => Err(mismatch("array")),
        },
        NamedTransform::Length => match value {
            State::Array(items) => Ok(State::Number(items.len() as f64)),
            State::String(s) => Ok(State::Number(s.chars().count() as f64)),
            _ => Err(mismatch("array or string")),
        },
    }
}

fn scalar_to_string(value: &State) -> String {
    match value {
        State::Null => "null".to_string(),
        State::Bool(b) => b.to_string(),
        State::Number(n) => n.to_string(),
        State::String(s) => s.clone(),
        State::Array(_) | State::Object(_) => {
            serde_json::to_string(&value.to_json()).unwrap_or_default()
        }
    }
}

fn compare_states(a: &State, b: &State) -> std::cmp::Ordering {
    match (a, b) {
        (State::Number(x), State::Number(y)) => x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
        (State::String(x), State::String(y)) => x.cmp(y),
        _ => std::cmp::Ordering::Equal,
    }
}

/// Whether `op` can ever change a value's [`TypeCategory`]: only `unset` may
/// remove a leaf outright, and only `set`/`transform` may change its category.
pub fn may_change_category(op: &EffectOp) -> bool {
    matches!(op, EffectOp::Set { .. } | EffectOp::Unset { .. } | EffectOp::Transform { .. })
}
