//! Schema validator.
//!
//! `Validation` is the closed clause vocabulary, compiled once via
//! [`Validator::compile`] and reused across every state the engine visits.
//! Numeric comparisons go through `bigdecimal` and date comparisons through
//! `time`'s RFC 3339 parser, to compare untrusted JSON scalars under a
//! closed comparator vocabulary without precision loss.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::Zero;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::{format_description::well_known::Rfc3339, Date, Month, OffsetDateTime};

use crate::state::State;

/// A single validation clause. Composable via `Array { shape }` and
/// `Object { require }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Validation {
    Null,
    Undefined,
    Boolean { equals: Option<bool> },
    Number { ops: Vec<NumberOp> },
    String { ops: Vec<StringOp> },
    Date { ops: Vec<DateOp> },
    Array { length: Option<LengthCheck>, shape: Option<Box<Validation>> },
    Object { require: std::collections::BTreeMap<String, Validation> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumberOp {
    Lt(f64),
    Lte(f64),
    Gt(f64),
    Gte(f64),
    MultipleOf(f64),
    Positive,
    Negative,
    Nonpositive,
    Nonnegative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StringOp {
    MaxLength(usize),
    MinLength(usize),
    Length(usize),
    Includes(String),
    StartsWith(String),
    EndsWith(String),
    Lowercase,
    Uppercase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DateOp {
    Before(String),
    After(String),
    Between { start: String, end: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LenMethod {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthCheck {
    pub method: LenMethod,
    pub value: usize,
}

/// A validation failure: the instance path it occurred at, plus a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn at(path: &str, message: impl Into<String>) -> Self {
        Self { path: path.to_string(), message: message.into() }
    }
}

/// A compiled validator. Compilation today is just ownership of the clause
/// tree (the vocabulary has no regexes or other precomputation to do), but
/// keeping a distinct `Validator` type from `Validation` matches a
/// "compile once, reuse per state" contract and leaves room to add
/// precomputed indices later without changing callers.
#[derive(Debug, Clone)]
pub struct Validator {
    clause: Validation,
}

/// Global cache for on-demand subschema compilation, keyed by the subschema's
/// canonical JSON text. This is a performance hint, not a contract, so a
/// simple bounded map (evict-oldest once full) is enough — no need for a
/// full LRU crate dependency.
static SUBSCHEMA_CACHE: Lazy<Mutex<HashMap<String, Validator>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

const SUBSCHEMA_CACHE_CAP: usize = 256;

impl Validator {
    pub fn compile(schema: Validation) -> Self {
        Self { clause: schema }
    }

    /// Compiles (or retrieves from cache) a validator for a subschema,
    /// keyed by its canonical JSON representation.
    pub fn compile_cached(schema: &Validation) -> Validator {
        let Ok(key) = serde_json::to_string(schema) else {
            return Validator::compile(schema.clone());
        };
        let mut cache = SUBSCHEMA_CACHE.lock();
        if let Some(existing) = cache.get(&key) {
            return existing.clone();
        }
        let compiled = Validator::compile(schema.clone());
        if cache.len() >= SUBSCHEMA_CACHE_CAP {
            cache.clear();
        }
        cache.insert(key, compiled.clone());
        compiled
    }

    pub fn validate(&self, value: &State) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        validate_at("$", &self.clause, value, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_at(path: &str, clause: &Validation, value: &State, errors: &mut Vec<ValidationError>) {
    match clause {
        Validation::Null => {
            if !matches!(value, State::Null) {
                errors.push(ValidationError::at(path, "expected null"));
            }
        }
        Validation::Undefined => {
            errors.push(ValidationError::at(path, "value is present where absence was required"));
        }
        Validation::Boolean { equals } => match value {
            State::Bool(b) => {
                if let Some(expected) = equals {
                    if b != expected {
                        errors.push(ValidationError::at(path, format!("expected {expected}")));
                    }
                }
            }
            _ => errors.push(ValidationError::at(path, "expected boolean")),
        },
        Validation::Number { ops } => match value.as_f64() {
            Some(n) => {
                for op in ops {
                    if let Err(message) = check_number_op(*op, n) {
                        errors.push(ValidationError::at(path, message));
                    }
                }
            }
            None => errors.push(ValidationError::at(path, "expected number")),
        },
        Validation::String { ops } => match value.as_str() {
            Some(s) => {
                for op in ops {
                    if let Err(message) = check_string_op(op, s) {
                        errors.push(ValidationError::at(path, message));
                    }
                }
            }
            None => errors.push(ValidationError::at(path, "expected string")),
        },
        Validation::Date { ops } => match value.as_str() {
            Some(s) => {
                for op in ops {
                    if let Err(message) = check_date_op(op, s) {
                        errors.push(ValidationError::at(path, message));
                    }
                }
            }
            None => errors.push(ValidationError::at(path, "expected date string")),
        },
        Validation::Array { length, shape } => match value.as_array() {
            Some(items) => {
                if let Some(check) = length {
                    if !check_length(*check, items.len()) {
                        errors.push(ValidationError::at(
                            path,
                            format!("array length {} fails {:?}", items.len(), check),
                        ));
                    }
                }
                if let Some(shape) = shape {
                    for (i, item) in items.iter().enumerate() {
                        validate_at(&format!("{path}[{i}]"), shape, item, errors);
                    }
                }
            }
            None => errors.push(ValidationError::at(path, "expected array")),
        },
        Validation::Object { require } => match value.as_object() {
            Some(fields) => {
                for (key, sub) in require {
                    let sub_path = format!("{path}.{key}");
                    match fields.get(key) {
                        Some(field_value) => validate_at(&sub_path, sub, field_value, errors),
                        None => {
                            if !matches!(sub, Validation::Null | Validation::Undefined) {
                                errors.push(ValidationError::at(
                                    &sub_path,
                                    "required key is absent",
                                ));
                            }
                        }
                    }
                }
            }
            None => errors.push(ValidationError::at(path, "expected object")),
        },
    }
}

fn check_number_op(op: NumberOp, n: f64) -> Result<(), String> {
    let ok = match op {
        NumberOp::Lt(x) => n < x,
        NumberOp::Lte(x) => n <= x,
        NumberOp::Gt(x) => n > x,
        NumberOp::Gte(x) => n >= x,
        NumberOp::Positive => n > 0.0,
        NumberOp::Negative => n < 0.0,
        NumberOp::Nonpositive => n <= 0.0,
        NumberOp::Nonnegative => n >= 0.0,
        NumberOp::MultipleOf(step) => is_multiple_of(n, step),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("{n} fails {op:?}"))
    }
}

fn is_multiple_of(n: f64, step: f64) -> bool {
    if step == 0.0 {
        return false;
    }
    let Some(n) = decimal(n) else { return false };
    let Some(step) = decimal(step) else { return false };
    (&n % &step).is_zero()
}

fn decimal(n: f64) -> Option<BigDecimal> {
    BigDecimal::from_str(&n.to_string()).ok()
}

fn check_string_op(op: &StringOp, s: &str) -> Result<(), String> {
    let ok = match op {
        StringOp::MaxLength(n) => s.chars().count() <= *n,
        StringOp::MinLength(n) => s.chars().count() >= *n,
        StringOp::Length(n) => s.chars().count() == *n,
        StringOp::Includes(needle) => s.contains(needle.as_str()),
        StringOp::StartsWith(prefix) => s.starts_with(prefix.as_str()),
        StringOp::EndsWith(suffix) => s.ends_with(suffix.as_str()),
        StringOp::Lowercase => s == s.to_lowercase(),
        StringOp::Uppercase => s == s.to_uppercase(),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("{s:?} fails {op:?}"))
    }
}

fn check_date_op(op: &DateOp, s: &str) -> Result<(), String> {
    let instant = parse_temporal(s).ok_or_else(|| format!("{s:?} is not a valid date"))?;
    let ok = match op {
        DateOp::Before(bound) => {
            let bound = parse_temporal(bound).ok_or_else(|| format!("{bound:?} is not a valid date"))?;
            instant < bound
        }
        DateOp::After(bound) => {
            let bound = parse_temporal(bound).ok_or_else(|| format!("{bound:?} is not a valid date"))?;
            instant > bound
        }
        DateOp::Between { start, end } => {
            let start =
                parse_temporal(start).ok_or_else(|| format!("{start:?} is not a valid date"))?;
            let end = parse_temporal(end).ok_or_else(|| format!("{end:?} is not a valid date"))?;
            instant >= start && instant <= end
        }
    };
    if ok {
        Ok(())
    } else {
        Err(format!("{s:?} fails {op:?}"))
    }
}

/// Parses RFC 3339 date-times, falling back to a bare `YYYY-MM-DD` date.
fn parse_temporal(s: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(dt);
    }
    let mut parts = s.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(year, month, day).ok()?;
    Some(date.midnight().assume_utc())
}

fn check_length(check: LengthCheck, len: usize) -> bool {
    match check.method {
        LenMethod::Eq => len == check.value,
        LenMethod::Lt => len < check.value,
        LenMethod::Lte => len <= check.value,
        LenMethod::Gt => len > check.value,
        LenMethod::Gte => len >= check.value,
    }
}
