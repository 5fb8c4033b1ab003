//! Error taxonomy surfaced at the engine boundary.
//!
//! Per-rule transition failures are data, not exceptions — they live on
//! [`crate::evaluate::TransitionOutcome`], not here. This module only covers
//! errors that abort a `compile` call or a running study.

use thiserror::Error;

use crate::path::PathError;

/// A malformed declarative schema or transition clause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("compile error at {path}: {message}")]
pub struct CompileError {
    pub path: String,
    pub message: String,
}

impl CompileError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

/// A state failed whole-state schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation error at {path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

/// An effect instruction could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error("path error: {0}")]
    Path(#[from] PathError),
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch { path: String, expected: String, found: String },
    #[error("{op} requires {expected} input at {path}, found {found}")]
    UnsupportedInput { op: String, path: String, expected: String, found: String },
    #[error("effect error: {0}")]
    Other(String),
}

/// A constraint predicate rejected a transition, or a custom predicate panicked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("path error: {0}")]
    Path(#[from] PathError),
    #[error("constraint failed: {0}")]
    Failed(String),
    #[error("custom constraint panicked: {0}")]
    Panicked(String),
}

/// The codex could not encode or decode a state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("codex error: {0}")]
pub struct CodexError(pub String);

/// A user-supplied hook raised an error during exploration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hook error: {0}")]
pub struct HookError(pub String);

/// Top-level error for operations that can fail outright (as opposed to
/// producing a per-rule `Failure`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WayfinderError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Codex(#[from] CodexError),
    #[error(transparent)]
    Hook(#[from] HookError),
}
