//! Constraint compilation.
//!
//! A declarative `ConstraintKind` compiles to a boxed predicate over a
//! [`TransitionEvent`]. Custom predicates are ordinary `Fn` closures
//! supplied by the caller at compile time; because they run arbitrary user
//! code, panics are caught at the boundary and turned into a
//! `ConstraintOutcome::Failed` rather than unwinding through the evaluator.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::ConstraintError;
use crate::path::{self, Path};
use crate::schema::{NumberOp, Validator};
use crate::state::State;

/// When a path/custom constraint is checked relative to the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    BeforeTransition,
    AfterTransition,
}

/// The state + pending cost visible to a constraint predicate. Mirrors the
/// `TransitionEvent` used by the effect compiler.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub before: State,
    pub after: Option<State>,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintOutcome {
    Passed,
    Failed(String),
}

/// Declarative constraint description, prior to compilation.
#[derive(Clone)]
pub enum ConstraintKind {
    /// A path must resolve to a value satisfying a numeric comparison.
    PathNumber { path: String, op: NumberOp, phase: Option<Phase> },
    /// A path's whole value must pass a validator.
    PathSchema { path: String, validator: Arc<Validator>, phase: Option<Phase> },
    /// The transition's total cost must satisfy a numeric comparison.
    Cost { op: NumberOp, phase: Option<Phase> },
    /// An arbitrary user predicate.
    Custom {
        name: String,
        phase: Phase,
        predicate: Arc<dyn Fn(&TransitionEvent) -> bool + Send + Sync>,
    },
}

/// A compiled constraint, ready to run against a [`TransitionEvent`]. The
/// inner closure returns a typed [`ConstraintError`] on failure; `check`
/// flattens it to the `ConstraintOutcome` the evaluator consumes.
#[derive(Clone)]
pub struct ExecutableConstraint {
    pub name: String,
    pub phase: Phase,
    check: Arc<dyn Fn(&TransitionEvent) -> Result<(), ConstraintError> + Send + Sync>,
}

impl ExecutableConstraint {
    pub fn check(&self, event: &TransitionEvent) -> ConstraintOutcome {
        match (self.check)(event) {
            Ok(()) => ConstraintOutcome::Passed,
            Err(e) => ConstraintOutcome::Failed(e.to_string()),
        }
    }
}

/// Default phase for path/cost constraints that don't specify one.
const DEFAULT_PHASE: Phase = Phase::BeforeTransition;

pub fn compile(name: impl Into<String>, kind: ConstraintKind) -> ExecutableConstraint {
    let name = name.into();
    match kind {
        ConstraintKind::PathNumber { path, op, phase } => {
            let parsed = Path::parse(&path);
            let check_name = name.clone();
            ExecutableConstraint {
                name,
                phase: phase.unwrap_or(DEFAULT_PHASE),
                check: Arc::new(move |event: &TransitionEvent| {
                    let target = event.after.as_ref().unwrap_or(&event.before);
                    let parsed = parsed.as_ref().map_err(|e: &crate::path::PathError| {
                        ConstraintError::Path(e.clone())
                    })?;
                    let value = path::value_at(target, parsed).map_err(ConstraintError::Path)?;
                    let Some(n) = value.as_f64() else {
                        return Err(ConstraintError::Failed(format!(
                            "{check_name}: path {path} is not a number"
                        )));
                    };
                    if number_ok(op, n) {
                        Ok(())
                    } else {
                        Err(ConstraintError::Failed(format!("{check_name}: {n} fails {op:?}")))
                    }
                }),
            }
        }
        ConstraintKind::PathSchema { path, validator, phase } => {
            let parsed = Path::parse(&path);
            let check_name = name.clone();
            ExecutableConstraint {
                name,
                phase: phase.unwrap_or(DEFAULT_PHASE),
                check: Arc::new(move |event: &TransitionEvent| {
                    let target = event.after.as_ref().unwrap_or(&event.before);
                    let parsed = parsed.as_ref().map_err(|e: &crate::path::PathError| {
                        ConstraintError::Path(e.clone())
                    })?;
                    let value = path::value_at(target, parsed).map_err(ConstraintError::Path)?;
                    match validator.validate(value) {
                        Ok(()) => Ok(()),
                        Err(errs) => Err(ConstraintError::Failed(format!(
                            "{check_name}: {} validation error(s)",
                            errs.len()
                        ))),
                    }
                }),
            }
        }
        ConstraintKind::Cost { op, phase } => {
            let check_name = name.clone();
            ExecutableConstraint {
                name,
                phase: phase.unwrap_or(DEFAULT_PHASE),
                check: Arc::new(move |event: &TransitionEvent| {
                    if number_ok(op, event.cost) {
                        Ok(())
                    } else {
                        Err(ConstraintError::Failed(format!(
                            "{check_name}: cost {} fails {op:?}",
                            event.cost
                        )))
                    }
                }),
            }
        }
        ConstraintKind::Custom { name: custom_name, phase, predicate } => {
            ExecutableConstraint {
                name,
                phase,
                check: Arc::new(move |event: &TransitionEvent| {
                    match catch_unwind(AssertUnwindSafe(|| predicate(event))) {
                        Ok(true) => Ok(()),
                        Ok(false) => Err(ConstraintError::Failed(format!(
                            "{custom_name}: predicate returned false"
                        ))),
                        Err(_) => Err(ConstraintError::Panicked(custom_name.clone())),
                    }
                }),
            }
        }
    }
}

fn number_ok(op: NumberOp, n: f64) -> bool {
    match op {
        NumberOp::Lt(x) => n < x,
        NumberOp::Lte(x) => n <= x,
        NumberOp::Gt(x) => n > x,
        NumberOp::Gte(x) => n >= x,
        NumberOp::Positive => n > 0.0,
        NumberOp::Negative => n < 0.0,
        NumberOp::Nonpositive => n <= 0.0,
        NumberOp::Nonnegative => n >= 0.0,
        NumberOp::MultipleOf(step) => step != 0.0 && (n / step).fract().abs() < f64::EPSILON,
    }
}
