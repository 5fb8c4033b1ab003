//! Transition rules, declarative and compiled.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constraint::ExecutableConstraint;
use crate::effect::ExecutableEffect;
use crate::state::State;

/// A rule's cost: a fixed number, or a function of the current state.
#[derive(Clone)]
pub enum Cost {
    Fixed(f64),
    Fn(Arc<dyn Fn(&State) -> f64 + Send + Sync>),
}

impl Cost {
    pub fn evaluate(&self, state: &State) -> f64 {
        match self {
            Cost::Fixed(c) => *c,
            Cost::Fn(f) => f(state),
        }
    }
}

impl From<f64> for Cost {
    fn from(c: f64) -> Self {
        Cost::Fixed(c)
    }
}

/// A declarative rule, prior to compilation. `cost` is `None` for the
/// null/absent (= 0) case.
#[derive(Clone)]
pub struct TransitionRule {
    pub name: String,
    pub constraints: Vec<crate::constraint::ConstraintKind>,
    pub effects: Vec<crate::effect::EffectOp>,
    pub cost: Option<Cost>,
    pub metadata: BTreeMap<String, String>,
}

/// A compiled rule, ready to be evaluated against a state.
#[derive(Clone)]
pub struct ExecutableTransition {
    pub name: String,
    pub constraints: Arc<[ExecutableConstraint]>,
    pub effects: Arc<[ExecutableEffect]>,
    pub cost: Cost,
    pub metadata: Arc<BTreeMap<String, String>>,
}

/// Why a transition did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    ConstraintFailed { constraint: String, message: String },
    EffectFailed { message: String },
    PostValidationFailed { errors: Vec<String> },
}

/// The result of attempting a single rule against a single state. `Success`
/// carries `rule_name`/`metadata` alongside the successor and its cost.
#[derive(Clone)]
pub enum TransitionOutcome {
    Success { rule_name: String, after: State, cost: f64, metadata: Arc<BTreeMap<String, String>> },
    Failure(FailureReason),
}

impl std::fmt::Debug for TransitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionOutcome::Success { rule_name, after, cost, metadata } => f
                .debug_struct("Success")
                .field("rule_name", rule_name)
                .field("after", after)
                .field("cost", cost)
                .field("metadata", metadata)
                .finish(),
            TransitionOutcome::Failure(reason) => f.debug_tuple("Failure").field(reason).finish(),
        }
    }
}

impl PartialEq for TransitionOutcome {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                TransitionOutcome::Success { rule_name: rn1, after: a1, cost: c1, metadata: m1 },
                TransitionOutcome::Success { rule_name: rn2, after: a2, cost: c2, metadata: m2 },
            ) => rn1 == rn2 && a1 == a2 && c1 == c2 && m1 == m2,
            (TransitionOutcome::Failure(a), TransitionOutcome::Failure(b)) => a == b,
            _ => false,
        }
    }
}

impl TransitionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransitionOutcome::Success { .. })
    }
}

/// A fully compiled collection of rules, ready for the neighbor generator.
#[derive(Clone)]
pub struct ExecutableSystem {
    pub transitions: Arc<[ExecutableTransition]>,
}

impl ExecutableSystem {
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.transitions.iter().map(|t| t.name.as_str())
    }
}
