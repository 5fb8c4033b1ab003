//! The transition evaluator: the 8-step `apply()` algorithm.
//!
//! 1. compute pending cost (`costFn(currentState)`, default 0)
//! 2. build a pending `TransitionEvent` (before-state, no after yet, cost)
//! 3. run before-phase constraints
//! 4. run effects in order, threading state through
//! 5. revalidate the resulting state against the schema
//! 6. build the final `TransitionEvent` (before + after + cost)
//! 7. run after-phase constraints
//! 8. return `Success{ruleName, after, cost, metadata}` or the first `Failure` encountered

use crate::constraint::{ConstraintOutcome, Phase, TransitionEvent};
use crate::rule::{ExecutableTransition, FailureReason, TransitionOutcome};
use crate::schema::Validator;
use crate::state::State;

pub fn apply(rule: &ExecutableTransition, before: &State, schema: &Validator) -> TransitionOutcome {
    let cost = rule.cost.evaluate(before);

    let pending = TransitionEvent { before: before.clone(), after: None, cost };
    if let Some(failure) = run_phase(rule, &pending, Phase::BeforeTransition) {
        return TransitionOutcome::Failure(failure);
    }

    let mut working = before.clone();
    for effect in rule.effects.iter() {
        match effect.apply(&working) {
            Ok(next) => working = next,
            Err(e) => {
                return TransitionOutcome::Failure(FailureReason::EffectFailed {
                    message: e.to_string(),
                })
            }
        }
    }

    if let Err(errors) = schema.validate(&working) {
        return TransitionOutcome::Failure(FailureReason::PostValidationFailed {
            errors: errors.into_iter().map(|e| format!("{}: {}", e.path, e.message)).collect(),
        });
    }

    let settled = TransitionEvent { before: before.clone(), after: Some(working.clone()), cost };
    if let Some(failure) = run_phase(rule, &settled, Phase::AfterTransition) {
        return TransitionOutcome::Failure(failure);
    }

    TransitionOutcome::Success {
        rule_name: rule.name.clone(),
        after: working,
        cost,
        metadata: rule.metadata.clone(),
    }
}

fn run_phase(
    rule: &ExecutableTransition,
    event: &TransitionEvent,
    phase: Phase,
) -> Option<FailureReason> {
    for constraint in rule.constraints.iter().filter(|c| c.phase == phase) {
        if let ConstraintOutcome::Failed(message) = constraint.check(event) {
            return Some(FailureReason::ConstraintFailed {
                constraint: constraint.name.clone(),
                message,
            });
        }
    }
    None
}
