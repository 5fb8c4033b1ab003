//! Compiles a declarative system into an [`ExecutableSystem`].

use std::collections::HashSet;

use crate::constraint::{self, ConstraintKind};
use crate::effect::{self, EffectOp};
use crate::error::{CompileError, EffectError};
use crate::rule::{Cost, ExecutableSystem, ExecutableTransition, TransitionRule};
use crate::schema::Validation;

/// A schema plus its rule list, as authored declaratively.
pub struct DeclarativeSystem {
    pub schema: Validation,
    pub rules: Vec<TransitionRule>,
}

/// Everything needed to run the engine: the compiled schema validator and
/// the compiled rule list, in declaration order.
pub struct CompiledSystem {
    pub schema: crate::schema::Validator,
    pub system: ExecutableSystem,
}

/// Compiles a [`DeclarativeSystem`]. Rejects duplicate rule names outright.
pub fn compile(declared: DeclarativeSystem) -> Result<CompiledSystem, CompileError> {
    let mut seen_names = HashSet::new();
    let mut transitions = Vec::with_capacity(declared.rules.len());

    for rule in declared.rules {
        if !seen_names.insert(rule.name.clone()) {
            return Err(CompileError::new(
                rule.name.clone(),
                "duplicate transition rule name",
            ));
        }
        transitions.push(compile_rule(rule)?);
    }

    Ok(CompiledSystem {
        schema: crate::schema::Validator::compile(declared.schema),
        system: ExecutableSystem { transitions: transitions.into() },
    })
}

fn compile_rule(rule: TransitionRule) -> Result<ExecutableTransition, CompileError> {
    let name = rule.name.clone();
    let constraints: Vec<_> = rule
        .constraints
        .into_iter()
        .enumerate()
        .map(|(i, kind)| compile_constraint(&name, i, kind))
        .collect();

    let effects: Result<Vec<_>, EffectError> =
        rule.effects.into_iter().map(effect::compile).collect();
    let effects = effects.map_err(|e| CompileError::new(name.clone(), e.to_string()))?;

    Ok(ExecutableTransition {
        name: rule.name,
        constraints: constraints.into(),
        effects: effects.into(),
        cost: rule.cost.unwrap_or(Cost::Fixed(0.0)),
        metadata: rule.metadata.into(),
    })
}

fn compile_constraint(
    rule_name: &str,
    index: usize,
    kind: ConstraintKind,
) -> crate::constraint::ExecutableConstraint {
    let label = match &kind {
        ConstraintKind::Custom { name, .. } => name.clone(),
        _ => format!("{rule_name}#{index}"),
    };
    constraint::compile(label, kind)
}
