//! Neighbor generation: lazily tries every rule against a state, yielding
//! only the successful transitions, each enriched with the successor's
//! codex hash.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codex::{Codex, Hash};
use crate::error::CodexError;
use crate::evaluate;
use crate::rule::{ExecutableSystem, ExecutableTransition};
use crate::schema::Validator;
use crate::state::State;

/// One successful transition out of a state, with its destination's hash
/// already computed (the neighbor generator is the one place that always
/// needs it — both the graph and the frontier key on it).
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub rule_name: String,
    pub after: State,
    pub after_hash: Hash,
    pub cost: f64,
    pub metadata: Arc<BTreeMap<String, String>>,
}

/// Iterates a state's rule list lazily. Restartable: a fresh `Neighbors` can
/// be built from the same `(system, state)` pair at any time, e.g. to retry
/// after an `onTransition` hook error.
pub struct Neighbors<'a> {
    system: &'a ExecutableSystem,
    schema: &'a Validator,
    state: &'a State,
    index: usize,
}

impl<'a> Neighbors<'a> {
    pub fn new(system: &'a ExecutableSystem, schema: &'a Validator, state: &'a State) -> Self {
        Self { system, schema, state, index: 0 }
    }

    fn next_rule(&mut self) -> Option<&'a ExecutableTransition> {
        let rule = self.system.transitions.get(self.index)?;
        self.index += 1;
        Some(rule)
    }

    /// Advances to the next successful transition, computing its hash via
    /// `codex`. Returns `Ok(None)` once every rule has been tried.
    pub async fn advance(
        &mut self,
        codex: &dyn Codex,
    ) -> Result<Option<Neighbor>, CodexError> {
        while let Some(rule) = self.next_rule() {
            if let crate::rule::TransitionOutcome::Success { rule_name, after, cost, metadata } =
                evaluate::apply(rule, self.state, self.schema)
            {
                let after_hash = codex.encode(&after).await?;
                return Ok(Some(Neighbor { rule_name, after, after_hash, cost, metadata }));
            }
        }
        Ok(None)
    }

    /// Drains every remaining neighbor into a `Vec`, in rule order.
    pub async fn collect_all(mut self, codex: &dyn Codex) -> Result<Vec<Neighbor>, CodexError> {
        let mut out = Vec::new();
        while let Some(n) = self.advance(codex).await? {
            out.push(n);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codex::DefaultCodex;
    use crate::constraint::ConstraintKind;
    use crate::effect::EffectOp;
    use crate::rule::Cost;
    use crate::schema::{NumberOp, Validation};

    fn system_with_two_rules() -> ExecutableSystem {
        let inc = ExecutableTransition {
            name: "inc".to_string(),
            constraints: Arc::from(vec![]),
            effects: Arc::from(vec![crate::effect::compile(EffectOp::Increment {
                path: "n".to_string(),
                by: 1.0,
            })
            .unwrap()]),
            cost: Cost::Fixed(1.0),
            metadata: Arc::new(Default::default()),
        };
        let blocked = ExecutableTransition {
            name: "blocked".to_string(),
            constraints: Arc::from(vec![crate::constraint::compile(
                "never",
                ConstraintKind::PathNumber {
                    path: "n".to_string(),
                    op: NumberOp::Gt(1000.0),
                    phase: None,
                },
            )]),
            effects: Arc::from(vec![]),
            cost: Cost::Fixed(1.0),
            metadata: Arc::new(Default::default()),
        };
        ExecutableSystem { transitions: Arc::from(vec![inc, blocked]) }
    }

    #[tokio::test]
    async fn yields_only_successful_transitions() {
        let system = system_with_two_rules();
        let schema = Validator::compile(Validation::Object { require: Default::default() });
        let state = State::object([("n".to_string(), State::Number(0.0))]);
        let codex = DefaultCodex;
        let neighbors = Neighbors::new(&system, &schema, &state).collect_all(&codex).await.unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].rule_name, "inc");
    }

    #[tokio::test]
    async fn neighbor_carries_rule_metadata() {
        let mut metadata = BTreeMap::new();
        metadata.insert("note".to_string(), "increments n".to_string());
        let inc = ExecutableTransition {
            name: "inc".to_string(),
            constraints: Arc::from(vec![]),
            effects: Arc::from(vec![crate::effect::compile(EffectOp::Increment {
                path: "n".to_string(),
                by: 1.0,
            })
            .unwrap()]),
            cost: Cost::Fixed(1.0),
            metadata: Arc::new(metadata),
        };
        let system = ExecutableSystem { transitions: Arc::from(vec![inc]) };
        let schema = Validator::compile(Validation::Object { require: Default::default() });
        let state = State::object([("n".to_string(), State::Number(0.0))]);
        let codex = DefaultCodex;
        let neighbor =
            Neighbors::new(&system, &schema, &state).advance(&codex).await.unwrap().unwrap();
        assert_eq!(neighbor.metadata.get("note").map(String::as_str), Some("increments n"));
    }
}
