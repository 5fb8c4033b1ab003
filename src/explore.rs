//! The exploration driver.
//!
//! Single-threaded and cooperatively async: the only suspension points are
//! codex calls and user hooks. A plain loop driven by one `tokio` task, with
//! a frontier / visited-set / hook-callback / report-shaped-profile discipline.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::codex::{Codex, Hash};
use crate::error::{HookError, ValidationError, WayfinderError};
use crate::graph::MarkovGraph;
use crate::neighbor::{Neighbor, Neighbors};
use crate::rule::ExecutableSystem;
use crate::schema::Validator;
use crate::state::State;

/// Caps on exploration effort. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub max_iterations: Option<usize>,
    pub max_states: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Exhausted,
    IterationLimit,
    StateLimit,
    UserExit,
}

/// Summary statistics for a completed exploration, generalizing the
/// bounded-expansion study's required profile to every study — every study
/// runs the same `explore()` loop underneath.
#[derive(Debug, Clone, Default)]
pub struct ExploreProfile {
    pub total_states: usize,
    pub total_transitions: usize,
    pub avg_branching: f64,
    pub max_branching: usize,
    pub min_branching: usize,
    pub iterations: usize,
    pub limit_reached: Option<ExitReason>,
}

/// What a hook tells the driver to do next. Returning `Stop` cooperatively
/// cancels the run without the hook having to synthesize an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookControl {
    Continue,
    Stop,
}

/// Called once per newly-discovered transition, before the driver commits
/// the destination to the visited set. `is_terminal` is true when the state
/// has zero successful outgoing transitions.
pub trait ExploreHooks {
    fn on_transition(
        &mut self,
        from: &Hash,
        neighbor: &Neighbor,
        is_terminal: bool,
    ) -> Result<HookControl, HookError> {
        let _ = (from, neighbor, is_terminal);
        Ok(HookControl::Continue)
    }

    fn on_cycle_detected(&mut self, from: &Hash, to: &Hash) -> Result<HookControl, HookError> {
        let _ = (from, to);
        Ok(HookControl::Continue)
    }
}

/// A no-op hook set, for callers (like the studies) that don't need one.
pub struct NoHooks;
impl ExploreHooks for NoHooks {}

pub struct Explorer<'a> {
    system: &'a ExecutableSystem,
    schema: &'a Validator,
    codex: &'a dyn Codex,
    pub limits: Limits,
    pub ignore_self_loops: bool,
}

impl<'a> Explorer<'a> {
    pub fn new(system: &'a ExecutableSystem, schema: &'a Validator, codex: &'a dyn Codex) -> Self {
        Self { system, schema, codex, limits: Limits::default(), ignore_self_loops: false }
    }

    /// Breadth-first exploration from `initial_states`, visiting each
    /// reachable state exactly once and recording every transition into a
    /// [`MarkovGraph`]. Returns the graph plus a profile of the run.
    pub async fn explore(
        &self,
        initial_states: Vec<State>,
        mut hooks: impl ExploreHooks,
    ) -> Result<(MarkovGraph, ExploreProfile), WayfinderError> {
        tracing::info!(count = initial_states.len(), "starting exploration");

        let mut graph = MarkovGraph::new();
        let mut visited: HashSet<Hash> = HashSet::new();
        let mut states: HashMap<Hash, State> = HashMap::new();
        let mut frontier: VecDeque<Hash> = VecDeque::new();

        for state in initial_states {
            if let Err(mut errors) = self.schema.validate(&state) {
                let first = errors.remove(0);
                return Err(ValidationError { path: first.path, message: first.message }.into());
            }
            let hash = self.codex.encode(&state).await?;
            if visited.insert(hash.clone()) {
                graph.add_node(hash.clone());
                states.insert(hash.clone(), state);
                frontier.push_back(hash);
            }
        }

        let mut branching_counts: Vec<usize> = Vec::new();
        let mut iterations = 0usize;
        let mut limit_reached = None;

        'outer: while let Some(current_hash) = frontier.pop_front() {
            if let Some(max) = self.limits.max_iterations {
                if iterations >= max {
                    limit_reached = Some(ExitReason::IterationLimit);
                    break;
                }
            }
            if let Some(max) = self.limits.max_states {
                if visited.len() >= max {
                    limit_reached = Some(ExitReason::StateLimit);
                    break;
                }
            }
            iterations += 1;

            let current_state = states[&current_hash].clone();
            tracing::trace!(hash = %current_hash, iteration = iterations, "expanding state");
            let neighbors = Neighbors::new(self.system, self.schema, &current_state)
                .collect_all(self.codex)
                .await?;
            branching_counts.push(neighbors.len());

            for neighbor in &neighbors {
                let is_self_loop = neighbor.after_hash == current_hash;
                if is_self_loop && self.ignore_self_loops {
                    graph.add_edge(
                        current_hash.clone(),
                        neighbor.after_hash.clone(),
                        neighbor.rule_name.clone(),
                        neighbor.cost,
                        neighbor.metadata.clone(),
                    );
                    continue;
                }

                let already_visited = visited.contains(&neighbor.after_hash);

                let mut stop = false;
                if already_visited {
                    if hooks.on_cycle_detected(&current_hash, &neighbor.after_hash)?
                        == HookControl::Stop
                    {
                        stop = true;
                    }
                }
                if hooks.on_transition(&current_hash, neighbor, false)? == HookControl::Stop {
                    stop = true;
                }

                graph.add_edge(
                    current_hash.clone(),
                    neighbor.after_hash.clone(),
                    neighbor.rule_name.clone(),
                    neighbor.cost,
                    neighbor.metadata.clone(),
                );

                if !already_visited {
                    visited.insert(neighbor.after_hash.clone());
                    states.insert(neighbor.after_hash.clone(), neighbor.after.clone());
                    frontier.push_back(neighbor.after_hash.clone());
                }

                if stop {
                    tracing::info!("exploration stopped by hook");
                    limit_reached = Some(ExitReason::UserExit);
                    break 'outer;
                }
            }
        }

        let total_states = visited.len();
        let total_transitions: usize = branching_counts.iter().sum();
        let max_branching = branching_counts.iter().copied().max().unwrap_or(0);
        let min_branching = branching_counts.iter().copied().min().unwrap_or(0);
        let avg_branching = if branching_counts.is_empty() {
            0.0
        } else {
            total_transitions as f64 / branching_counts.len() as f64
        };

        tracing::info!(
            total_states,
            total_transitions,
            iterations,
            ?limit_reached,
            "exploration finished"
        );

        Ok((
            graph,
            ExploreProfile {
                total_states,
                total_transitions,
                avg_branching,
                max_branching,
                min_branching,
                iterations,
                limit_reached,
            },
        ))
    }
}
