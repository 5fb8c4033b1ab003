//! Pluggable pathfinding studies, all built on the same
//! [`crate::neighbor::Neighbors`] generator the driver uses.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::codex::{Codex, Hash};
use crate::error::WayfinderError;
use crate::neighbor::Neighbors;
use crate::rule::ExecutableSystem;
use crate::schema::Validator;
use crate::state::State;

/// One step of a recovered path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    pub rule_name: String,
    pub state_hash: Hash,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoundPath {
    pub steps: Vec<PathStep>,
    pub total_cost: f64,
}

/// A closed walk the any-path/optimal-path searches would otherwise loop
/// through forever; detecting it is itself a usable result.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedCycle {
    pub closed_walk: Vec<Hash>,
    pub total_cost: f64,
}

struct Frontier {
    priority: f64,
    sequence: u64,
    hash: Hash,
    cost_so_far: f64,
    path: Vec<PathStep>,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for Frontier {}
impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so lowest priority pops first,
        // then break ties by insertion order (FIFO, oldest first).
        other
            .priority
            .partial_cmp(&self.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Finds a least-cost path from `start` to any state for which `is_goal`
/// returns true. `priority` scores a candidate path (lower = explored
/// first; defaults to `cost_so_far` for a Dijkstra-style search). Ties
/// break FIFO by discovery order. `should_replace(c_old, c_new)` decides
/// whether a newly-found cost to an already-reached node supersedes the
/// recorded one (pass [`cheaper`] for the usual `c_new < c_old` rule).
pub async fn optimal_path(
    system: &ExecutableSystem,
    schema: &Validator,
    codex: &dyn Codex,
    start: State,
    is_goal: impl Fn(&State) -> bool,
    priority: impl Fn(f64, &[PathStep]) -> f64,
    should_replace: impl Fn(f64, f64) -> bool,
) -> Result<Option<FoundPath>, WayfinderError> {
    let mut heap = BinaryHeap::new();
    let mut best_cost: HashMap<Hash, f64> = HashMap::new();
    let mut sequence = 0u64;

    let start_hash = codex.encode(&start).await?;
    if is_goal(&start) {
        return Ok(Some(FoundPath { steps: Vec::new(), total_cost: 0.0 }));
    }
    best_cost.insert(start_hash.clone(), 0.0);
    heap.push(Frontier {
        priority: priority(0.0, &[]),
        sequence,
        hash: start_hash,
        cost_so_far: 0.0,
        path: Vec::new(),
    });

    let mut states: HashMap<Hash, State> = HashMap::new();
    states.insert(heap.peek().unwrap().hash.clone(), start);

    while let Some(Frontier { hash, cost_so_far, path, .. }) = heap.pop() {
        if let Some(&known) = best_cost.get(&hash) {
            if cost_so_far > known {
                continue;
            }
        }
        let state = states[&hash].clone();
        tracing::trace!(hash = %hash, cost_so_far, "expanding for optimal path");
        let neighbors = Neighbors::new(system, schema, &state).collect_all(codex).await?;

        for neighbor in neighbors {
            let next_cost = cost_so_far + neighbor.cost;
            let improves = match best_cost.get(&neighbor.after_hash) {
                Some(&known) => should_replace(known, next_cost),
                None => true,
            };
            if !improves {
                continue;
            }
            best_cost.insert(neighbor.after_hash.clone(), next_cost);
            states.insert(neighbor.after_hash.clone(), neighbor.after.clone());

            let mut next_path = path.clone();
            next_path.push(PathStep {
                rule_name: neighbor.rule_name.clone(),
                state_hash: neighbor.after_hash.clone(),
                cost: neighbor.cost,
            });

            if is_goal(&neighbor.after) {
                tracing::info!(total_cost = next_cost, steps = next_path.len(), "optimal path found");
                return Ok(Some(FoundPath { total_cost: next_cost, steps: next_path }));
            }

            sequence += 1;
            heap.push(Frontier {
                priority: priority(next_cost, &next_path),
                sequence,
                hash: neighbor.after_hash,
                cost_so_far: next_cost,
                path: next_path,
            });
        }
    }

    tracing::info!("optimal path search exhausted frontier without reaching goal");
    Ok(None)
}

/// The default `should_replace` for [`optimal_path`]: a strictly cheaper
/// cost always supersedes the recorded one.
pub fn cheaper(old: f64, new: f64) -> bool {
    new < old
}

/// Depth-first search for *any* path to a goal state, suppressing states
/// already on the current path (not globally visited — distinct branches
/// may revisit a state).
pub async fn any_path(
    system: &ExecutableSystem,
    schema: &Validator,
    codex: &dyn Codex,
    start: State,
    is_goal: impl Fn(&State) -> bool + Copy,
    max_depth: Option<usize>,
) -> Result<Option<FoundPath>, WayfinderError> {
    let start_hash = codex.encode(&start).await?;
    let mut on_path = HashSet::new();
    on_path.insert(start_hash);
    let mut path = Vec::new();
    dfs(system, schema, codex, start, is_goal, max_depth, &mut on_path, &mut path, 0.0).await
}

#[allow(clippy::too_many_arguments)]
fn dfs<'a>(
    system: &'a ExecutableSystem,
    schema: &'a Validator,
    codex: &'a dyn Codex,
    current_state: State,
    is_goal: impl Fn(&State) -> bool + Copy + 'a,
    max_depth: Option<usize>,
    on_path: &'a mut HashSet<Hash>,
    path: &'a mut Vec<PathStep>,
    cost_so_far: f64,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<FoundPath>, WayfinderError>> + 'a>>
{
    Box::pin(async move {
        if is_goal(&current_state) {
            return Ok(Some(FoundPath { steps: path.clone(), total_cost: cost_so_far }));
        }
        if let Some(max) = max_depth {
            if path.len() >= max {
                return Ok(None);
            }
        }

        let neighbors = Neighbors::new(system, schema, &current_state).collect_all(codex).await?;

        for neighbor in neighbors {
            if on_path.contains(&neighbor.after_hash) {
                continue;
            }
            on_path.insert(neighbor.after_hash.clone());
            path.push(PathStep {
                rule_name: neighbor.rule_name.clone(),
                state_hash: neighbor.after_hash.clone(),
                cost: neighbor.cost,
            });

            let found = dfs(
                system,
                schema,
                codex,
                neighbor.after.clone(),
                is_goal,
                max_depth,
                on_path,
                path,
                cost_so_far + neighbor.cost,
            )
            .await?;

            if found.is_some() {
                return Ok(found);
            }
            path.pop();
            on_path.remove(&neighbor.after_hash);
        }
        Ok(None)
    })
}

/// Depth-first traversal that reports the first cycle it finds (a revisit
/// of a state still on the current DFS stack), rather than searching for a
/// goal.
pub async fn detect_cycle(
    system: &ExecutableSystem,
    schema: &Validator,
    codex: &dyn Codex,
    start: State,
    max_depth: Option<usize>,
) -> Result<Option<DetectedCycle>, WayfinderError> {
    let start_hash = codex.encode(&start).await?;
    let mut on_stack = vec![start_hash.clone()];
    let mut costs = vec![0.0];
    cycle_dfs(system, schema, codex, start, max_depth, &mut on_stack, &mut costs).await
}

#[allow(clippy::too_many_arguments)]
fn cycle_dfs<'a>(
    system: &'a ExecutableSystem,
    schema: &'a Validator,
    codex: &'a dyn Codex,
    current_state: State,
    max_depth: Option<usize>,
    on_stack: &'a mut Vec<Hash>,
    costs: &'a mut Vec<f64>,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Option<DetectedCycle>, WayfinderError>> + 'a>,
> {
    Box::pin(async move {
        if let Some(max) = max_depth {
            if on_stack.len() > max {
                return Ok(None);
            }
        }

        let current = current_state.clone();
        let neighbors = Neighbors::new(system, schema, &current).collect_all(codex).await?;

        for neighbor in neighbors {
            if let Some(pos) = on_stack.iter().position(|h| h == &neighbor.after_hash) {
                let mut closed_walk = on_stack[pos..].to_vec();
                closed_walk.push(neighbor.after_hash.clone());
                let total_cost: f64 = costs[pos..].iter().sum::<f64>() + neighbor.cost;
                tracing::info!(cycle_len = closed_walk.len(), total_cost, "cycle detected");
                return Ok(Some(DetectedCycle { closed_walk, total_cost }));
            }

            on_stack.push(neighbor.after_hash.clone());
            costs.push(neighbor.cost);
            let found =
                cycle_dfs(system, schema, codex, neighbor.after, max_depth, on_stack, costs).await?;
            if found.is_some() {
                return Ok(found);
            }
            on_stack.pop();
            costs.pop();
        }
        Ok(None)
    })
}

/// Breadth-first expansion to exhaustion within `limits`. A thin wrapper
/// over [`crate::explore::Explorer`], returning its graph and profile
/// directly.
pub async fn bounded_expansion(
    system: &ExecutableSystem,
    schema: &Validator,
    codex: &dyn Codex,
    start: State,
    limits: crate::explore::Limits,
) -> Result<(crate::graph::MarkovGraph, crate::explore::ExploreProfile), WayfinderError> {
    let mut explorer = crate::explore::Explorer::new(system, schema, codex);
    explorer.limits = limits;
    explorer.explore(vec![start], crate::explore::NoHooks).await
}
