//! The Markov graph of discovered states and transitions.
//!
//! Adjacency is `HashMap<Hash, HashMap<Hash, Edge>>`; `add_edge` is
//! idempotent on `(from, to, rule_name)` and never creates an edge whose
//! endpoints aren't already nodes (no orphan edges).

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use petgraph::graph::DiGraph;

use crate::codex::Hash;

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub rule_name: String,
    pub cost: f64,
    pub metadata: Arc<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default)]
pub struct MarkovGraph {
    adjacency: HashMap<Hash, HashMap<Hash, Edge>>,
}

impl MarkovGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hash` as a node if it isn't already one. Idempotent.
    pub fn add_node(&mut self, hash: Hash) {
        self.adjacency.entry(hash).or_default();
    }

    /// Adds (or replaces, keyed by rule name) an edge `from -> to`. Both
    /// endpoints become nodes if they weren't already — an edge can never
    /// exist without its endpoints, so there is no separate "orphan edge"
    /// state to defend against.
    pub fn add_edge(
        &mut self,
        from: Hash,
        to: Hash,
        rule_name: impl Into<String>,
        cost: f64,
        metadata: Arc<BTreeMap<String, String>>,
    ) {
        self.adjacency.entry(to.clone()).or_default();
        self.adjacency
            .entry(from)
            .or_default()
            .insert(to, Edge { rule_name: rule_name.into(), cost, metadata });
    }

    pub fn contains_node(&self, hash: &Hash) -> bool {
        self.adjacency.contains_key(hash)
    }

    pub fn edges_of(&self, hash: &Hash) -> impl Iterator<Item = (&Hash, &Edge)> {
        self.adjacency.get(hash).into_iter().flat_map(|m| m.iter())
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|m| m.len()).sum()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Hash> {
        self.adjacency.keys()
    }

    /// Converts to a `petgraph::DiGraph` for callers who want graph
    /// algorithms or `petgraph::dot::Dot` export. Node weights are the
    /// state hash strings; edge weights are rule names.
    pub fn to_petgraph(&self) -> DiGraph<String, String> {
        let mut g = DiGraph::new();
        let mut indices = HashMap::new();
        for hash in self.adjacency.keys() {
            let idx = g.add_node(hash.0.clone());
            indices.insert(hash.clone(), idx);
        }
        for (from, edges) in self.adjacency.iter() {
            let from_idx = indices[from];
            for (to, edge) in edges {
                let to_idx = indices[to];
                g.add_edge(from_idx, to_idx, edge.rule_name.clone());
            }
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Hash {
        Hash(s.to_string())
    }

    fn no_metadata() -> Arc<BTreeMap<String, String>> {
        Arc::new(BTreeMap::new())
    }

    #[test]
    fn add_edge_creates_both_endpoints() {
        let mut g = MarkovGraph::new();
        g.add_edge(h("a"), h("b"), "step", 1.0, no_metadata());
        assert!(g.contains_node(&h("a")));
        assert!(g.contains_node(&h("b")));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn add_edge_is_idempotent_per_rule() {
        let mut g = MarkovGraph::new();
        g.add_edge(h("a"), h("b"), "step", 1.0, no_metadata());
        g.add_edge(h("a"), h("b"), "step", 1.0, no_metadata());
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn self_loops_are_legal() {
        let mut g = MarkovGraph::new();
        g.add_edge(h("a"), h("a"), "noop", 0.0, no_metadata());
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn to_petgraph_preserves_topology() {
        let mut g = MarkovGraph::new();
        g.add_edge(h("a"), h("b"), "step", 1.0, no_metadata());
        g.add_edge(h("b"), h("c"), "step", 1.0, no_metadata());
        let pg = g.to_petgraph();
        assert_eq!(pg.node_count(), 3);
        assert_eq!(pg.edge_count(), 2);
    }

    #[test]
    fn edge_carries_metadata() {
        let mut g = MarkovGraph::new();
        let mut metadata = BTreeMap::new();
        metadata.insert("k".to_string(), "v".to_string());
        g.add_edge(h("a"), h("b"), "step", 1.0, Arc::new(metadata));
        let (_, edge) = g.edges_of(&h("a")).next().unwrap();
        assert_eq!(edge.metadata.get("k").map(String::as_str), Some("v"));
    }
}
