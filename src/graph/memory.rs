//! In-memory knowledge graph with dual-indexing.
//!
//! Uses `petgraph` for the graph structure and `DashMap` for fast lookups
//! by resource and by predicate. Also records the agent's navigation
//! history (visited resources, performed actions) so the backtracking
//! strategy has something to return to.

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::{ActionRecord, GraphAdapter, Triple};

/// In-memory knowledge graph backed by petgraph with dual-indexing.
///
/// Node weights are resource identifiers; edge weights are predicates.
/// A secondary predicate index serves predicate-bound queries without a
/// graph walk.
pub struct MemoryGraph {
    /// The directed graph: nodes are resources, edges carry the predicate.
    graph: RwLock<DiGraph<String, String>>,
    /// Resource → NodeIndex mapping for O(1) node lookups.
    node_index: DashMap<String, NodeIndex>,
    /// Predicate → list of (subject, object) pairs.
    predicate_index: DashMap<String, Vec<(String, String)>>,
    /// Triple count.
    triple_count: AtomicUsize,
    /// Visited resources, newest last.
    visited: RwLock<Vec<String>>,
    /// Performed actions, newest last.
    actions: RwLock<Vec<ActionRecord>>,
    /// Free-form trace of the last interaction.
    trace: RwLock<Option<String>>,
}

impl MemoryGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(DiGraph::new()),
            node_index: DashMap::new(),
            predicate_index: DashMap::new(),
            triple_count: AtomicUsize::new(0),
            visited: RwLock::new(Vec::new()),
            actions: RwLock::new(Vec::new()),
            trace: RwLock::new(None),
        }
    }

    /// Ensure a node exists for the given resource, returning its index.
    fn ensure_node(&self, resource: &str) -> NodeIndex {
        if let Some(idx) = self.node_index.get(resource) {
            return *idx.value();
        }
        let mut graph = self.graph.write().expect("graph lock poisoned");
        // Double-check after acquiring write lock
        if let Some(idx) = self.node_index.get(resource) {
            return *idx.value();
        }
        let idx = graph.add_node(resource.to_string());
        self.node_index.insert(resource.to_string(), idx);
        idx
    }

    /// Insert a triple. Duplicate triples are ignored.
    pub fn insert(&self, triple: &Triple) {
        if self.contains(triple) {
            return;
        }
        let subj_idx = self.ensure_node(&triple.subject);
        let obj_idx = self.ensure_node(&triple.object);

        {
            let mut graph = self.graph.write().expect("graph lock poisoned");
            graph.add_edge(subj_idx, obj_idx, triple.predicate.clone());
        }

        self.predicate_index
            .entry(triple.predicate.clone())
            .or_default()
            .push((triple.subject.clone(), triple.object.clone()));

        self.triple_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Insert many triples.
    pub fn insert_all<'a>(&self, triples: impl IntoIterator<Item = &'a Triple>) {
        for t in triples {
            self.insert(t);
        }
    }

    /// Number of stored triples.
    pub fn len(&self) -> usize {
        self.triple_count.load(Ordering::Relaxed)
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a visited resource (newest last).
    pub fn record_visit(&self, resource: impl Into<String>) {
        self.visited
            .write()
            .expect("history lock poisoned")
            .push(resource.into());
    }

    /// Record a performed action (newest last).
    pub fn record_action(&self, record: ActionRecord) {
        self.actions
            .write()
            .expect("history lock poisoned")
            .push(record);
    }

    /// Replace the last-interaction trace.
    pub fn set_trace(&self, trace: impl Into<String>) {
        *self.trace.write().expect("history lock poisoned") = Some(trace.into());
    }

    /// All stored triples.
    pub fn all_triples(&self) -> Vec<Triple> {
        let graph = self.graph.read().expect("graph lock poisoned");
        graph
            .edge_references()
            .map(|e| {
                Triple::new(
                    graph[e.source()].clone(),
                    e.weight().clone(),
                    graph[e.target()].clone(),
                )
            })
            .collect()
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphAdapter for MemoryGraph {
    fn query(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
    ) -> Vec<Triple> {
        let graph = self.graph.read().expect("graph lock poisoned");

        if let Some(s) = subject {
            let Some(idx) = self.node_index.get(s) else {
                return Vec::new();
            };
            return graph
                .edges_directed(*idx.value(), Direction::Outgoing)
                .filter(|e| predicate.is_none_or(|p| e.weight() == p))
                .filter(|e| object.is_none_or(|o| graph[e.target()] == o))
                .map(|e| Triple::new(s, e.weight().clone(), graph[e.target()].clone()))
                .collect();
        }

        if let Some(o) = object {
            let Some(idx) = self.node_index.get(o) else {
                return Vec::new();
            };
            return graph
                .edges_directed(*idx.value(), Direction::Incoming)
                .filter(|e| predicate.is_none_or(|p| e.weight() == p))
                .map(|e| Triple::new(graph[e.source()].clone(), e.weight().clone(), o))
                .collect();
        }

        if let Some(p) = predicate {
            return self
                .predicate_index
                .get(p)
                .map(|pairs| {
                    pairs
                        .iter()
                        .map(|(s, o)| Triple::new(s.clone(), p, o.clone()))
                        .collect()
                })
                .unwrap_or_default();
        }

        graph
            .edge_references()
            .map(|e| {
                Triple::new(
                    graph[e.source()].clone(),
                    e.weight().clone(),
                    graph[e.target()].clone(),
                )
            })
            .collect()
    }

    fn recent_actions(&self, limit: usize) -> Vec<ActionRecord> {
        let actions = self.actions.read().expect("history lock poisoned");
        let start = actions.len().saturating_sub(limit);
        actions[start..].to_vec()
    }

    fn recent_states(&self, limit: usize) -> Vec<String> {
        let visited = self.visited.read().expect("history lock poisoned");
        let start = visited.len().saturating_sub(limit);
        visited[start..].to_vec()
    }

    fn last_trace(&self) -> Option<String> {
        self.trace.read().expect("history lock poisoned").clone()
    }
}

impl std::fmt::Debug for MemoryGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGraph")
            .field("triples", &self.len())
            .finish()
    }
}
