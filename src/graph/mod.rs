//! Knowledge-graph boundary: the triple data model and the adapter trait.
//!
//! CCRS never owns graph storage. The agent's belief base (or any other
//! triple store) is presented through [`GraphAdapter`], a bounded query
//! interface the matcher and the strategies read from.
//!
//! - **In-memory adapter** ([`memory::MemoryGraph`]): petgraph-backed, for
//!   local exploration state and tests
//! - **SPARQL adapter** ([`sparql::SparqlGraph`]): oxigraph-backed, also
//!   provides the general query capability the slow path delegates to

pub mod memory;
pub mod sparql;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// A triple (subject, predicate, object) in the knowledge graph.
///
/// Terms are resource IRIs or literal text; hypermedia resources carry their
/// dereferenceable IRIs verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// The subject of the triple.
    pub subject: String,
    /// The predicate (relation) of the triple.
    pub predicate: String,
    /// The object of the triple.
    pub object: String,
}

impl Triple {
    /// Create a new triple.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

/// Bounded neighborhood of a resource: outgoing and incoming triples.
#[derive(Debug, Clone, Default)]
pub struct Neighborhood {
    /// Triples with the resource as subject (capped at `max_out`).
    pub outgoing: Vec<Triple>,
    /// Triples with the resource as object (capped at `max_in`).
    pub incoming: Vec<Triple>,
}

impl Neighborhood {
    /// Total number of triples in the neighborhood.
    pub fn len(&self) -> usize {
        self.outgoing.len() + self.incoming.len()
    }

    /// Whether the neighborhood is empty.
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }
}

/// One past action from the agent's interaction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Action identifier (e.g. an HTTP method or affordance name).
    pub action: String,
    /// The resource the action targeted.
    pub target: String,
    /// Whether the action succeeded.
    pub succeeded: bool,
}

/// A row of variable bindings from a general (SPARQL) query.
pub type SelectRow = std::collections::HashMap<String, String>;

/// Bounded read interface over the agent's knowledge graph.
///
/// `query` is the workhorse: any combination of ground/unbound positions.
/// History accessors default to empty so adapters without navigation memory
/// stay trivial to implement; `select` defaults to unsupported so only
/// SPARQL-capable adapters opt into slow-path evaluation.
pub trait GraphAdapter: Send + Sync {
    /// Return all triples matching the given (possibly partial) pattern.
    fn query(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
    ) -> Vec<Triple>;

    /// Whether the exact triple is present.
    fn contains(&self, triple: &Triple) -> bool {
        !self
            .query(
                Some(&triple.subject),
                Some(&triple.predicate),
                Some(&triple.object),
            )
            .is_empty()
    }

    /// Bounded neighborhood of a resource.
    fn neighborhood(&self, resource: &str, max_out: usize, max_in: usize) -> Neighborhood {
        let mut outgoing = self.query(Some(resource), None, None);
        outgoing.truncate(max_out);
        let mut incoming = self.query(None, None, Some(resource));
        incoming.truncate(max_in);
        Neighborhood { outgoing, incoming }
    }

    /// Most recent actions, newest last. Empty when unsupported.
    fn recent_actions(&self, _limit: usize) -> Vec<ActionRecord> {
        Vec::new()
    }

    /// Most recently visited resources, newest last. Empty when unsupported.
    fn recent_states(&self, _limit: usize) -> Vec<String> {
        Vec::new()
    }

    /// Free-form trace of the last interaction, if the adapter keeps one.
    fn last_trace(&self) -> Option<String> {
        None
    }

    /// Evaluate a general SPARQL SELECT over the graph.
    ///
    /// This is the slow-path capability; adapters without it keep the
    /// default and fast-path-only vocabularies still work.
    fn select(&self, _sparql: &str) -> Result<Vec<SelectRow>, GraphError> {
        Err(GraphError::SelectUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGraph(Vec<Triple>);

    impl GraphAdapter for FixedGraph {
        fn query(
            &self,
            subject: Option<&str>,
            predicate: Option<&str>,
            object: Option<&str>,
        ) -> Vec<Triple> {
            self.0
                .iter()
                .filter(|t| subject.is_none_or(|s| t.subject == s))
                .filter(|t| predicate.is_none_or(|p| t.predicate == p))
                .filter(|t| object.is_none_or(|o| t.object == o))
                .cloned()
                .collect()
        }
    }

    fn sample() -> FixedGraph {
        FixedGraph(vec![
            Triple::new("http://x/a", "http://x/link", "http://x/b"),
            Triple::new("http://x/b", "http://x/link", "http://x/c"),
            Triple::new("http://x/c", "http://x/back", "http://x/a"),
        ])
    }

    #[test]
    fn contains_uses_query_default() {
        let g = sample();
        assert!(g.contains(&Triple::new("http://x/a", "http://x/link", "http://x/b")));
        assert!(!g.contains(&Triple::new("http://x/a", "http://x/link", "http://x/c")));
    }

    #[test]
    fn neighborhood_bounds_are_applied() {
        let g = sample();
        let n = g.neighborhood("http://x/a", 1, 0);
        assert_eq!(n.outgoing.len(), 1);
        assert!(n.incoming.is_empty());
    }

    #[test]
    fn history_defaults_are_empty() {
        let g = sample();
        assert!(g.recent_actions(5).is_empty());
        assert!(g.recent_states(5).is_empty());
        assert!(g.last_trace().is_none());
    }

    #[test]
    fn select_defaults_to_unsupported() {
        let g = sample();
        assert!(matches!(
            g.select("SELECT ?s WHERE { ?s ?p ?o }"),
            Err(GraphError::SelectUnsupported)
        ));
    }
}
