//! SPARQL-capable graph adapter backed by oxigraph.
//!
//! Implements the bounded [`GraphAdapter`] query interface as generated
//! SELECTs and exposes the general `select` capability the slow evaluation
//! path delegates to. Terms that are not absolute IRIs are namespaced under
//! `urn:ccrs:term:` on the way in and stripped on the way out, so callers
//! only ever see their own identifiers.

use oxigraph::model::{GraphNameRef, Literal, NamedNode, Quad, Term};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::GraphError;

use super::{GraphAdapter, SelectRow, Triple};

/// Namespace for terms that are not themselves absolute IRIs.
const CCRS_NS: &str = "urn:ccrs:term:";

/// Persistent or in-memory SPARQL store adapter.
pub struct SparqlGraph {
    store: Store,
}

impl SparqlGraph {
    /// Create a new in-memory SPARQL store (no persistence).
    pub fn in_memory() -> Result<Self, GraphError> {
        let store = Store::new().map_err(|e| GraphError::Sparql {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Open or create a persistent store at the given path.
    pub fn open(path: &std::path::Path) -> Result<Self, GraphError> {
        std::fs::create_dir_all(path).map_err(|e| GraphError::Sparql {
            message: format!("failed to create oxigraph directory: {e}"),
        })?;
        let store = Store::open(path).map_err(|e| GraphError::Sparql {
            message: format!("failed to open oxigraph store at {}: {e}", path.display()),
        })?;
        Ok(Self { store })
    }

    /// Convert a subject/predicate term to an IRI node.
    ///
    /// Terms are expected to be IRI-safe tokens; anything that is not an
    /// absolute IRI is namespaced under `urn:ccrs:term:`.
    fn term_to_iri(term: &str) -> Result<NamedNode, GraphError> {
        match NamedNode::new(term) {
            Ok(node) => Ok(node),
            Err(_) => NamedNode::new(format!("{CCRS_NS}{term}")).map_err(|e| {
                GraphError::InvalidTerm {
                    term: term.to_string(),
                    message: e.to_string(),
                }
            }),
        }
    }

    /// Convert an object term: IRIs stay IRIs, everything else is a literal.
    fn term_to_object(term: &str) -> Term {
        match NamedNode::new(term) {
            Ok(node) => Term::NamedNode(node),
            Err(_) => Term::Literal(Literal::new_simple_literal(term)),
        }
    }

    /// Render an oxigraph term back to a caller-facing string.
    fn render_term(term: &Term) -> String {
        match term {
            Term::NamedNode(n) => n
                .as_str()
                .strip_prefix(CCRS_NS)
                .unwrap_or(n.as_str())
                .to_string(),
            Term::Literal(l) => l.value().to_string(),
            other => other.to_string(),
        }
    }

    /// SPARQL surface form of a subject/predicate position.
    fn iri_token(term: &str) -> Result<String, GraphError> {
        Ok(format!("<{}>", Self::term_to_iri(term)?.as_str()))
    }

    /// SPARQL surface form of an object position.
    fn object_token(term: &str) -> String {
        match Self::term_to_object(term) {
            Term::NamedNode(n) => format!("<{}>", n.as_str()),
            _ => format!("\"{}\"", term.replace('\\', "\\\\").replace('"', "\\\"")),
        }
    }

    /// Insert a triple into the store.
    pub fn insert(&self, triple: &Triple) -> Result<(), GraphError> {
        let subject = Self::term_to_iri(&triple.subject)?;
        let predicate = Self::term_to_iri(&triple.predicate)?;
        let object = Self::term_to_object(&triple.object);

        let quad = Quad::new(subject, predicate, object, GraphNameRef::DefaultGraph);
        self.store.insert(&quad).map_err(|e| GraphError::Sparql {
            message: format!("insert failed: {e}"),
        })?;
        Ok(())
    }

    /// Insert many triples.
    pub fn insert_all<'a>(
        &self,
        triples: impl IntoIterator<Item = &'a Triple>,
    ) -> Result<usize, GraphError> {
        let mut count = 0;
        for t in triples {
            self.insert(t)?;
            count += 1;
        }
        Ok(count)
    }

    /// Number of stored triples.
    pub fn len(&self) -> Result<usize, GraphError> {
        self.store.len().map_err(|e| GraphError::Sparql {
            message: format!("len failed: {e}"),
        })
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> Result<bool, GraphError> {
        self.len().map(|n| n == 0)
    }

    fn run_select(&self, sparql: &str) -> Result<Vec<SelectRow>, GraphError> {
        let results = self.store.query(sparql).map_err(|e| GraphError::Sparql {
            message: format!("SPARQL query failed: {e}"),
        })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| GraphError::Sparql {
                        message: format!("solution error: {e}"),
                    })?;
                    let mut row = SelectRow::new();
                    for (var, term) in solution.iter() {
                        row.insert(var.as_str().to_string(), Self::render_term(term));
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            QueryResults::Boolean(_) | QueryResults::Graph(_) => Err(GraphError::Sparql {
                message: "expected a SELECT result".into(),
            }),
        }
    }
}

impl GraphAdapter for SparqlGraph {
    fn query(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
    ) -> Vec<Triple> {
        let mut build = || -> Result<Vec<Triple>, GraphError> {
            let s_tok = match subject {
                Some(s) => Self::iri_token(s)?,
                None => "?s".into(),
            };
            let p_tok = match predicate {
                Some(p) => Self::iri_token(p)?,
                None => "?p".into(),
            };
            let o_tok = match object {
                Some(o) => Self::object_token(o),
                None => "?o".into(),
            };
            let sparql = format!("SELECT * WHERE {{ {s_tok} {p_tok} {o_tok} }}");
            let rows = self.run_select(&sparql)?;

            Ok(rows
                .into_iter()
                .map(|row| {
                    Triple::new(
                        subject
                            .map(str::to_string)
                            .or_else(|| row.get("s").cloned())
                            .unwrap_or_default(),
                        predicate
                            .map(str::to_string)
                            .or_else(|| row.get("p").cloned())
                            .unwrap_or_default(),
                        object
                            .map(str::to_string)
                            .or_else(|| row.get("o").cloned())
                            .unwrap_or_default(),
                    )
                })
                .collect())
        };

        match build() {
            Ok(triples) => triples,
            Err(e) => {
                tracing::warn!(error = %e, "bounded query against SPARQL store failed");
                Vec::new()
            }
        }
    }

    fn select(&self, sparql: &str) -> Result<Vec<SelectRow>, GraphError> {
        self.run_select(sparql)
    }
}

impl std::fmt::Debug for SparqlGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparqlGraph").finish()
    }
}
