//! Structural pattern matcher.
//!
//! Fast-path patterns are evaluated as conjunctive constraint joins over the
//! bounded [`GraphAdapter`] query interface: constraints run left to right
//! against a growing set of partial bindings, and a constraint with no
//! candidates under a partial binding prunes that branch — the iterative
//! rendition of backtracking joins. Slow-path patterns delegate the verbatim
//! SPARQL body to the adapter's general query capability; both paths return
//! the same [`Bindings`] shape so callers never know which one ran.

use std::collections::BTreeMap;

use crate::error::MatchError;
use crate::graph::GraphAdapter;
use crate::vocab::{CompiledForm, PatternTerm, StructuralPattern, TripleConstraint};

/// A complete, consistent variable assignment for one pattern solution.
pub type Bindings = BTreeMap<String, String>;

/// One extracted target binding with its optional relevance weight.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetBinding {
    /// Value of the pattern's target variable.
    pub target: String,
    /// Numeric value of the relevance variable, when declared and parseable.
    pub relevance: Option<f32>,
}

/// All solutions of a structural pattern against the graph.
///
/// No ordering guarantee among solutions beyond the adapter's query order.
pub fn solutions(
    pattern: &StructuralPattern,
    graph: &dyn GraphAdapter,
) -> Result<Vec<Bindings>, MatchError> {
    match &pattern.compiled {
        CompiledForm::FastPath(constraints) => {
            if constraints.is_empty() {
                return Err(MatchError::MalformedPattern {
                    id: pattern.id.clone(),
                    message: "fast-path pattern has no constraints".into(),
                });
            }
            Ok(join(constraints, &Bindings::new(), graph))
        }
        CompiledForm::SlowPath(body) => slow_solutions(pattern, body, None, graph),
    }
}

/// Solutions with the target variable pre-bound to a specific resource.
pub fn solutions_for_target(
    pattern: &StructuralPattern,
    target: &str,
    graph: &dyn GraphAdapter,
) -> Result<Vec<Bindings>, MatchError> {
    match &pattern.compiled {
        CompiledForm::FastPath(constraints) => {
            let mut seed = Bindings::new();
            seed.insert(pattern.target_variable.clone(), target.to_string());
            Ok(join(constraints, &seed, graph))
        }
        CompiledForm::SlowPath(body) => slow_solutions(pattern, body, Some(target), graph),
    }
}

/// Whether the pattern has at least one solution.
pub fn matches(pattern: &StructuralPattern, graph: &dyn GraphAdapter) -> Result<bool, MatchError> {
    Ok(!solutions(pattern, graph)?.is_empty())
}

/// Extract the target-variable bindings (and relevance weights) of every
/// solution.
pub fn target_bindings(
    pattern: &StructuralPattern,
    graph: &dyn GraphAdapter,
) -> Result<Vec<TargetBinding>, MatchError> {
    let sols = solutions(pattern, graph)?;
    let mut out = Vec::with_capacity(sols.len());
    for sol in &sols {
        let target = sol
            .get(&pattern.target_variable)
            .ok_or_else(|| MatchError::MalformedPattern {
                id: pattern.id.clone(),
                message: format!(
                    "solution does not bind target variable ?{}",
                    pattern.target_variable
                ),
            })?
            .clone();
        let relevance = pattern
            .relevance_variable
            .as_ref()
            .and_then(|v| sol.get(v))
            .and_then(|raw| raw.parse::<f32>().ok());
        out.push(TargetBinding { target, relevance });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Fast path: constraint join
// ---------------------------------------------------------------------------

/// Left-to-right constraint join with pruning.
fn join(
    constraints: &[TripleConstraint],
    seed: &Bindings,
    graph: &dyn GraphAdapter,
) -> Vec<Bindings> {
    let mut partials = vec![seed.clone()];

    for constraint in constraints {
        let mut extended = Vec::new();
        for partial in &partials {
            let s = resolve(&constraint.subject, partial);
            let p = resolve(&constraint.predicate, partial);
            let o = resolve(&constraint.object, partial);

            for triple in graph.query(s.as_deref(), p.as_deref(), o.as_deref()) {
                if let Some(next) = unify(constraint, &triple, partial) {
                    extended.push(next);
                }
            }
        }
        partials = extended;
        if partials.is_empty() {
            break;
        }
    }

    partials
}

/// Ground value of a term under the current partial binding, if any.
fn resolve(term: &PatternTerm, binding: &Bindings) -> Option<String> {
    match term {
        PatternTerm::Ground(value) => Some(value.clone()),
        PatternTerm::Variable(name) => binding.get(name).cloned(),
    }
}

/// Extend a partial binding with one matched triple, or reject it.
///
/// The graph query already filtered on substituted terms; this re-checks
/// every position so that repeated variables within one constraint
/// (`?x ?p ?x`) stay consistent.
fn unify(
    constraint: &TripleConstraint,
    triple: &crate::graph::Triple,
    partial: &Bindings,
) -> Option<Bindings> {
    let mut next = partial.clone();
    for (term, value) in [
        (&constraint.subject, &triple.subject),
        (&constraint.predicate, &triple.predicate),
        (&constraint.object, &triple.object),
    ] {
        match term {
            PatternTerm::Ground(g) => {
                if g != value {
                    return None;
                }
            }
            PatternTerm::Variable(name) => match next.get(name) {
                Some(bound) if bound != value => return None,
                Some(_) => {}
                None => {
                    next.insert(name.clone(), value.clone());
                }
            },
        }
    }
    Some(next)
}

// ---------------------------------------------------------------------------
// Slow path: delegate to the adapter
// ---------------------------------------------------------------------------

fn slow_solutions(
    pattern: &StructuralPattern,
    body: &str,
    target: Option<&str>,
    graph: &dyn GraphAdapter,
) -> Result<Vec<Bindings>, MatchError> {
    let sparql = match target {
        Some(resource) => format!(
            "SELECT * WHERE {{ VALUES ?{} {{ {} }} {} }}",
            pattern.target_variable,
            sparql_term(resource),
            body
        ),
        None => format!("SELECT * WHERE {{ {body} }}"),
    };

    let rows = graph.select(&sparql).map_err(|e| MatchError::SlowPath {
        id: pattern.id.clone(),
        message: e.to_string(),
    })?;

    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().collect::<Bindings>())
        .collect())
}

/// SPARQL surface form of a resource identifier.
fn sparql_term(resource: &str) -> String {
    if resource.contains(':') && !resource.contains(char::is_whitespace) {
        format!("<{resource}>")
    } else {
        format!("\"{}\"", resource.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
