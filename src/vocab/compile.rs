//! Pattern vocabulary compiler.
//!
//! Turns [`RuleCatalog`] declarations into the compiled, read-only artifacts
//! the matcher and relevance scorer work from: an O(1) simple-pattern index
//! and a priority-sorted list of structural patterns, each committed at
//! compile time to either the fast evaluation path (flattened triple
//! constraints) or the slow path (verbatim SPARQL body). The matcher never
//! probes capabilities at run time; the decision is baked into the
//! [`CompiledForm`] sum type here.

use std::collections::{BTreeSet, HashMap};

use crate::error::VocabError;

use super::rules::{RuleCatalog, RuleDeclaration, RuleKind};

/// `rdf:type`, the expansion of the `a` keyword.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// SPARQL features that disqualify a body from the fast path.
const SLOW_KEYWORDS: &[&str] = &[
    "OPTIONAL", "UNION", "FILTER", "MINUS", "GRAPH", "SERVICE", "BIND", "VALUES", "SELECT",
    "GROUP BY", "HAVING", "COUNT(", "SUM(", "AVG(", "MIN(", "MAX(", "SAMPLE(",
];

// ---------------------------------------------------------------------------
// Compiled pattern types
// ---------------------------------------------------------------------------

/// A term in a triple constraint: variable or ground value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    /// A variable binding (e.g. `?option`).
    Variable(String),
    /// A ground IRI or literal value.
    Ground(String),
}

impl PatternTerm {
    /// Returns `true` if this term is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }
}

/// One flattened triple constraint of a fast-path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleConstraint {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TripleConstraint {
    /// All variable names used by this constraint.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(|t| match t {
                PatternTerm::Variable(v) => Some(v.as_str()),
                PatternTerm::Ground(_) => None,
            })
    }
}

/// How a structural pattern is evaluated. Decided once at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledForm {
    /// Pure triple conjunction, evaluated by the constraint-join matcher.
    FastPath(Vec<TripleConstraint>),
    /// Anything richer, delegated verbatim to the adapter's SPARQL engine.
    SlowPath(String),
}

/// A compiled membership pattern, indexed by `(pattern_type, position)`.
#[derive(Debug, Clone)]
pub struct SimplePattern {
    pub id: String,
    pub pattern_type: String,
    pub priority: f32,
    pub position: String,
}

/// A compiled multi-triple graph pattern.
#[derive(Debug, Clone)]
pub struct StructuralPattern {
    pub id: String,
    pub pattern_type: String,
    pub priority: f32,
    /// Variable whose bindings identify the matched option.
    pub target_variable: String,
    /// Optional variable carrying a numeric relevance weight.
    pub relevance_variable: Option<String>,
    pub compiled: CompiledForm,
}

impl StructuralPattern {
    /// Whether this pattern takes the fast evaluation path.
    pub fn is_fast_path(&self) -> bool {
        matches!(self.compiled, CompiledForm::FastPath(_))
    }
}

// ---------------------------------------------------------------------------
// Compiled vocabulary
// ---------------------------------------------------------------------------

/// The compiled, read-only pattern vocabulary.
///
/// Built once at load; safe to share across threads without locking.
#[derive(Debug, Clone, Default)]
pub struct PatternVocabulary {
    simple: HashMap<(String, String), SimplePattern>,
    structural: Vec<StructuralPattern>,
    pattern_types: BTreeSet<String>,
    /// Ids of declarations skipped because their body did not parse.
    pub skipped: Vec<String>,
}

impl PatternVocabulary {
    /// Compile a rule catalog.
    ///
    /// Out-of-range priorities fail the whole compile (configuration error).
    /// A declaration whose body cannot be parsed at all is logged and
    /// skipped; its id is recorded in [`PatternVocabulary::skipped`].
    pub fn compile(catalog: &RuleCatalog) -> Result<Self, VocabError> {
        let mut vocab = Self::default();

        for decl in &catalog.declarations {
            if !(-1.0..=1.0).contains(&decl.priority) {
                return Err(VocabError::PriorityOutOfRange {
                    id: decl.id.clone(),
                    priority: decl.priority,
                });
            }

            let outcome = match decl.kind {
                RuleKind::Simple => vocab.compile_simple(decl),
                RuleKind::Structural => vocab.compile_structural(decl),
            };
            if let Err(e) = outcome {
                tracing::warn!(rule = %decl.id, error = %e, "skipping unparseable pattern");
                vocab.skipped.push(decl.id.clone());
            }
        }

        // Descending priority; sort_by is stable, so equal priorities keep
        // declaration order.
        vocab.structural.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::debug!(
            simple = vocab.simple.len(),
            structural = vocab.structural.len(),
            skipped = vocab.skipped.len(),
            "compiled pattern vocabulary"
        );
        Ok(vocab)
    }

    fn compile_simple(&mut self, decl: &RuleDeclaration) -> Result<(), VocabError> {
        let position = decl
            .matches_position
            .clone()
            .ok_or_else(|| VocabError::PatternParse {
                id: decl.id.clone(),
                message: "simple rule is missing matchesPosition".into(),
            })?;
        let pattern = SimplePattern {
            id: decl.id.clone(),
            pattern_type: decl.pattern_type.clone(),
            priority: decl.priority,
            position: position.clone(),
        };
        self.pattern_types.insert(decl.pattern_type.clone());
        self.simple
            .insert((decl.pattern_type.clone(), position), pattern);
        Ok(())
    }

    fn compile_structural(&mut self, decl: &RuleDeclaration) -> Result<(), VocabError> {
        let body = decl
            .sparql_pattern
            .as_deref()
            .ok_or_else(|| VocabError::PatternParse {
                id: decl.id.clone(),
                message: "structural rule is missing sparqlPattern".into(),
            })?;
        let target = decl
            .extract_target_variable
            .clone()
            .ok_or_else(|| VocabError::MissingTargetVariable { id: decl.id.clone() })?;

        let compiled = if contains_slow_keyword(body) {
            CompiledForm::SlowPath(body.to_string())
        } else {
            match flatten_bgp(body) {
                Flattened::Constraints(constraints) => {
                    let has_target = constraints
                        .iter()
                        .any(|c| c.variables().any(|v| v == target));
                    if !has_target {
                        return Err(VocabError::PatternParse {
                            id: decl.id.clone(),
                            message: format!("target variable ?{target} not bound by the body"),
                        });
                    }
                    CompiledForm::FastPath(constraints)
                }
                // Conjunctive in shape but using features (property paths)
                // the join cannot evaluate.
                Flattened::Ineligible(_) => CompiledForm::SlowPath(body.to_string()),
                Flattened::Malformed(message) => {
                    return Err(VocabError::PatternParse {
                        id: decl.id.clone(),
                        message,
                    });
                }
            }
        };

        self.pattern_types.insert(decl.pattern_type.clone());
        self.structural.push(StructuralPattern {
            id: decl.id.clone(),
            pattern_type: decl.pattern_type.clone(),
            priority: decl.priority,
            target_variable: target,
            relevance_variable: decl.extract_relevance_variable.clone(),
            compiled,
        });
        Ok(())
    }

    /// O(1) membership test: does a `(pattern_type, position)` rule exist?
    ///
    /// Returns the rule's priority on a hit. The `uri` is the option being
    /// tested; it does not take part in the lookup.
    pub fn matches_simple(&self, uri: &str, pattern_type: &str, position: &str) -> Option<f32> {
        let hit = self
            .simple
            .get(&(pattern_type.to_string(), position.to_string()))
            .map(|p| p.priority);
        if let Some(priority) = hit {
            tracing::trace!(%uri, %pattern_type, %position, priority, "simple pattern hit");
        }
        hit
    }

    /// Structural patterns, sorted descending by priority.
    pub fn structural_patterns(&self) -> &[StructuralPattern] {
        &self.structural
    }

    /// All compiled simple patterns.
    pub fn simple_patterns(&self) -> impl Iterator<Item = &SimplePattern> {
        self.simple.values()
    }

    /// The set of rule types this vocabulary knows about.
    pub fn pattern_types(&self) -> &BTreeSet<String> {
        &self.pattern_types
    }
}

// ---------------------------------------------------------------------------
// Basic-graph-pattern flattening
// ---------------------------------------------------------------------------

enum Flattened {
    Constraints(Vec<TripleConstraint>),
    Ineligible(String),
    Malformed(String),
}

fn contains_slow_keyword(body: &str) -> bool {
    let upper = body.to_uppercase();
    SLOW_KEYWORDS.iter().any(|kw| upper.contains(kw))
}

/// Flatten a pure triple conjunction into ordered constraints.
fn flatten_bgp(body: &str) -> Flattened {
    let body = body.trim();
    let body = body
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .map(str::trim)
        .unwrap_or(body);

    let statements = split_statements(body);
    if statements.is_empty() {
        return Flattened::Malformed("empty pattern body".into());
    }

    let mut constraints = Vec::with_capacity(statements.len());
    for stmt in &statements {
        let tokens = match tokenize(stmt) {
            Ok(t) => t,
            Err(msg) => return Flattened::Malformed(msg),
        };
        if tokens.len() != 3 {
            return Flattened::Malformed(format!(
                "triple pattern must have exactly 3 terms, got {}: '{stmt}'",
                tokens.len()
            ));
        }

        // Property-path operators on a bare predicate disqualify the body
        // from the join; oxigraph can still evaluate it.
        let raw_pred = &tokens[1];
        if !raw_pred.starts_with('<')
            && !raw_pred.starts_with('?')
            && raw_pred.chars().any(|c| "/|*+^!".contains(c))
        {
            return Flattened::Ineligible(format!("property path in predicate '{raw_pred}'"));
        }

        let subject = match parse_term(&tokens[0]) {
            Ok(t) => t,
            Err(msg) => return Flattened::Malformed(msg),
        };
        let predicate = match parse_term(&tokens[1]) {
            Ok(t) => t,
            Err(msg) => return Flattened::Malformed(msg),
        };
        let object = match parse_term(&tokens[2]) {
            Ok(t) => t,
            Err(msg) => return Flattened::Malformed(msg),
        };
        constraints.push(TripleConstraint {
            subject,
            predicate,
            object,
        });
    }

    Flattened::Constraints(constraints)
}

/// Split a pattern body on top-level `.` separators.
///
/// A dot only separates statements when it sits between whitespace (or a
/// closing `>`/`"`) and whitespace/end, so decimals like `1.5` survive.
fn split_statements(body: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = body.chars().collect();
    let mut in_quote = false;
    let mut in_angle = false;

    for (i, &ch) in chars.iter().enumerate() {
        match ch {
            '"' if !in_angle => in_quote = !in_quote,
            '<' if !in_quote => in_angle = true,
            '>' if !in_quote => in_angle = false,
            '.' if !in_quote && !in_angle => {
                let prev_ok = i == 0
                    || chars[i - 1].is_whitespace()
                    || chars[i - 1] == '>'
                    || chars[i - 1] == '"';
                let next_ok = i + 1 == chars.len() || chars[i + 1].is_whitespace();
                if prev_ok && next_ok {
                    if !current.trim().is_empty() {
                        statements.push(current.trim().to_string());
                    }
                    current.clear();
                    continue;
                }
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }
    statements
}

/// Split one statement into whitespace-separated terms, keeping `<...>` and
/// `"..."` groups intact.
fn tokenize(stmt: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut in_angle = false;

    for ch in stmt.chars() {
        match ch {
            '"' if !in_angle => {
                in_quote = !in_quote;
                current.push(ch);
            }
            '<' if !in_quote => {
                in_angle = true;
                current.push(ch);
            }
            '>' if !in_quote => {
                in_angle = false;
                current.push(ch);
            }
            c if c.is_whitespace() && !in_quote && !in_angle => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quote {
        return Err(format!("unterminated string literal in '{stmt}'"));
    }
    if in_angle {
        return Err(format!("unterminated IRI in '{stmt}'"));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse a single term token.
fn parse_term(token: &str) -> Result<PatternTerm, String> {
    if let Some(name) = token.strip_prefix('?') {
        if name.is_empty() {
            return Err("empty variable name".into());
        }
        return Ok(PatternTerm::Variable(name.to_string()));
    }
    if let Some(inner) = token.strip_prefix('<') {
        let iri = inner
            .strip_suffix('>')
            .ok_or_else(|| format!("unterminated IRI '{token}'"))?;
        return Ok(PatternTerm::Ground(iri.to_string()));
    }
    if let Some(inner) = token.strip_prefix('"') {
        // Drop any datatype/language tag after the closing quote.
        let end = inner
            .rfind('"')
            .ok_or_else(|| format!("unterminated literal '{token}'"))?;
        let value = inner[..end].replace("\\\"", "\"").replace("\\\\", "\\");
        return Ok(PatternTerm::Ground(value));
    }
    if token == "a" {
        return Ok(PatternTerm::Ground(RDF_TYPE.to_string()));
    }
    // Bare token: plain identifier or number.
    Ok(PatternTerm::Ground(token.to_string()))
}
