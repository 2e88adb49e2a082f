//! Relevance scoring of discovered options against the compiled vocabulary.
//!
//! While exploring, the agent discovers options (links, affordances, fellow
//! agents' markers). Before a recovery decision, each candidate is scored:
//! simple-index hits contribute their priority directly; structural patterns
//! contribute their priority weighted by the numeric relevance binding when
//! the pattern declares one. Negative priorities repel (dead ends, stale
//! trails), positive ones attract.

use crate::graph::GraphAdapter;
use crate::matcher;
use crate::vocab::PatternVocabulary;

/// A discovered option the agent could act on.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateOption {
    /// Resource identifier of the option.
    pub uri: String,
    /// Semantic type tag of the option, as discovered.
    pub option_type: String,
    /// Where in the discovery the option appeared (e.g. `target`).
    pub position: String,
}

impl CandidateOption {
    /// Create a new candidate.
    pub fn new(
        uri: impl Into<String>,
        option_type: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            option_type: option_type.into(),
            position: position.into(),
        }
    }
}

/// A candidate with its accumulated relevance score.
#[derive(Debug, Clone)]
pub struct ScoredOption {
    pub option: CandidateOption,
    /// Sum of matched pattern contributions; unmatched candidates score 0.
    pub score: f32,
    /// Ids of the patterns that contributed.
    pub matched_patterns: Vec<String>,
}

/// Scores candidates against a compiled vocabulary.
pub struct RelevanceScorer<'a> {
    vocab: &'a PatternVocabulary,
}

impl<'a> RelevanceScorer<'a> {
    /// Create a scorer over a compiled vocabulary.
    pub fn new(vocab: &'a PatternVocabulary) -> Self {
        Self { vocab }
    }

    /// Score a single candidate.
    ///
    /// A structural pattern contributes once, regardless of how many
    /// solutions bind the candidate; the strongest relevance weight wins.
    /// A pattern that fails to evaluate is logged and skipped — scoring is
    /// advisory and must not abort a recovery decision.
    pub fn score(&self, graph: &dyn GraphAdapter, candidate: &CandidateOption) -> ScoredOption {
        let mut score = 0.0f32;
        let mut matched = Vec::new();

        if let Some(priority) =
            self.vocab
                .matches_simple(&candidate.uri, &candidate.option_type, &candidate.position)
        {
            score += priority;
            matched.push(format!("simple:{}", candidate.option_type));
        }

        for pattern in self.vocab.structural_patterns() {
            let solutions = match matcher::solutions_for_target(pattern, &candidate.uri, graph) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(pattern = %pattern.id, error = %e, "pattern skipped during scoring");
                    continue;
                }
            };
            if solutions.is_empty() {
                continue;
            }

            let weight = pattern
                .relevance_variable
                .as_ref()
                .map(|var| {
                    solutions
                        .iter()
                        .filter_map(|sol| sol.get(var))
                        .filter_map(|raw| raw.parse::<f32>().ok())
                        .fold(f32::NEG_INFINITY, f32::max)
                })
                .filter(|w| w.is_finite())
                .unwrap_or(1.0);

            score += pattern.priority * weight;
            matched.push(pattern.id.clone());
        }

        ScoredOption {
            option: candidate.clone(),
            score,
            matched_patterns: matched,
        }
    }

    /// Score and rank candidates, best first. Stable for equal scores.
    pub fn rank(
        &self,
        graph: &dyn GraphAdapter,
        candidates: &[CandidateOption],
    ) -> Vec<ScoredOption> {
        let mut scored: Vec<ScoredOption> =
            candidates.iter().map(|c| self.score(graph, c)).collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored
    }
}
