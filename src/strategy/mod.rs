//! Recovery strategies: the capability contract and its implementations.
//!
//! A strategy is a closed capability interface with an open registry of
//! implementations. The pipeline depends only on the [`Strategy`] trait;
//! built-ins (retry, backtrack, stop) and pluggable model-assisted
//! strategies (prediction, consultation) all register the same way.
//!
//! Everything a strategy reads arrives explicitly: the immutable
//! [`Situation`](crate::situation::Situation) and the [`StrategyContext`]
//! carrying the knowledge-graph adapter and the compiled vocabulary. No
//! ambient or thread-local state.

pub mod backtrack;
pub mod consultation;
pub mod parse;
pub mod prediction;
pub mod prompt;
pub mod registry;
pub mod retry;
pub mod stop;

use crate::error::CcrsResult;
use crate::graph::GraphAdapter;
use crate::result::StrategyResult;
use crate::situation::Situation;
use crate::vocab::PatternVocabulary;

pub use backtrack::BacktrackStrategy;
pub use consultation::ConsultationStrategy;
pub use prediction::PredictionStrategy;
pub use registry::StrategyRegistry;
pub use retry::RetryStrategy;
pub use stop::StopStrategy;

/// The terminal escalation level: tried only after every positive level.
pub const TERMINAL_LEVEL: u8 = 0;

/// Whether a strategy applies to a situation at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    Applicable,
    NotApplicable,
}

/// Read-only context handed to every strategy call.
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    /// The agent's knowledge graph.
    pub graph: &'a dyn GraphAdapter,
    /// The compiled pattern vocabulary, when one is loaded.
    pub vocabulary: Option<&'a PatternVocabulary>,
}

impl<'a> StrategyContext<'a> {
    /// Context over a graph adapter, without a vocabulary.
    pub fn new(graph: &'a dyn GraphAdapter) -> Self {
        Self {
            graph,
            vocabulary: None,
        }
    }

    /// Attach a compiled vocabulary.
    pub fn with_vocabulary(mut self, vocabulary: &'a PatternVocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }
}

impl std::fmt::Debug for StrategyContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyContext")
            .field("vocabulary", &self.vocabulary.is_some())
            .finish()
    }
}

/// A recovery strategy the pipeline can evaluate.
///
/// `applies_to` must be pure: same situation and context, same answer.
/// `evaluate` returns a [`StrategyResult`]; an `Err` is treated by the
/// pipeline as an evaluation failure and converted to
/// `NoHelp(EvaluationFailed)` — one faulty strategy never aborts the
/// escalation.
pub trait Strategy: Send + Sync {
    /// Unique identifier, also used for attempt bookkeeping.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Coarse grouping (e.g. `local`, `navigation`, `model`, `terminal`).
    fn category(&self) -> &str;

    /// Escalation level: positive levels are tried ascending;
    /// [`TERMINAL_LEVEL`] is tried last.
    fn escalation_level(&self) -> u8;

    /// Whether this strategy can say anything about the situation.
    fn applies_to(&self, situation: &Situation, ctx: &StrategyContext<'_>) -> Applicability;

    /// Produce a suggestion or an explicit decline.
    fn evaluate(
        &self,
        situation: &Situation,
        ctx: &StrategyContext<'_>,
    ) -> CcrsResult<StrategyResult>;
}
