//! Strategy registry and escalation pipeline.
//!
//! Strategies register once at startup; evaluation is a pure function of
//! the situation and context. The pipeline walks escalation levels from the
//! least intrusive upward, collects suggestions within a level, and ranks
//! them by score. The terminal level runs last and — with the stop strategy
//! registered — guarantees the pipeline always answers.

use std::collections::BTreeMap;

use crate::config::RecoveryConfig;
use crate::error::{CcrsResult, StrategyError};
use crate::llm::CompletionService;
use crate::result::{NoHelp, NoHelpReason, StrategyResult};
use crate::situation::Situation;

use super::prompt::{DefaultPromptBuilder, PromptBuilder};
use super::{
    Applicability, BacktrackStrategy, ConsultationStrategy, PredictionStrategy, RetryStrategy,
    StopStrategy, Strategy, StrategyContext, TERMINAL_LEVEL,
};

/// Diagnostic record of one full pipeline run.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// The selected result (a suggestion, or the terminal decline).
    pub result: StrategyResult,
    /// Level the winning suggestion came from, if any.
    pub winning_level: Option<u8>,
    /// Escalation levels that were evaluated, in order.
    pub levels_tried: Vec<u8>,
    /// Declines collected along the way, in evaluation order.
    pub declined: Vec<NoHelp>,
}

/// Registry of recovery strategies with the escalation pipeline.
pub struct StrategyRegistry {
    /// Registration order is preserved and breaks ranking ties.
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Registry with the built-in strategies (retry, backtrack, stop).
    pub fn with_builtins(config: &RecoveryConfig) -> CcrsResult<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(RetryStrategy::new(config.retry.clone())))?;
        registry.register(Box::new(BacktrackStrategy::new(config.backtrack.clone())))?;
        registry.register(Box::new(StopStrategy::new()))?;
        Ok(registry)
    }

    /// Add the model-assisted strategies on top, if the service is up.
    ///
    /// When the completion service is unavailable the registry stays as it
    /// is — the pipeline degrades to built-ins and logs a warning rather
    /// than failing to start.
    pub fn with_model_strategies(
        mut self,
        service: std::sync::Arc<dyn CompletionService>,
    ) -> CcrsResult<Self> {
        if !service.is_available() {
            tracing::warn!("completion service unavailable; running with built-in strategies only");
            return Ok(self);
        }
        let prompts: std::sync::Arc<dyn PromptBuilder> =
            std::sync::Arc::new(DefaultPromptBuilder::new());
        self.register(Box::new(PredictionStrategy::new(
            service.clone(),
            prompts.clone(),
        )))?;
        self.register(Box::new(ConsultationStrategy::new(service, prompts)))?;
        Ok(self)
    }

    /// Register a strategy. Duplicate ids are a configuration error.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) -> CcrsResult<()> {
        if self.strategies.iter().any(|s| s.id() == strategy.id()) {
            return Err(StrategyError::DuplicateId {
                id: strategy.id().to_string(),
            }
            .into());
        }
        tracing::debug!(
            id = strategy.id(),
            level = strategy.escalation_level(),
            "registered strategy"
        );
        self.strategies.push(strategy);
        Ok(())
    }

    /// Ids of all registered strategies, in registration order.
    pub fn strategy_ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run the escalation pipeline and return the selected result.
    pub fn evaluate(
        &self,
        situation: &Situation,
        ctx: &StrategyContext<'_>,
    ) -> CcrsResult<StrategyResult> {
        self.evaluate_detailed(situation, ctx).map(|e| e.result)
    }

    /// Run the escalation pipeline, keeping the per-strategy diagnostics.
    pub fn evaluate_detailed(
        &self,
        situation: &Situation,
        ctx: &StrategyContext<'_>,
    ) -> CcrsResult<Evaluation> {
        // Candidate selection: applicability is cheap and pure.
        let applicable: Vec<(usize, &dyn Strategy)> = self
            .strategies
            .iter()
            .enumerate()
            .filter(|(_, s)| s.applies_to(situation, ctx) == Applicability::Applicable)
            .map(|(i, s)| (i, s.as_ref()))
            .collect();

        // Group by level: positive levels ascend, the terminal level last.
        let mut levels: BTreeMap<(bool, u8), Vec<(usize, &dyn Strategy)>> = BTreeMap::new();
        for (order, strategy) in applicable {
            let level = strategy.escalation_level();
            levels
                .entry((level == TERMINAL_LEVEL, level))
                .or_default()
                .push((order, strategy));
        }

        let mut declined = Vec::new();
        let mut levels_tried = Vec::new();

        for ((_, level), strategies) in &levels {
            levels_tried.push(*level);
            let mut suggestions = Vec::new();

            for (order, strategy) in strategies {
                let result = match strategy.evaluate(situation, ctx) {
                    Ok(result) => result,
                    Err(e) => {
                        // One faulty strategy must not abort the escalation.
                        tracing::warn!(
                            id = strategy.id(),
                            error = %e,
                            "strategy evaluation failed"
                        );
                        StrategyResult::NoHelp(
                            NoHelp::new(strategy.id(), NoHelpReason::EvaluationFailed)
                                .with_explanation(e.to_string()),
                        )
                    }
                };
                match result {
                    StrategyResult::Suggestion(s) => suggestions.push((*order, s)),
                    StrategyResult::NoHelp(n) => declined.push(n),
                }
            }

            if let Some(best) = pick_best(suggestions) {
                tracing::debug!(
                    strategy = %best.strategy_id,
                    level,
                    score = best.score(),
                    "selected suggestion"
                );
                return Ok(Evaluation {
                    result: StrategyResult::Suggestion(best),
                    winning_level: Some(*level),
                    levels_tried,
                    declined,
                });
            }
        }

        // Nothing suggested anywhere. With a terminal strategy registered
        // this cannot happen (stop always suggests); without one, answer
        // explicitly rather than silently.
        if declined.is_empty() && levels_tried.is_empty() {
            return Err(StrategyError::Exhausted.into());
        }
        let Some(last) = declined.last().cloned() else {
            return Err(StrategyError::Exhausted.into());
        };
        Ok(Evaluation {
            result: StrategyResult::NoHelp(last),
            winning_level: None,
            levels_tried,
            declined,
        })
    }
}

/// Highest score wins; ties fall to lower cost, then registration order.
fn pick_best(
    mut suggestions: Vec<(usize, crate::result::Suggestion)>,
) -> Option<crate::result::Suggestion> {
    suggestions.sort_by(|(oa, a), (ob, b)| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.estimated_cost
                    .partial_cmp(&b.estimated_cost)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(oa.cmp(ob))
    });
    suggestions.into_iter().next().map(|(_, s)| s)
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.strategy_ids())
            .finish()
    }
}
