//! Backtrack: return to a prior decision point.
//!
//! Uses the adapter's navigation history to find the most recent visited
//! resource different from where the agent is now. Confidence decays with
//! each backtrack already taken in this situation — if going back twice has
//! not helped, a third hop probably will not either.

use crate::config::BacktrackConfig;
use crate::error::CcrsResult;
use crate::result::{NoHelp, NoHelpReason, StrategyResult, Suggestion};
use crate::situation::{Situation, SituationKind};

use super::{Applicability, Strategy, StrategyContext};

/// Strategy id, also the attempt-bookkeeping key.
pub const BACKTRACK_ID: &str = "backtrack";

/// Built-in backtrack strategy.
#[derive(Debug, Clone)]
pub struct BacktrackStrategy {
    config: BacktrackConfig,
}

impl BacktrackStrategy {
    /// Create a backtrack strategy with the given tuning.
    pub fn new(config: BacktrackConfig) -> Self {
        Self { config }
    }

    /// Prior states worth returning to, most recent first, excluding the
    /// current resource.
    fn fallback_states(&self, situation: &Situation, ctx: &StrategyContext<'_>) -> Vec<String> {
        let current = situation.current_resource.as_deref();
        let mut states = ctx.graph.recent_states(self.config.history_window);
        states.reverse(); // newest first
        states.retain(|s| current != Some(s.as_str()));
        states.dedup();
        states
    }
}

impl Strategy for BacktrackStrategy {
    fn id(&self) -> &str {
        BACKTRACK_ID
    }

    fn name(&self) -> &str {
        "Backtrack to prior decision point"
    }

    fn category(&self) -> &str {
        "navigation"
    }

    fn escalation_level(&self) -> u8 {
        2
    }

    fn applies_to(&self, situation: &Situation, ctx: &StrategyContext<'_>) -> Applicability {
        let kind_fits = matches!(situation.kind, SituationKind::Failure | SituationKind::Stuck);
        if kind_fits
            && situation.attempt_count(BACKTRACK_ID) < self.config.max_attempts
            && !self.fallback_states(situation, ctx).is_empty()
        {
            Applicability::Applicable
        } else {
            Applicability::NotApplicable
        }
    }

    fn evaluate(
        &self,
        situation: &Situation,
        ctx: &StrategyContext<'_>,
    ) -> CcrsResult<StrategyResult> {
        let attempts = situation.attempt_count(BACKTRACK_ID);
        if attempts >= self.config.max_attempts {
            return Ok(StrategyResult::NoHelp(
                NoHelp::new(BACKTRACK_ID, NoHelpReason::AlreadyAttempted).with_explanation(
                    format!("{attempts} of {} backtracks used", self.config.max_attempts),
                ),
            ));
        }

        let states = self.fallback_states(situation, ctx);
        let Some(destination) = states.first() else {
            return Ok(StrategyResult::NoHelp(
                NoHelp::new(BACKTRACK_ID, NoHelpReason::PreconditionMissing)
                    .with_explanation("no prior decision point in navigation history"),
            ));
        };

        let confidence = 0.6 * 0.7f32.powi(attempts as i32);
        let mut suggestion = Suggestion::new(BACKTRACK_ID, "navigate")
            .with_target(destination)
            .with_param("attempt_number", attempts + 1)
            .with_confidence(confidence)
            .with_cost(0.3)
            .with_rationale(format!(
                "returning to the most recent prior decision point {destination}"
            ));
        for earlier in states.iter().skip(1).take(3) {
            suggestion = suggestion.with_guidance(format!("further fallback: {earlier}"));
        }

        Ok(StrategyResult::Suggestion(suggestion))
    }
}
