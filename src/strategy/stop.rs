//! Stop: the terminal fallback.
//!
//! Unconditionally applicable and always produces a graceful-abandonment
//! suggestion, which is what makes the escalation pipeline total: whatever
//! the situation, the agent gets an answer, even if the answer is "give
//! this one up and mark the dead end".

use crate::error::CcrsResult;
use crate::result::{StrategyResult, Suggestion};
use crate::situation::{Situation, SituationKind};

use super::{Applicability, Strategy, StrategyContext, TERMINAL_LEVEL};

/// Strategy id.
pub const STOP_ID: &str = "stop";

/// Built-in terminal stop strategy.
#[derive(Debug, Clone, Default)]
pub struct StopStrategy;

impl StopStrategy {
    /// Create the stop strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for StopStrategy {
    fn id(&self) -> &str {
        STOP_ID
    }

    fn name(&self) -> &str {
        "Abandon gracefully"
    }

    fn category(&self) -> &str {
        "terminal"
    }

    fn escalation_level(&self) -> u8 {
        TERMINAL_LEVEL
    }

    fn applies_to(&self, _situation: &Situation, _ctx: &StrategyContext<'_>) -> Applicability {
        Applicability::Applicable
    }

    fn evaluate(
        &self,
        situation: &Situation,
        _ctx: &StrategyContext<'_>,
    ) -> CcrsResult<StrategyResult> {
        let subject = match situation.kind {
            SituationKind::Failure => situation
                .failed_action
                .as_deref()
                .map(|a| format!("action {a}"))
                .unwrap_or_else(|| "the failed action".into()),
            SituationKind::Stuck => "the blocked exploration branch".into(),
            SituationKind::Uncertainty => "the undecidable option".into(),
            SituationKind::Proactive => "the current pursuit".into(),
        };
        let attempts = situation.attempted_strategies.len();

        let mut suggestion = Suggestion::new(STOP_ID, "abandon")
            .with_confidence(1.0)
            .with_cost(0.9)
            .with_rationale(format!(
                "no recovery left for {subject} after {attempts} attempt(s); abandoning"
            ))
            .with_guidance("mark this dead end in the knowledge graph for other agents");
        if let Some(target) = situation.target_resource.as_deref() {
            suggestion = suggestion.with_target(target);
        }

        Ok(StrategyResult::Suggestion(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryGraph;

    #[test]
    fn applicable_to_every_situation_kind() {
        let g = MemoryGraph::new();
        let ctx = StrategyContext::new(&g);
        let strategy = StopStrategy::new();
        for kind in [
            SituationKind::Failure,
            SituationKind::Stuck,
            SituationKind::Uncertainty,
            SituationKind::Proactive,
        ] {
            let s = Situation::builder(kind).build();
            assert_eq!(strategy.applies_to(&s, &ctx), Applicability::Applicable);
        }
    }

    #[test]
    fn always_suggests_abandonment() {
        let g = MemoryGraph::new();
        let ctx = StrategyContext::new(&g);
        let strategy = StopStrategy::new();
        let situation = Situation::builder(SituationKind::Failure)
            .failed_action("POST")
            .target_resource("http://x/door/3")
            .attempted("retry:3")
            .attempted("backtrack:2")
            .build();

        let result = strategy.evaluate(&situation, &ctx).unwrap();
        let s = result.as_suggestion().expect("stop always suggests");
        assert_eq!(s.action_type, "abandon");
        assert_eq!(s.action_target.as_deref(), Some("http://x/door/3"));
        assert_eq!(s.confidence, 1.0);
        assert!(s.rationale.as_deref().unwrap().contains("POST"));
        assert!(!s.opportunistic_guidance.is_empty());
    }

    #[test]
    fn lives_at_the_terminal_level() {
        assert_eq!(StopStrategy::new().escalation_level(), TERMINAL_LEVEL);
    }
}
