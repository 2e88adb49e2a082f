//! Consultation: relay the situation to an advisor and act on the answer.
//!
//! The most intrusive non-terminal escalation — it interrupts somebody (a
//! human operator or another agent) with a question. Shares the completion
//! service, prompt builder, and response parser seams with prediction; only
//! the framing and the cost differ.

use std::sync::Arc;

use crate::error::CcrsResult;
use crate::llm::CompletionService;
use crate::result::{NoHelp, NoHelpReason, StrategyResult, Suggestion};
use crate::situation::{Situation, SituationKind};

use super::parse::{DefaultResponseParser, ResponseParser};
use super::prediction::situation_context;
use super::prompt::PromptBuilder;
use super::{Applicability, Strategy, StrategyContext};

/// Strategy id.
pub const CONSULTATION_ID: &str = "consultation";

/// Model/advisor-backed consultation strategy.
pub struct ConsultationStrategy {
    service: Arc<dyn CompletionService>,
    prompts: Arc<dyn PromptBuilder>,
    parser: Arc<dyn ResponseParser>,
}

impl ConsultationStrategy {
    /// Create a consultation strategy with the default response parser.
    pub fn new(service: Arc<dyn CompletionService>, prompts: Arc<dyn PromptBuilder>) -> Self {
        Self {
            service,
            prompts,
            parser: Arc::new(DefaultResponseParser::new()),
        }
    }

    /// Swap in a custom response parser.
    pub fn with_parser(mut self, parser: Arc<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    fn question(situation: &Situation) -> String {
        match situation.kind {
            SituationKind::Failure => format!(
                "My action {} on {} keeps failing. What should I do instead?",
                situation.failed_action.as_deref().unwrap_or("(unknown)"),
                situation.target_resource.as_deref().unwrap_or("(unknown)"),
            ),
            SituationKind::Stuck => format!(
                "I am stuck at {} and cannot make progress. Where should I go?",
                situation.current_resource.as_deref().unwrap_or("(unknown)"),
            ),
            SituationKind::Uncertainty => {
                "I cannot decide between the available options. Which one should I take?".into()
            }
            SituationKind::Proactive => "Is there anything I should be doing differently?".into(),
        }
    }
}

impl Strategy for ConsultationStrategy {
    fn id(&self) -> &str {
        CONSULTATION_ID
    }

    fn name(&self) -> &str {
        "Consult an advisor"
    }

    fn category(&self) -> &str {
        "social"
    }

    fn escalation_level(&self) -> u8 {
        4
    }

    fn applies_to(&self, situation: &Situation, _ctx: &StrategyContext<'_>) -> Applicability {
        let kind_fits = matches!(
            situation.kind,
            SituationKind::Failure | SituationKind::Stuck | SituationKind::Uncertainty
        );
        if kind_fits && self.service.is_available() {
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
        let context = situation_context(situation, ctx);
        let question = Self::question(situation);
        let prompt = self.prompts.build_consultation_prompt(&question, &context);

        let raw = match self.service.complete(&prompt) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "consultation failed");
                return Ok(StrategyResult::NoHelp(
                    NoHelp::new(CONSULTATION_ID, NoHelpReason::EvaluationFailed)
                        .with_explanation(e.to_string()),
                ));
            }
        };

        let advice = self.parser.parse(&raw);
        if !advice.valid {
            // Advice without an actionable recommendation is a context
            // problem, not an infrastructure one.
            return Ok(StrategyResult::NoHelp(
                NoHelp::new(CONSULTATION_ID, NoHelpReason::InsufficientContext)
                    .with_explanation("advisor response carried no actionable recommendation"),
            ));
        }
        let Some(action) = advice.action else {
            return Ok(StrategyResult::NoHelp(
                NoHelp::new(CONSULTATION_ID, NoHelpReason::InsufficientContext)
                    .with_explanation("advisor response carried no action"),
            ));
        };

        let mut suggestion = Suggestion::new(CONSULTATION_ID, action)
            .with_confidence(advice.confidence.unwrap_or(0.4))
            .with_cost(0.6)
            .with_rationale(
                advice
                    .explanation
                    .unwrap_or_else(|| "recommended by advisor".into()),
            );
        if let Some(target) = advice.target {
            suggestion = suggestion.with_target(target);
        }
        Ok(StrategyResult::Suggestion(suggestion))
    }
}

impl std::fmt::Debug for ConsultationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsultationStrategy")
            .field("available", &self.service.is_available())
            .finish()
    }
}
