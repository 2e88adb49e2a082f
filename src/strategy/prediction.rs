//! Prediction: ask a completion model what to try next.
//!
//! Pluggable — only registered when a completion service is available. The
//! strategy assembles a bounded context (situation fields plus a small
//! graph neighborhood), asks for a structured recommendation, and parses
//! the response defensively. Transport errors and timeouts degrade to a
//! decline; they never stall the pipeline.

use std::sync::Arc;

use crate::error::CcrsResult;
use crate::llm::CompletionService;
use crate::result::{NoHelp, NoHelpReason, StrategyResult, Suggestion};
use crate::situation::{Situation, SituationKind};

use super::parse::{DefaultResponseParser, ResponseParser};
use super::prompt::{ContextMap, PromptBuilder};
use super::{Applicability, Strategy, StrategyContext};

/// Strategy id.
pub const PREDICTION_ID: &str = "prediction";

/// How many neighborhood triples to show the model.
const NEIGHBORHOOD_BOUND: usize = 5;

/// Model-assisted prediction strategy.
pub struct PredictionStrategy {
    service: Arc<dyn CompletionService>,
    prompts: Arc<dyn PromptBuilder>,
    parser: Arc<dyn ResponseParser>,
}

impl PredictionStrategy {
    /// Create a prediction strategy with the default response parser.
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
}

/// Assemble the flat context map shared by the model-assisted strategies.
pub(crate) fn situation_context(situation: &Situation, ctx: &StrategyContext<'_>) -> ContextMap {
    let mut map = ContextMap::new();
    map.insert(
        "kind".into(),
        format!("{:?}", situation.kind).to_lowercase(),
    );
    if let Some(v) = &situation.trigger {
        map.insert("trigger".into(), v.clone());
    }
    if let Some(v) = &situation.current_resource {
        map.insert("current_resource".into(), v.clone());

        let neighborhood = ctx
            .graph
            .neighborhood(v, NEIGHBORHOOD_BOUND, NEIGHBORHOOD_BOUND);
        if !neighborhood.is_empty() {
            let links: Vec<String> = neighborhood
                .outgoing
                .iter()
                .map(|t| format!("{} -> {}", t.predicate, t.object))
                .collect();
            map.insert("outgoing_links".into(), links.join("; "));
        }
    }
    if let Some(v) = &situation.target_resource {
        map.insert("target_resource".into(), v.clone());
    }
    if let Some(v) = &situation.failed_action {
        map.insert("failed_action".into(), v.clone());
    }
    if let Some(status) = situation.http_status() {
        map.insert("http_status".into(), status.to_string());
    }
    if let Some(message) = situation.message() {
        map.insert("error_message".into(), message.to_string());
    }
    if !situation.attempted_strategies.is_empty() {
        map.insert(
            "attempted".into(),
            situation.attempted_strategies.join(", "),
        );
    }
    map
}

impl Strategy for PredictionStrategy {
    fn id(&self) -> &str {
        PREDICTION_ID
    }

    fn name(&self) -> &str {
        "Model-assisted prediction"
    }

    fn category(&self) -> &str {
        "model"
    }

    fn escalation_level(&self) -> u8 {
        3
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
        let prompt = self.prompts.build_prediction_prompt(&context);

        let raw = match self.service.complete(&prompt) {
            Ok(raw) => raw,
            Err(e) => {
                // Timeouts and transport errors degrade, never propagate.
                tracing::warn!(error = %e, "prediction completion failed");
                return Ok(StrategyResult::NoHelp(
                    NoHelp::new(PREDICTION_ID, NoHelpReason::EvaluationFailed)
                        .with_explanation(e.to_string()),
                ));
            }
        };

        let advice = self.parser.parse(&raw);
        if !advice.valid {
            return Ok(StrategyResult::NoHelp(
                NoHelp::new(PREDICTION_ID, NoHelpReason::EvaluationFailed)
                    .with_explanation("model response was not parseable"),
            ));
        }
        let Some(action) = advice.action else {
            return Ok(StrategyResult::NoHelp(
                NoHelp::new(PREDICTION_ID, NoHelpReason::InsufficientContext)
                    .with_explanation("model response carried no action"),
            ));
        };

        let mut suggestion = Suggestion::new(PREDICTION_ID, action)
            .with_confidence(advice.confidence.unwrap_or(0.5))
            .with_cost(0.4);
        if let Some(target) = advice.target {
            suggestion = suggestion.with_target(target);
        }
        if let Some(explanation) = advice.explanation {
            suggestion = suggestion.with_rationale(explanation);
        }
        Ok(StrategyResult::Suggestion(suggestion))
    }
}

impl std::fmt::Debug for PredictionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionStrategy")
            .field("available", &self.service.is_available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::graph::Triple;
    use crate::graph::memory::MemoryGraph;
    use crate::strategy::prompt::DefaultPromptBuilder;

    /// Completion stub with a canned response.
    struct Canned {
        response: Result<String, LlmError>,
        available: bool,
    }

    impl CompletionService for Canned {
        fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            match &self.response {
                Ok(s) => Ok(s.clone()),
                Err(_) => Err(LlmError::RequestFailed {
                    message: "canned failure".into(),
                }),
            }
        }
        fn is_available(&self) -> bool {
            self.available
        }
    }

    fn strategy(response: Result<String, LlmError>, available: bool) -> PredictionStrategy {
        PredictionStrategy::new(
            Arc::new(Canned {
                response,
                available,
            }),
            Arc::new(DefaultPromptBuilder::new()),
        )
    }

    fn stuck() -> Situation {
        Situation::builder(SituationKind::Stuck)
            .current_resource("http://x/room/9")
            .build()
    }

    #[test]
    fn unavailable_service_means_not_applicable() {
        let g = MemoryGraph::new();
        let ctx = StrategyContext::new(&g);
        let s = strategy(Ok("{}".into()), false);
        assert_eq!(s.applies_to(&stuck(), &ctx), Applicability::NotApplicable);
    }

    #[test]
    fn structured_response_becomes_suggestion() {
        let g = MemoryGraph::new();
        let ctx = StrategyContext::new(&g);
        let s = strategy(
            Ok(r#"{"action":"navigate","target":"http://x/y","reasoning":"closer to exit","confidence":0.65}"#.into()),
            true,
        );
        let result = s.evaluate(&stuck(), &ctx).unwrap();
        let sug = result.as_suggestion().unwrap();
        assert_eq!(sug.action_type, "navigate");
        assert_eq!(sug.action_target.as_deref(), Some("http://x/y"));
        assert!((sug.confidence - 0.65).abs() < 1e-6);
        assert!((sug.estimated_cost - 0.4).abs() < 1e-6);
    }

    #[test]
    fn transport_error_degrades_to_evaluation_failed() {
        let g = MemoryGraph::new();
        let ctx = StrategyContext::new(&g);
        let s = strategy(
            Err(LlmError::RequestFailed {
                message: "boom".into(),
            }),
            true,
        );
        let result = s.evaluate(&stuck(), &ctx).unwrap();
        assert_eq!(
            result.as_no_help().unwrap().reason,
            NoHelpReason::EvaluationFailed
        );
    }

    #[test]
    fn unparseable_response_declines_without_guessing() {
        let g = MemoryGraph::new();
        let ctx = StrategyContext::new(&g);
        let s = strategy(Ok("The weather is lovely.".into()), true);
        let result = s.evaluate(&stuck(), &ctx).unwrap();
        assert_eq!(
            result.as_no_help().unwrap().reason,
            NoHelpReason::EvaluationFailed
        );
    }

    #[test]
    fn context_map_includes_neighborhood() {
        let g = MemoryGraph::new();
        g.insert(&Triple::new("http://x/room/9", "http://x/door", "http://x/room/10"));
        let ctx = StrategyContext::new(&g);
        let map = situation_context(&stuck(), &ctx);
        assert_eq!(map["kind"], "stuck");
        assert!(map["outgoing_links"].contains("http://x/room/10"));
    }
}
