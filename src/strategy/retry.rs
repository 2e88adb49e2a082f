//! Retry: the cheapest recovery — try the failed action again.
//!
//! Only transient failures are worth retrying; the retriable set is
//! configured and defaults to the usual transient HTTP statuses and
//! transport error classes. Exponential backoff, decaying confidence, and
//! a hard attempt cap keep the agent from hammering a dead endpoint.

use crate::config::RetryConfig;
use crate::error::CcrsResult;
use crate::result::{NoHelp, NoHelpReason, StrategyResult, Suggestion};
use crate::situation::{Situation, SituationKind};

use super::{Applicability, Strategy, StrategyContext};

/// Strategy id, also the attempt-bookkeeping key.
pub const RETRY_ID: &str = "retry";

/// Built-in retry strategy.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
}

impl RetryStrategy {
    /// Create a retry strategy with the given tuning.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Base confidence by HTTP status: 503 is usually momentary, 500 is
    /// anyone's guess.
    fn base_confidence(status: Option<u16>) -> f32 {
        match status {
            Some(503) => 0.8,
            Some(500) => 0.5,
            _ => 0.7,
        }
    }
}

impl Strategy for RetryStrategy {
    fn id(&self) -> &str {
        RETRY_ID
    }

    fn name(&self) -> &str {
        "Retry failed action"
    }

    fn category(&self) -> &str {
        "local"
    }

    fn escalation_level(&self) -> u8 {
        1
    }

    fn applies_to(&self, situation: &Situation, _ctx: &StrategyContext<'_>) -> Applicability {
        let retriable = situation.kind == SituationKind::Failure
            && situation.failed_action.is_some()
            && situation.target_resource.is_some()
            && self
                .config
                .is_retriable(situation.http_status(), situation.error_type())
            && situation.attempt_count(RETRY_ID) < self.config.max_attempts;
        if retriable {
            Applicability::Applicable
        } else {
            Applicability::NotApplicable
        }
    }

    fn evaluate(
        &self,
        situation: &Situation,
        _ctx: &StrategyContext<'_>,
    ) -> CcrsResult<StrategyResult> {
        let attempts = situation.attempt_count(RETRY_ID);
        if attempts >= self.config.max_attempts {
            // Race between applicability and a cap change.
            return Ok(StrategyResult::NoHelp(
                NoHelp::new(RETRY_ID, NoHelpReason::AlreadyAttempted).with_explanation(format!(
                    "{attempts} of {} attempts used",
                    self.config.max_attempts
                )),
            ));
        }

        let Some(action) = situation.failed_action.as_deref() else {
            return Ok(StrategyResult::NoHelp(
                NoHelp::new(RETRY_ID, NoHelpReason::PreconditionMissing)
                    .with_explanation("no failed action recorded"),
            ));
        };
        let Some(target) = situation.target_resource.as_deref() else {
            return Ok(StrategyResult::NoHelp(
                NoHelp::new(RETRY_ID, NoHelpReason::PreconditionMissing)
                    .with_explanation("no target resource recorded"),
            ));
        };

        let delay_ms = (self.config.initial_delay_ms as f64
            * f64::from(self.config.backoff_multiplier).powi(attempts as i32))
            as u64;
        let confidence =
            Self::base_confidence(situation.http_status()) * 0.8f32.powi(attempts as i32);

        let suggestion = Suggestion::new(RETRY_ID, "retry")
            .with_target(target)
            .with_param("original_action", action)
            .with_param("delay_ms", delay_ms)
            .with_param("attempt_number", attempts + 1)
            .with_param("max_attempts", self.config.max_attempts)
            .with_confidence(confidence)
            .with_cost(0.1)
            .with_rationale(format!(
                "transient error ({}); retry {} of {} after {delay_ms}ms",
                situation
                    .http_status()
                    .map(|s| s.to_string())
                    .or_else(|| situation.error_type().map(str::to_string))
                    .unwrap_or_else(|| "unknown".into()),
                attempts + 1,
                self.config.max_attempts
            ));

        Ok(StrategyResult::Suggestion(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryGraph;
    use crate::situation::KEY_HTTP_STATUS;

    fn failure_503() -> Situation {
        Situation::builder(SituationKind::Failure)
            .failed_action("GET")
            .target_resource("http://x/door/3")
            .error_info(KEY_HTTP_STATUS, 503)
            .build()
    }

    fn ctx_graph() -> MemoryGraph {
        MemoryGraph::new()
    }

    #[test]
    fn fresh_503_failure_suggests_retry() {
        let g = ctx_graph();
        let ctx = StrategyContext::new(&g);
        let strategy = RetryStrategy::new(RetryConfig::default());
        let situation = failure_503();

        assert_eq!(strategy.applies_to(&situation, &ctx), Applicability::Applicable);
        let result = strategy.evaluate(&situation, &ctx).unwrap();
        let s = result.as_suggestion().expect("should suggest");
        assert_eq!(s.action_type, "retry");
        assert!((s.confidence - 0.8).abs() < 1e-6);
        assert!((s.estimated_cost - 0.1).abs() < 1e-6);
        assert_eq!(s.action_params["delay_ms"], 1000);
        assert_eq!(s.action_params["attempt_number"], 1);
        assert_eq!(s.action_params["original_action"], "GET");
    }

    #[test]
    fn exhausted_attempts_report_already_attempted() {
        let g = ctx_graph();
        let ctx = StrategyContext::new(&g);
        let strategy = RetryStrategy::new(RetryConfig::default());
        let mut situation = failure_503();
        situation.attempted_strategies = vec!["retry:3".into()];

        assert_eq!(
            strategy.applies_to(&situation, &ctx),
            Applicability::NotApplicable
        );
        let result = strategy.evaluate(&situation, &ctx).unwrap();
        assert_eq!(
            result.as_no_help().unwrap().reason,
            NoHelpReason::AlreadyAttempted
        );
    }

    #[test]
    fn backoff_is_strictly_increasing() {
        let g = ctx_graph();
        let ctx = StrategyContext::new(&g);
        let strategy = RetryStrategy::new(RetryConfig::default());

        let mut delays = Vec::new();
        for n in 0..3 {
            let mut situation = failure_503();
            if n > 0 {
                situation.attempted_strategies = vec![format!("retry:{n}")];
            }
            let result = strategy.evaluate(&situation, &ctx).unwrap();
            let s = result.as_suggestion().unwrap();
            delays.push(s.action_params["delay_ms"].as_u64().unwrap());
        }
        assert_eq!(delays, vec![1000, 2000, 4000]);
        assert!(delays.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn confidence_is_non_increasing_in_attempts() {
        let g = ctx_graph();
        let ctx = StrategyContext::new(&g);
        let strategy = RetryStrategy::new(RetryConfig::default());

        let mut confidences = Vec::new();
        for n in 0..3 {
            let mut situation = failure_503();
            if n > 0 {
                situation.attempted_strategies = vec![format!("retry:{n}")];
            }
            let result = strategy.evaluate(&situation, &ctx).unwrap();
            confidences.push(result.as_suggestion().unwrap().confidence);
        }
        assert!(confidences.windows(2).all(|w| w[1] <= w[0]));
        // 0.8, then 0.8 * 0.8, then 0.8 * 0.64.
        assert!((confidences[1] - 0.64).abs() < 1e-6);
    }

    #[test]
    fn base_confidence_by_status() {
        assert_eq!(RetryStrategy::base_confidence(Some(503)), 0.8);
        assert_eq!(RetryStrategy::base_confidence(Some(500)), 0.5);
        assert_eq!(RetryStrategy::base_confidence(Some(502)), 0.7);
        assert_eq!(RetryStrategy::base_confidence(None), 0.7);
    }

    #[test]
    fn non_retriable_status_is_not_applicable() {
        let g = ctx_graph();
        let ctx = StrategyContext::new(&g);
        let strategy = RetryStrategy::new(RetryConfig::default());
        let situation = Situation::builder(SituationKind::Failure)
            .failed_action("GET")
            .target_resource("http://x/door/3")
            .error_info(KEY_HTTP_STATUS, 404)
            .build();
        assert_eq!(
            strategy.applies_to(&situation, &ctx),
            Applicability::NotApplicable
        );
    }

    #[test]
    fn retriable_error_type_without_status_applies() {
        let g = ctx_graph();
        let ctx = StrategyContext::new(&g);
        let strategy = RetryStrategy::new(RetryConfig::default());
        let situation = Situation::builder(SituationKind::Failure)
            .failed_action("GET")
            .target_resource("http://x/door/3")
            .error_info(crate::situation::KEY_ERROR_TYPE, "timeout")
            .build();
        assert_eq!(strategy.applies_to(&situation, &ctx), Applicability::Applicable);
    }

    #[test]
    fn stuck_situations_are_not_retried() {
        let g = ctx_graph();
        let ctx = StrategyContext::new(&g);
        let strategy = RetryStrategy::new(RetryConfig::default());
        let situation = Situation::builder(SituationKind::Stuck)
            .failed_action("GET")
            .target_resource("http://x/door/3")
            .error_info(KEY_HTTP_STATUS, 503)
            .build();
        assert_eq!(
            strategy.applies_to(&situation, &ctx),
            Applicability::NotApplicable
        );
    }
}
