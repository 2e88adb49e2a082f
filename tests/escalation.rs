//! Escalation scenarios: a failing exploration walked through the full
//! strategy ladder, the way the navigation loop would drive it.
//!
//! The caller owns the attempt bookkeeping: after acting on a suggestion it
//! appends `"<strategy-id>:<n>"` to the next situation. The registry itself
//! holds no state between calls.

use std::sync::Arc;

use ccrs::config::RecoveryConfig;
use ccrs::error::LlmError;
use ccrs::graph::memory::MemoryGraph;
use ccrs::llm::CompletionService;
use ccrs::result::{NoHelpReason, StrategyResult};
use ccrs::situation::{KEY_HTTP_STATUS, Situation, SituationKind};
use ccrs::strategy::StrategyContext;
use ccrs::strategy::registry::StrategyRegistry;

fn world_with_history() -> MemoryGraph {
    let g = MemoryGraph::new();
    g.record_visit("http://maze/entry");
    g.record_visit("http://maze/hall");
    g.record_visit("http://maze/room/9");
    g
}

fn failing_get(attempted: &[&str]) -> Situation {
    let mut builder = Situation::builder(SituationKind::Failure)
        .current_resource("http://maze/room/9")
        .target_resource("http://maze/door/1")
        .failed_action("GET")
        .error_info(KEY_HTTP_STATUS, 503);
    for entry in attempted {
        builder = builder.attempted(*entry);
    }
    builder.build()
}

#[test]
fn failure_walks_retry_then_backtrack_then_stop() {
    let graph = world_with_history();
    let ctx = StrategyContext::new(&graph);
    let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default()).unwrap();

    // Fresh failure: retry, with the documented backoff parameters.
    let result = registry.evaluate(&failing_get(&[]), &ctx).unwrap();
    let s = result.as_suggestion().unwrap();
    assert_eq!(s.strategy_id, "retry");
    assert_eq!(s.action_params["attempt_number"], 1);

    // Retries exhausted: the pipeline escalates to backtracking.
    let result = registry.evaluate(&failing_get(&["retry:3"]), &ctx).unwrap();
    let s = result.as_suggestion().unwrap();
    assert_eq!(s.strategy_id, "backtrack");
    assert_eq!(s.action_target.as_deref(), Some("http://maze/hall"));

    // Backtracks exhausted too: only graceful abandonment is left.
    let result = registry
        .evaluate(&failing_get(&["retry:3", "backtrack:2"]), &ctx)
        .unwrap();
    let s = result.as_suggestion().unwrap();
    assert_eq!(s.strategy_id, "stop");
    assert_eq!(s.action_type, "abandon");
}

#[test]
fn delays_and_confidence_follow_the_retry_schedule() {
    let graph = world_with_history();
    let ctx = StrategyContext::new(&graph);
    let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default()).unwrap();

    let first = registry.evaluate(&failing_get(&[]), &ctx).unwrap();
    let second = registry.evaluate(&failing_get(&["retry:1"]), &ctx).unwrap();
    let third = registry
        .evaluate(&failing_get(&["retry:2"]), &ctx)
        .unwrap();

    let delays: Vec<u64> = [&first, &second, &third]
        .iter()
        .map(|r| r.as_suggestion().unwrap().action_params["delay_ms"].as_u64().unwrap())
        .collect();
    assert_eq!(delays, vec![1000, 2000, 4000]);

    let confidences: Vec<f32> = [&first, &second, &third]
        .iter()
        .map(|r| r.as_suggestion().unwrap().confidence)
        .collect();
    assert!(confidences.windows(2).all(|w| w[1] < w[0]));
}

#[test]
fn stuck_without_history_goes_straight_to_stop() {
    let graph = MemoryGraph::new();
    let ctx = StrategyContext::new(&graph);
    let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default()).unwrap();

    let situation = Situation::builder(SituationKind::Stuck)
        .current_resource("http://maze/room/9")
        .build();
    let result = registry.evaluate(&situation, &ctx).unwrap();
    assert_eq!(result.as_suggestion().unwrap().strategy_id, "stop");
}

#[test]
fn declines_are_reported_alongside_the_selection() {
    let graph = world_with_history();
    let ctx = StrategyContext::new(&graph);
    let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default()).unwrap();

    let eval = registry
        .evaluate_detailed(&failing_get(&["retry:3", "backtrack:2"]), &ctx)
        .unwrap();
    assert_eq!(eval.result.as_suggestion().unwrap().strategy_id, "stop");
    // Retry and backtrack were filtered by applicability, not evaluated,
    // so the only level tried is the terminal one.
    assert_eq!(eval.levels_tried, vec![0]);
    assert_eq!(eval.winning_level, Some(0));
}

/// Completion stub for model-strategy registration tests.
struct Scripted {
    response: &'static str,
    available: bool,
}

impl CompletionService for Scripted {
    fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok(self.response.to_string())
    }
    fn is_available(&self) -> bool {
        self.available
    }
}

#[test]
fn model_strategies_slot_between_backtrack_and_stop() {
    let graph = MemoryGraph::new(); // no history: backtrack never applies
    let ctx = StrategyContext::new(&graph);

    let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default())
        .unwrap()
        .with_model_strategies(Arc::new(Scripted {
            response: r#"{"action":"navigate","target":"http://maze/side","reasoning":"side path open","confidence":0.7}"#,
            available: true,
        }))
        .unwrap();
    assert_eq!(registry.len(), 5);

    let result = registry
        .evaluate(&failing_get(&["retry:3"]), &ctx)
        .unwrap();
    let s = result.as_suggestion().unwrap();
    assert_eq!(s.strategy_id, "prediction");
    assert_eq!(s.action_target.as_deref(), Some("http://maze/side"));
}

#[test]
fn unavailable_model_service_degrades_to_builtins() {
    let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default())
        .unwrap()
        .with_model_strategies(Arc::new(Scripted {
            response: "",
            available: false,
        }))
        .unwrap();
    // Registration is skipped entirely; the pipeline still starts.
    assert_eq!(registry.len(), 3);
}

#[test]
fn unparseable_model_output_falls_through_to_stop() {
    let graph = MemoryGraph::new();
    let ctx = StrategyContext::new(&graph);
    let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default())
        .unwrap()
        .with_model_strategies(Arc::new(Scripted {
            response: "Hmm, that is a tough one.",
            available: true,
        }))
        .unwrap();

    let eval = registry
        .evaluate_detailed(&failing_get(&["retry:3"]), &ctx)
        .unwrap();
    assert_eq!(eval.result.as_suggestion().unwrap().strategy_id, "stop");
    assert!(
        eval.declined
            .iter()
            .any(|n| n.strategy_id == "prediction" && n.reason == NoHelpReason::EvaluationFailed)
    );
    assert!(
        eval.declined
            .iter()
            .any(|n| n.strategy_id == "consultation"
                && n.reason == NoHelpReason::InsufficientContext)
    );
}

#[test]
fn same_situation_evaluates_identically_twice() {
    let graph = world_with_history();
    let ctx = StrategyContext::new(&graph);
    let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default()).unwrap();
    let situation = failing_get(&["retry:1"]);

    let a = registry.evaluate(&situation, &ctx).unwrap();
    let b = registry.evaluate(&situation, &ctx).unwrap();
    match (a, b) {
        (StrategyResult::Suggestion(sa), StrategyResult::Suggestion(sb)) => {
            assert_eq!(sa.strategy_id, sb.strategy_id);
            assert_eq!(sa.action_params["delay_ms"], sb.action_params["delay_ms"]);
            assert_eq!(sa.confidence, sb.confidence);
        }
        _ => panic!("expected suggestions from both evaluations"),
    }
}
