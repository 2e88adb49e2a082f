//! End-to-end integration tests for the ccrs recovery core.
//!
//! These tests exercise the full pipeline from vocabulary compilation
//! through relevance scoring and strategy escalation, validating that the
//! compiler, matcher, and registry work together over both graph adapters.

use ccrs::config::RecoveryConfig;
use ccrs::graph::memory::MemoryGraph;
use ccrs::graph::sparql::SparqlGraph;
use ccrs::graph::{GraphAdapter, Triple};
use ccrs::matcher;
use ccrs::relevance::{CandidateOption, RelevanceScorer};
use ccrs::situation::{KEY_HTTP_STATUS, Situation, SituationKind};
use ccrs::strategy::StrategyContext;
use ccrs::strategy::registry::StrategyRegistry;
use ccrs::vocab::{CompiledForm, PatternVocabulary, RuleCatalog, RuleDeclaration, RuleKind};

fn builtin_vocab() -> PatternVocabulary {
    PatternVocabulary::compile(&RuleCatalog::builtin()).unwrap()
}

/// A small exploration graph with stigmergic markers from earlier agents.
fn marked_world() -> MemoryGraph {
    let g = MemoryGraph::new();
    // Door 1 carries a success trail.
    g.insert(&Triple::new("http://maze/door/1", "urn:ccrs:stig:markedBy", "urn:mark:1"));
    g.insert(&Triple::new("urn:mark:1", "urn:ccrs:stig:outcome", "urn:ccrs:stig:Success"));
    // Door 2 is a known dead end.
    g.insert(&Triple::new("http://maze/door/2", "urn:ccrs:stig:markedBy", "urn:mark:2"));
    g.insert(&Triple::new("urn:mark:2", "urn:ccrs:stig:outcome", "urn:ccrs:stig:DeadEnd"));
    // Door 3 has a waypoint mark with an explicit strength.
    g.insert(&Triple::new("http://maze/door/3", "urn:ccrs:stig:waypoint", "urn:mark:3"));
    g.insert(&Triple::new("urn:mark:3", "urn:ccrs:stig:strength", "0.9"));
    g
}

#[test]
fn end_to_end_compile_score_decide() {
    let vocab = builtin_vocab();
    let graph = marked_world();
    graph.record_visit("http://maze/entry");
    graph.record_visit("http://maze/room/9");

    // Score the doors the agent discovered.
    let scorer = RelevanceScorer::new(&vocab);
    let candidates = vec![
        CandidateOption::new("http://maze/door/1", "link", "target"),
        CandidateOption::new("http://maze/door/2", "link", "target"),
        CandidateOption::new("http://maze/door/3", "link", "target"),
    ];
    let ranked = scorer.rank(&graph, &candidates);
    assert_eq!(ranked[0].option.uri, "http://maze/door/1");
    assert_eq!(ranked.last().unwrap().option.uri, "http://maze/door/2");
    assert!(ranked.last().unwrap().score < 0.0);

    // The best door failed with a 503: the pipeline proposes a retry first.
    let situation = Situation::builder(SituationKind::Failure)
        .current_resource("http://maze/room/9")
        .target_resource("http://maze/door/1")
        .failed_action("GET")
        .error_info(KEY_HTTP_STATUS, 503)
        .build();
    let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default()).unwrap();
    let ctx = StrategyContext::new(&graph).with_vocabulary(&vocab);
    let result = registry.evaluate(&situation, &ctx).unwrap();
    let suggestion = result.as_suggestion().unwrap();
    assert_eq!(suggestion.strategy_id, "retry");
    assert_eq!(suggestion.action_params["delay_ms"], 1000);
}

#[test]
fn fast_and_slow_paths_agree_on_pure_conjunctions() {
    // The same pure-conjunction pattern, compiled once normally (fast path)
    // and once with the body forced onto the slow path.
    let body = "?option <urn:ccrs:stig:markedBy> ?mark . \
                ?mark <urn:ccrs:stig:outcome> <urn:ccrs:stig:Success>";
    let decl = RuleDeclaration {
        id: "equiv".into(),
        kind: RuleKind::Structural,
        pattern_type: "test:equiv".into(),
        priority: 0.5,
        matches_position: None,
        sparql_pattern: Some(body.into()),
        extract_target_variable: Some("option".into()),
        extract_relevance_variable: None,
    };
    let catalog = RuleCatalog {
        declarations: vec![decl],
        loaded_sources: vec!["test".into()],
    };
    let vocab = PatternVocabulary::compile(&catalog).unwrap();
    let fast = &vocab.structural_patterns()[0];
    assert!(fast.is_fast_path());

    let mut slow = fast.clone();
    slow.compiled = CompiledForm::SlowPath(body.to_string());

    // One SPARQL-capable store serves both paths.
    let graph = SparqlGraph::in_memory().unwrap();
    graph
        .insert_all(&[
            Triple::new("http://maze/door/1", "urn:ccrs:stig:markedBy", "urn:mark:1"),
            Triple::new("urn:mark:1", "urn:ccrs:stig:outcome", "urn:ccrs:stig:Success"),
            Triple::new("http://maze/door/2", "urn:ccrs:stig:markedBy", "urn:mark:2"),
            Triple::new("urn:mark:2", "urn:ccrs:stig:outcome", "urn:ccrs:stig:DeadEnd"),
            Triple::new("http://maze/door/4", "urn:ccrs:stig:markedBy", "urn:mark:4"),
            Triple::new("urn:mark:4", "urn:ccrs:stig:outcome", "urn:ccrs:stig:Success"),
        ])
        .unwrap();

    let mut fast_solutions = matcher::solutions(fast, &graph).unwrap();
    let mut slow_solutions = matcher::solutions(&slow, &graph).unwrap();
    fast_solutions.sort();
    slow_solutions.sort();
    assert_eq!(fast_solutions, slow_solutions);
    assert_eq!(fast_solutions.len(), 2);
}

#[test]
fn sparql_graph_serves_the_bounded_interface() {
    let graph = SparqlGraph::in_memory().unwrap();
    graph
        .insert(&Triple::new("http://maze/room/9", "http://maze/exit", "http://maze/room/10"))
        .unwrap();

    assert!(graph.contains(&Triple::new(
        "http://maze/room/9",
        "http://maze/exit",
        "http://maze/room/10"
    )));
    let n = graph.neighborhood("http://maze/room/9", 5, 5);
    assert_eq!(n.outgoing.len(), 1);
    assert!(n.incoming.is_empty());
}

#[test]
fn scoring_over_the_sparql_adapter_matches_the_memory_adapter() {
    let vocab = builtin_vocab();
    let memory = marked_world();
    let sparql = SparqlGraph::in_memory().unwrap();
    sparql.insert_all(&memory.all_triples()).unwrap();

    let scorer = RelevanceScorer::new(&vocab);
    for uri in [
        "http://maze/door/1",
        "http://maze/door/2",
        "http://maze/door/3",
    ] {
        let candidate = CandidateOption::new(uri, "link", "target");
        let from_memory = scorer.score(&memory, &candidate).score;
        let from_sparql = scorer.score(&sparql, &candidate).score;
        assert!(
            (from_memory - from_sparql).abs() < 1e-6,
            "{uri}: {from_memory} vs {from_sparql}"
        );
    }
}

#[test]
fn vocabulary_loaded_from_file_scores_like_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    let json = serde_json::to_string(&RuleCatalog::builtin().declarations).unwrap();
    std::fs::write(&path, json).unwrap();

    let catalog = RuleCatalog::load(&[ccrs::vocab::RuleSource::File(path)]);
    let vocab = PatternVocabulary::compile(&catalog).unwrap();
    let graph = marked_world();

    let scored = RelevanceScorer::new(&vocab).score(
        &graph,
        &CandidateOption::new("http://maze/door/1", "link", "target"),
    );
    assert!(scored.score > 0.0);
}

#[test]
fn pipeline_is_usable_from_multiple_threads() {
    let vocab = std::sync::Arc::new(builtin_vocab());
    let graph = std::sync::Arc::new(marked_world());
    let registry =
        std::sync::Arc::new(StrategyRegistry::with_builtins(&RecoveryConfig::default()).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let vocab = vocab.clone();
            let graph = graph.clone();
            let registry = registry.clone();
            std::thread::spawn(move || {
                let situation = Situation::builder(SituationKind::Failure)
                    .target_resource(format!("http://maze/door/{i}"))
                    .failed_action("GET")
                    .error_info(KEY_HTTP_STATUS, 503)
                    .build();
                let ctx = StrategyContext::new(graph.as_ref()).with_vocabulary(&vocab);
                registry.evaluate(&situation, &ctx).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert!(result.as_suggestion().is_some());
    }
}
