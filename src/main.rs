//! ccrs CLI: compile pattern vocabularies, score options, evaluate recovery.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ccrs::config::RecoveryConfig;
use ccrs::graph::Triple;
use ccrs::graph::memory::MemoryGraph;
use ccrs::llm::OllamaCompletion;
use ccrs::relevance::{CandidateOption, RelevanceScorer};
use ccrs::result::StrategyResult;
use ccrs::situation::Situation;
use ccrs::strategy::StrategyContext;
use ccrs::strategy::registry::StrategyRegistry;
use ccrs::vocab::{PatternVocabulary, RuleCatalog, RuleSource};

#[derive(Parser)]
#[command(name = "ccrs", version, about = "Contingency recovery for hypermedia agents")]
struct Cli {
    /// Additional rule files (JSON arrays of declarations).
    #[arg(long = "rules", global = true)]
    rules: Vec<PathBuf>,

    /// Additional rule URLs.
    #[arg(long = "rules-url", global = true)]
    rules_url: Vec<String>,

    /// Skip the built-in stigmergy vocabulary.
    #[arg(long, global = true)]
    no_builtin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the vocabulary and print a summary.
    Compile,

    /// Score candidate options against a knowledge graph.
    Score {
        /// Path to a JSON array of triples.
        #[arg(long)]
        triples: PathBuf,

        /// Candidate URIs, comma-separated.
        #[arg(long)]
        candidates: String,

        /// Option type tag applied to every candidate.
        #[arg(long, default_value = "link")]
        option_type: String,

        /// Option position applied to every candidate.
        #[arg(long, default_value = "target")]
        position: String,
    },

    /// Run the strategy pipeline on a situation.
    Evaluate {
        /// Path to a situation JSON file.
        #[arg(long)]
        situation: PathBuf,

        /// Optional JSON array of triples for the knowledge graph.
        #[arg(long)]
        triples: Option<PathBuf>,

        /// Optional recovery configuration (TOML).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Probe the completion service and register model strategies.
        #[arg(long)]
        with_model: bool,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let vocabulary = load_vocabulary(&cli)?;

    match cli.command {
        Commands::Compile => {
            println!(
                "compiled {} structural pattern(s), {} skipped",
                vocabulary.structural_patterns().len(),
                vocabulary.skipped.len()
            );
            for pattern in vocabulary.structural_patterns() {
                println!(
                    "  {:<24} priority {:+.2}  {}",
                    pattern.id,
                    pattern.priority,
                    if pattern.is_fast_path() { "fast" } else { "slow" }
                );
            }
            println!("pattern types:");
            for ty in vocabulary.pattern_types() {
                println!("  {ty}");
            }
        }

        Commands::Score {
            triples,
            candidates,
            option_type,
            position,
        } => {
            let graph = load_graph(&triples)?;
            let scorer = RelevanceScorer::new(&vocabulary);
            let options: Vec<CandidateOption> = candidates
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|uri| CandidateOption::new(uri, option_type.clone(), position.clone()))
                .collect();

            for scored in scorer.rank(&graph, &options) {
                println!(
                    "{:+.3}  {}  [{}]",
                    scored.score,
                    scored.option.uri,
                    scored.matched_patterns.join(", ")
                );
            }
        }

        Commands::Evaluate {
            situation,
            triples,
            config,
            with_model,
        } => {
            let text = std::fs::read_to_string(&situation).into_diagnostic()?;
            let situation: Situation = serde_json::from_str(&text).into_diagnostic()?;

            let graph = match triples {
                Some(path) => load_graph(&path)?,
                None => MemoryGraph::new(),
            };
            let recovery = match config {
                Some(path) => RecoveryConfig::from_toml_file(&path)?,
                None => RecoveryConfig::default(),
            };

            let mut registry = StrategyRegistry::with_builtins(&recovery)?;
            if with_model {
                let mut service = OllamaCompletion::new(recovery.model.clone());
                service.probe();
                registry = registry.with_model_strategies(std::sync::Arc::new(service))?;
            }

            let ctx = StrategyContext::new(&graph).with_vocabulary(&vocabulary);
            let evaluation = registry.evaluate_detailed(&situation, &ctx)?;

            match &evaluation.result {
                StrategyResult::Suggestion(s) => {
                    println!("{}", serde_json::to_string_pretty(s).into_diagnostic()?);
                }
                StrategyResult::NoHelp(n) => {
                    println!("{}", serde_json::to_string_pretty(n).into_diagnostic()?);
                }
            }
            for declined in &evaluation.declined {
                eprintln!(
                    "declined: {} ({:?}){}",
                    declined.strategy_id,
                    declined.reason,
                    declined
                        .explanation
                        .as_deref()
                        .map(|e| format!(" — {e}"))
                        .unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

/// Build the vocabulary from the CLI's rule sources, in order.
fn load_vocabulary(cli: &Cli) -> Result<PatternVocabulary> {
    let mut sources = Vec::new();
    if !cli.no_builtin {
        sources.push(RuleSource::Builtin);
    }
    sources.extend(cli.rules.iter().cloned().map(RuleSource::File));
    sources.extend(cli.rules_url.iter().cloned().map(RuleSource::Url));

    let catalog = RuleCatalog::load(&sources);
    Ok(PatternVocabulary::compile(&catalog)?)
}

/// Load a memory graph from a JSON array of triples.
fn load_graph(path: &PathBuf) -> Result<MemoryGraph> {
    let text = std::fs::read_to_string(path).into_diagnostic()?;
    let triples: Vec<Triple> = serde_json::from_str(&text).into_diagnostic()?;
    let graph = MemoryGraph::new();
    graph.insert_all(&triples);
    Ok(graph)
}
