//! Rich diagnostic error types for the ccrs recovery core.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text so callers know exactly what
//! went wrong and how to fix it. Configuration problems (bad priorities,
//! duplicate strategy ids, broken config files) fail fast at load time;
//! nothing in this module surfaces during a match or an evaluation that a
//! correct compile would have caught.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ccrs recovery core.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum CcrsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Vocab(#[from] VocabError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Vocabulary compiler errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum VocabError {
    #[error("pattern '{id}' has priority {priority} outside [-1, 1]")]
    #[diagnostic(
        code(ccrs::vocab::priority_range),
        help(
            "Pattern priorities weight relevance scoring and must lie in \
             [-1.0, 1.0]. Fix the rule declaration; out-of-range priorities \
             are rejected at compile time, never at match time."
        )
    )]
    PriorityOutOfRange { id: String, priority: f32 },

    #[error("pattern '{id}' body could not be parsed: {message}")]
    #[diagnostic(
        code(ccrs::vocab::pattern_parse),
        help(
            "The SPARQL body is neither a parseable triple conjunction nor \
             valid enough to keep for slow-path evaluation. The pattern is \
             skipped; the rest of the vocabulary still compiles."
        )
    )]
    PatternParse { id: String, message: String },

    #[error("structural pattern '{id}' declares no target variable")]
    #[diagnostic(
        code(ccrs::vocab::missing_target),
        help(
            "Structural patterns must name the variable whose bindings \
             identify the matched option. Add extract_target_variable to the \
             rule declaration."
        )
    )]
    MissingTargetVariable { id: String },

    #[error("rule source '{source}' failed to load: {message}")]
    #[diagnostic(
        code(ccrs::vocab::source_load),
        help(
            "Check that the file exists or the URL is reachable and returns \
             a JSON array of rule declarations. Failed sources are skipped; \
             the remaining sources still load."
        )
    )]
    SourceLoad { source: String, message: String },

    #[error("rule source '{source}' is not valid JSON: {message}")]
    #[diagnostic(
        code(ccrs::vocab::source_json),
        help("Rule sources must be JSON arrays of rule declarations.")
    )]
    SourceJson { source: String, message: String },
}

// ---------------------------------------------------------------------------
// Matcher errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MatchError {
    #[error("pattern '{id}' is malformed at evaluation time: {message}")]
    #[diagnostic(
        code(ccrs::matcher::malformed),
        help(
            "A compiled pattern failed structural checks during evaluation. \
             This should not happen after a successful compile — please file \
             a bug with the pattern definition."
        )
    )]
    MalformedPattern { id: String, message: String },

    #[error("slow-path evaluation of pattern '{id}' failed: {message}")]
    #[diagnostic(
        code(ccrs::matcher::slow_path),
        help(
            "The knowledge-graph adapter rejected the delegated query. \
             Check that the adapter supports general SPARQL evaluation."
        )
    )]
    SlowPath { id: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Graph adapter errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("SPARQL query error: {message}")]
    #[diagnostic(
        code(ccrs::graph::sparql),
        help("The SPARQL query failed. Check the query syntax and the store state.")
    )]
    Sparql { message: String },

    #[error("this adapter does not support general SPARQL evaluation")]
    #[diagnostic(
        code(ccrs::graph::select_unsupported),
        help(
            "Slow-path patterns need an adapter with a general query \
             capability (e.g. SparqlGraph). Either use such an adapter or \
             restrict the vocabulary to fast-path patterns."
        )
    )]
    SelectUnsupported,

    #[error("invalid term '{term}': {message}")]
    #[diagnostic(
        code(ccrs::graph::invalid_term),
        help("Graph terms must be IRIs or plain literals.")
    )]
    InvalidTerm { term: String, message: String },
}

// ---------------------------------------------------------------------------
// Strategy / registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StrategyError {
    #[error("a strategy with id '{id}' is already registered")]
    #[diagnostic(
        code(ccrs::strategy::duplicate_id),
        help(
            "Strategy ids must be unique within a registry. Rename one of \
             the strategies or rebuild the registry."
        )
    )]
    DuplicateId { id: String },

    #[error("no strategy produced a result and no terminal strategy is registered")]
    #[diagnostic(
        code(ccrs::strategy::exhausted),
        help(
            "Escalation totality requires a terminal-level (level 0) \
             strategy such as Stop. Register one so the pipeline always \
             returns a result."
        )
    )]
    Exhausted,

    #[error("strategy '{id}' evaluation failed: {message}")]
    #[diagnostic(
        code(ccrs::strategy::evaluation),
        help(
            "The strategy reported an internal failure. The pipeline \
             converts this to NoHelp and continues with other strategies."
        )
    )]
    Evaluation { id: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Llm(#[from] LlmError),
}

// ---------------------------------------------------------------------------
// Completion service errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("completion service is not available at {url}")]
    #[diagnostic(
        code(ccrs::llm::unavailable),
        help(
            "Start the backing service (e.g. `ollama serve`) or skip \
             registering model-assisted strategies; the pipeline degrades to \
             built-in strategies."
        )
    )]
    Unavailable { url: String },

    #[error("completion request failed: {message}")]
    #[diagnostic(
        code(ccrs::llm::request_failed),
        help("Check that the service is running and the model is loaded.")
    )]
    RequestFailed { message: String },

    #[error("completion request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(ccrs::llm::timeout),
        help("Increase the timeout in ModelConfig or use a smaller model.")
    )]
    Timeout { timeout_secs: u64 },

    #[error("failed to parse completion response: {message}")]
    #[diagnostic(
        code(ccrs::llm::parse_error),
        help("The service returned an unexpected response format.")
    )]
    ParseError { message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    #[diagnostic(
        code(ccrs::config::read),
        help("Check that the path exists and is readable.")
    )]
    Read { path: String, message: String },

    #[error("config file {path} is not valid TOML: {message}")]
    #[diagnostic(
        code(ccrs::config::toml),
        help("Fix the TOML syntax; see RecoveryConfig for the expected keys.")
    )]
    Toml { path: String, message: String },

    #[error("invalid config value for {field}: {message}")]
    #[diagnostic(
        code(ccrs::config::value),
        help("Adjust the value; defaults are documented on RecoveryConfig.")
    )]
    Value { field: String, message: String },
}

/// Convenience alias for functions returning ccrs results.
pub type CcrsResult<T> = std::result::Result<T, CcrsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocab_error_converts_to_ccrs_error() {
        let err = VocabError::PriorityOutOfRange {
            id: "p1".into(),
            priority: 1.5,
        };
        let ccrs: CcrsError = err.into();
        assert!(matches!(
            ccrs,
            CcrsError::Vocab(VocabError::PriorityOutOfRange { .. })
        ));
    }

    #[test]
    fn graph_error_nests_into_match_error() {
        let err: MatchError = GraphError::SelectUnsupported.into();
        assert!(matches!(err, MatchError::Graph(GraphError::SelectUnsupported)));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = VocabError::PriorityOutOfRange {
            id: "stigmergy-visited".into(),
            priority: -3.0,
        };
        let msg = format!("{err}");
        assert!(msg.contains("stigmergy-visited"));
        assert!(msg.contains("-3"));
    }

    #[test]
    fn strategy_duplicate_id_display() {
        let err = StrategyError::DuplicateId { id: "retry".into() };
        assert!(format!("{err}").contains("retry"));
    }
}
