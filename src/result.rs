//! Strategy results: a closed two-variant sum type.
//!
//! A strategy either makes a concrete [`Suggestion`] or explicitly declines
//! with a typed [`NoHelp`] reason. Callers match exhaustively; there is no
//! default or third state, and declines are always surfaced rather than
//! swallowed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a strategy could not help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoHelpReason {
    /// The strategy does not apply to this kind of situation.
    NotApplicable,
    /// A required input (resource, action, history) is missing.
    PreconditionMissing,
    /// The strategy already used up its attempts for this situation.
    AlreadyAttempted,
    /// Not enough context to produce a useful suggestion.
    InsufficientContext,
    /// The evaluation itself failed (internal or transport error).
    EvaluationFailed,
}

/// A concrete recovery proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Which strategy produced this.
    pub strategy_id: String,
    /// The proposed action (e.g. `retry`, `navigate`, `abandon`).
    pub action_type: String,
    /// The resource the action targets, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_target: Option<String>,
    /// Action-specific parameters (delays, attempt numbers, ...).
    #[serde(default)]
    pub action_params: HashMap<String, Value>,
    /// How likely the action is to help, in [0, 1].
    pub confidence: f32,
    /// How intrusive/expensive the action is, in [0, 1].
    pub estimated_cost: f32,
    /// Why the strategy proposes this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Side observations worth acting on opportunistically.
    #[serde(default)]
    pub opportunistic_guidance: Vec<String>,
}

impl Suggestion {
    /// Start a suggestion with full confidence and zero cost.
    pub fn new(strategy_id: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            action_type: action_type.into(),
            action_target: None,
            action_params: HashMap::new(),
            confidence: 1.0,
            estimated_cost: 0.0,
            rationale: None,
            opportunistic_guidance: Vec::new(),
        }
    }

    /// Set the action target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.action_target = Some(target.into());
        self
    }

    /// Add an action parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.action_params.insert(key.into(), value.into());
        self
    }

    /// Set the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the estimated cost, clamped to [0, 1].
    pub fn with_cost(mut self, cost: f32) -> Self {
        self.estimated_cost = cost.clamp(0.0, 1.0);
        self
    }

    /// Set the rationale.
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Add a piece of opportunistic guidance.
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.opportunistic_guidance.push(guidance.into());
        self
    }

    /// Ranking score: high confidence, low cost wins.
    pub fn score(&self) -> f32 {
        self.confidence * (1.0 - self.estimated_cost)
    }
}

/// An explicit decline with a typed reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoHelp {
    /// Which strategy declined.
    pub strategy_id: String,
    /// Why it declined.
    pub reason: NoHelpReason,
    /// Optional diagnostic detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl NoHelp {
    /// Create a decline.
    pub fn new(strategy_id: impl Into<String>, reason: NoHelpReason) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            reason,
            explanation: None,
        }
    }

    /// Attach a diagnostic explanation.
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// The outcome of one strategy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StrategyResult {
    /// A concrete recovery proposal.
    Suggestion(Suggestion),
    /// An explicit, typed decline.
    NoHelp(NoHelp),
}

impl StrategyResult {
    /// The suggestion, if this is one.
    pub fn as_suggestion(&self) -> Option<&Suggestion> {
        match self {
            Self::Suggestion(s) => Some(s),
            Self::NoHelp(_) => None,
        }
    }

    /// The decline, if this is one.
    pub fn as_no_help(&self) -> Option<&NoHelp> {
        match self {
            Self::Suggestion(_) => None,
            Self::NoHelp(n) => Some(n),
        }
    }

    /// Which strategy produced this result.
    pub fn strategy_id(&self) -> &str {
        match self {
            Self::Suggestion(s) => &s.strategy_id,
            Self::NoHelp(n) => &n.strategy_id,
        }
    }
}
