//! Situation: the immutable description of a contingency event.
//!
//! A situation is built once per event by the navigation loop and handed to
//! the strategy pipeline as a snapshot. All recovery history lives in the
//! value (`attempted_strategies`), never in the pipeline — re-evaluating the
//! same situation twice gives the same answer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Conventional `error_info` key for the HTTP status code.
pub const KEY_HTTP_STATUS: &str = "http_status";
/// Conventional `error_info` key for the human-readable message.
pub const KEY_MESSAGE: &str = "message";
/// Conventional `error_info` key for the transport-level error class.
pub const KEY_ERROR_TYPE: &str = "error_type";

/// What kind of contingency the agent is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SituationKind {
    /// An action failed outright.
    Failure,
    /// Exploration cannot make progress.
    Stuck,
    /// The agent does not know which option to take.
    Uncertainty,
    /// No contingency yet — the agent is probing for guidance.
    Proactive,
}

/// Immutable description of a contingency event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Situation {
    /// The kind of contingency (required).
    pub kind: SituationKind,
    /// What raised the event (e.g. an affordance or monitor id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Where the agent currently is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_resource: Option<String>,
    /// Where the agent was trying to go or act.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_resource: Option<String>,
    /// The action that failed, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_action: Option<String>,
    /// Free-form error details; see the `KEY_*` conventional keys.
    #[serde(default)]
    pub error_info: HashMap<String, Value>,
    /// Recovery attempts so far: `"<strategy-id>:<n>"` or bare ids.
    #[serde(default)]
    pub attempted_strategies: Vec<String>,
    /// Extensible context for pluggable strategies.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Situation {
    /// Start building a situation of the given kind.
    pub fn builder(kind: SituationKind) -> SituationBuilder {
        SituationBuilder {
            situation: Situation {
                kind,
                trigger: None,
                current_resource: None,
                target_resource: None,
                failed_action: None,
                error_info: HashMap::new(),
                attempted_strategies: Vec::new(),
                metadata: HashMap::new(),
            },
        }
    }

    /// How many times the given strategy was already attempted.
    ///
    /// Bare `"<id>"` entries add one each; `"<id>:<n>"` entries raise the
    /// count to at least `n`, so re-appending the same numbered entry is
    /// idempotent.
    pub fn attempt_count(&self, strategy_id: &str) -> u32 {
        let mut count = 0u32;
        for entry in &self.attempted_strategies {
            if entry == strategy_id {
                count += 1;
            } else if let Some(n) = entry
                .strip_prefix(strategy_id)
                .and_then(|rest| rest.strip_prefix(':'))
                .and_then(|n| n.parse::<u32>().ok())
            {
                count = count.max(n);
            }
        }
        count
    }

    /// The HTTP status from `error_info`, when present.
    pub fn http_status(&self) -> Option<u16> {
        match self.error_info.get(KEY_HTTP_STATUS)? {
            Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The transport-level error class from `error_info`, when present.
    pub fn error_type(&self) -> Option<&str> {
        self.error_info.get(KEY_ERROR_TYPE)?.as_str()
    }

    /// The human-readable error message from `error_info`, when present.
    pub fn message(&self) -> Option<&str> {
        self.error_info.get(KEY_MESSAGE)?.as_str()
    }
}

/// Fluent builder for [`Situation`].
#[derive(Debug)]
pub struct SituationBuilder {
    situation: Situation,
}

impl SituationBuilder {
    /// Set the trigger identifier.
    pub fn trigger(mut self, trigger: impl Into<String>) -> Self {
        self.situation.trigger = Some(trigger.into());
        self
    }

    /// Set the current resource.
    pub fn current_resource(mut self, resource: impl Into<String>) -> Self {
        self.situation.current_resource = Some(resource.into());
        self
    }

    /// Set the target resource.
    pub fn target_resource(mut self, resource: impl Into<String>) -> Self {
        self.situation.target_resource = Some(resource.into());
        self
    }

    /// Set the failed action.
    pub fn failed_action(mut self, action: impl Into<String>) -> Self {
        self.situation.failed_action = Some(action.into());
        self
    }

    /// Add an `error_info` entry.
    pub fn error_info(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.situation.error_info.insert(key.into(), value.into());
        self
    }

    /// Record a prior strategy attempt.
    pub fn attempted(mut self, entry: impl Into<String>) -> Self {
        self.situation.attempted_strategies.push(entry.into());
        self
    }

    /// Add a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.situation.metadata.insert(key.into(), value.into());
        self
    }

    /// Finish the build.
    pub fn build(self) -> Situation {
        self.situation
    }
}
