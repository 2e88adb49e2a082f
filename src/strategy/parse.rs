//! Model-response parsing.
//!
//! Two stages: structured JSON field extraction, then a keyword fallback
//! that scans free prose for action verbs and a URI-shaped target at a
//! fixed low confidence. A completely unparseable response is an explicit
//! invalid result — the owning strategy declines; nothing is ever guessed.

use regex::Regex;
use serde_json::Value;

/// Fixed confidence assigned to keyword-fallback parses.
pub const FALLBACK_CONFIDENCE: f32 = 0.3;

/// Fields a strategy can recover from a raw model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAdvice {
    /// Whether anything actionable was recovered.
    pub valid: bool,
    /// The recommended action verb.
    pub action: Option<String>,
    /// The recommended target resource.
    pub target: Option<String>,
    /// Why the model recommends this.
    pub explanation: Option<String>,
    /// The model's stated confidence, or the fallback constant.
    pub confidence: Option<f32>,
}

impl ParsedAdvice {
    /// An explicit "nothing recoverable" result.
    pub fn invalid() -> Self {
        Self::default()
    }
}

/// Parses raw completion text into [`ParsedAdvice`].
pub trait ResponseParser: Send + Sync {
    fn parse(&self, raw: &str) -> ParsedAdvice;
}

/// Reference parser: JSON extraction with a keyword-scanning fallback.
pub struct DefaultResponseParser {
    /// Action verbs with their surface forms, in priority order.
    verbs: Vec<(&'static str, Regex)>,
    uri: Regex,
}

impl DefaultResponseParser {
    /// Build the parser (compiles its regexes).
    pub fn new() -> Self {
        let verb = |pattern: &str| {
            Regex::new(&format!(r"(?i)\b(?:{pattern})\b")).expect("valid verb pattern")
        };
        Self {
            verbs: vec![
                ("navigate", verb("navigate|go to|visit|follow")),
                ("backtrack", verb("backtrack|go back|return|turn around")),
                ("retry", verb("retry|try again")),
                ("post", verb("post")),
                ("get", verb("get|fetch")),
                ("stop", verb("stop|give up|abandon")),
            ],
            uri: Regex::new(r#"https?://[^\s"'<>\)\]]+"#).expect("valid URI pattern"),
        }
    }

    /// Structured extraction: the first JSON object found in the text.
    fn parse_structured(&self, raw: &str) -> Option<ParsedAdvice> {
        let start = raw.find('{')?;
        let end = raw.rfind('}')?;
        if end <= start {
            return None;
        }
        let json: Value = serde_json::from_str(&raw[start..=end]).ok()?;
        let object = json.as_object()?;

        let action = object.get("action")?.as_str()?.trim().to_lowercase();
        if action.is_empty() {
            return None;
        }

        let target = object
            .get("target")
            .and_then(Value::as_str)
            .map(str::to_string);
        let explanation = ["reasoning", "advice", "explanation", "rationale"]
            .iter()
            .find_map(|key| object.get(*key))
            .and_then(Value::as_str)
            .map(str::to_string);
        let confidence = match object.get("confidence") {
            Some(Value::Number(n)) => n.as_f64().map(|v| v as f32),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };

        Some(ParsedAdvice {
            valid: true,
            action: Some(action),
            target,
            explanation,
            confidence,
        })
    }

    /// Fallback: scan prose for an action verb and a URI-shaped target.
    fn parse_keywords(&self, raw: &str) -> Option<ParsedAdvice> {
        let action = self
            .verbs
            .iter()
            .find(|(_, pattern)| pattern.is_match(raw))
            .map(|(name, _)| name.to_string())?;
        let target = self.uri.find(raw).map(|m| m.as_str().to_string());

        Some(ParsedAdvice {
            valid: true,
            action: Some(action),
            target,
            explanation: None,
            confidence: Some(FALLBACK_CONFIDENCE),
        })
    }
}

impl Default for DefaultResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser for DefaultResponseParser {
    fn parse(&self, raw: &str) -> ParsedAdvice {
        if let Some(advice) = self.parse_structured(raw) {
            return advice;
        }
        if let Some(advice) = self.parse_keywords(raw) {
            tracing::debug!(action = ?advice.action, "parsed response via keyword fallback");
            return advice;
        }
        ParsedAdvice::invalid()
    }
}

impl std::fmt::Debug for DefaultResponseParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultResponseParser").finish()
    }
}
