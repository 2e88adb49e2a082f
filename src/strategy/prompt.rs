//! Prompt construction for model-assisted strategies.
//!
//! Strategies hand a flat context map to the builder so the prompt layout
//! can be swapped without touching strategy logic. The default builder asks
//! for structured JSON first; the response parser has a keyword fallback
//! for models that answer in prose anyway.

use std::collections::BTreeMap;

/// Flat, deterministic situation context for prompt building.
pub type ContextMap = BTreeMap<String, String>;

/// Builds prompts for the prediction and consultation strategies.
pub trait PromptBuilder: Send + Sync {
    /// Prompt asking the model to predict the next recovery action.
    fn build_prediction_prompt(&self, context: &ContextMap) -> String;

    /// Prompt relaying a question to an advisor (human or agent).
    fn build_consultation_prompt(&self, question: &str, context: &ContextMap) -> String;
}

/// Default prompt builder.
#[derive(Debug, Clone, Default)]
pub struct DefaultPromptBuilder;

impl DefaultPromptBuilder {
    /// Create the default builder.
    pub fn new() -> Self {
        Self
    }

    fn render_context(context: &ContextMap) -> String {
        context
            .iter()
            .map(|(k, v)| format!("- {k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl PromptBuilder for DefaultPromptBuilder {
    fn build_prediction_prompt(&self, context: &ContextMap) -> String {
        format!(
            "You are helping an autonomous agent recover while exploring a \
             hypermedia environment. Its current situation:\n{}\n\n\
             Predict the single best next action. Answer with only a JSON \
             object: {{\"action\": one of \"navigate\", \"backtrack\", \
             \"retry\", \"post\", \"get\", \"stop\", \"target\": optional \
             resource URI, \"reasoning\": short explanation, \
             \"confidence\": number between 0 and 1}}.",
            Self::render_context(context)
        )
    }

    fn build_consultation_prompt(&self, question: &str, context: &ContextMap) -> String {
        format!(
            "An autonomous agent is stuck and asks for your advice.\n\
             Question: {question}\n\nSituation:\n{}\n\n\
             Recommend one concrete action. Answer with only a JSON object: \
             {{\"action\": one of \"navigate\", \"backtrack\", \"retry\", \
             \"post\", \"get\", \"stop\", \"target\": optional resource URI, \
             \"advice\": why you recommend it, \"confidence\": number \
             between 0 and 1}}.",
            Self::render_context(context)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ContextMap {
        let mut map = ContextMap::new();
        map.insert("kind".into(), "failure".into());
        map.insert("target_resource".into(), "http://x/door/3".into());
        map
    }

    #[test]
    fn prediction_prompt_includes_context_and_schema() {
        let prompt = DefaultPromptBuilder::new().build_prediction_prompt(&context());
        assert!(prompt.contains("http://x/door/3"));
        assert!(prompt.contains("\"action\""));
        assert!(prompt.contains("\"confidence\""));
    }

    #[test]
    fn consultation_prompt_carries_the_question() {
        let prompt = DefaultPromptBuilder::new()
            .build_consultation_prompt("Which door should I take?", &context());
        assert!(prompt.contains("Which door should I take?"));
        assert!(prompt.contains("- kind: failure"));
    }
}
