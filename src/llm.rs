//! Completion service seam for model-assisted strategies.
//!
//! Prediction and consultation only ever see the [`CompletionService`]
//! trait: one bounded-timeout `complete` call plus an availability probe.
//! The reference implementation talks to a local Ollama server; anything
//! with the same two capabilities (a remote operator console, another
//! agent) plugs in the same way.

use serde_json::Value;

use crate::config::ModelConfig;
use crate::error::LlmError;

/// A bounded text-completion capability.
pub trait CompletionService: Send + Sync {
    /// Complete a prompt. Must return within the service's configured
    /// timeout — callers rely on this never blocking indefinitely.
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Whether the backing service is reachable.
    fn is_available(&self) -> bool;
}

/// Ollama-backed completion service.
pub struct OllamaCompletion {
    config: ModelConfig,
    available: bool,
}

impl OllamaCompletion {
    /// Create a client; call [`OllamaCompletion::probe`] before use.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            available: false,
        }
    }

    /// Probe the server with a lightweight `/api/tags` request.
    pub fn probe(&mut self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(5))
            .build();

        self.available = match agent.get(&url).call() {
            Ok(resp) => resp.status() == 200,
            Err(_) => false,
        };
        self.available
    }

    /// The model name being used.
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

impl CompletionService for OllamaCompletion {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if !self.available {
            return Err(LlmError::Unavailable {
                url: self.config.base_url.clone(),
            });
        }

        let url = format!("{}/api/generate", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });
        let body_str = serde_json::to_string(&body).map_err(|e| LlmError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| {
                let message = e.to_string();
                if message.contains("timed out") || message.contains("timeout") {
                    LlmError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else {
                    LlmError::RequestFailed { message }
                }
            })?;

        let resp_str = resp.into_string().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;
        let json: Value = serde_json::from_str(&resp_str).map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        json["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::ParseError {
                message: "missing 'response' field".into(),
            })
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

impl std::fmt::Debug for OllamaCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaCompletion")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("available", &self.available)
            .finish()
    }
}
