//! Declarative pattern-rule definitions and their sources.
//!
//! Rules are data, not code — they can be loaded from JSON files or URLs,
//! or constructed programmatically via [`RuleCatalog::builtin()`]. Sources
//! are merged in declaration order; a source that fails to load is logged
//! and skipped so one broken vocabulary file never takes down the agent.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::VocabError;

/// Which flavor of pattern a rule declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Membership pattern: matches an option by `(pattern_type, position)`.
    Simple,
    /// Multi-triple graph pattern with a declared target variable.
    Structural,
}

/// One declarative pattern rule, as found in a vocabulary source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDeclaration {
    /// Unique rule identifier.
    pub id: String,
    /// Simple or structural.
    pub kind: RuleKind,
    /// Semantic tag of the rule (e.g. `stigmergy:success`).
    pub pattern_type: String,
    /// Relevance weight in [-1.0, 1.0]; negative repels, positive attracts.
    pub priority: f32,
    /// For simple rules: which option position the membership test covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches_position: Option<String>,
    /// For structural rules: the SPARQL graph-pattern body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparql_pattern: Option<String>,
    /// For structural rules: the variable naming the matched option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_target_variable: Option<String>,
    /// For structural rules: optional variable carrying a numeric weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_relevance_variable: Option<String>,
}

/// Where a set of rule declarations comes from.
#[derive(Debug, Clone)]
pub enum RuleSource {
    /// The built-in stigmergy catalog.
    Builtin,
    /// A local JSON file (array of declarations).
    File(PathBuf),
    /// A remote JSON document (array of declarations).
    Url(String),
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => write!(f, "builtin"),
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Url(u) => write!(f, "{u}"),
        }
    }
}

/// An ordered collection of rule declarations with provenance.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    /// Declarations in merged source order.
    pub declarations: Vec<RuleDeclaration>,
    /// Labels of the sources that actually loaded.
    pub loaded_sources: Vec<String>,
}

impl RuleCatalog {
    /// The built-in stigmergy vocabulary.
    ///
    /// Markers left by prior agent activity: successful traversals attract,
    /// dead ends and failed actions repel, fresh pheromone-style waypoint
    /// marks carry their own strength as the relevance weight.
    pub fn builtin() -> Self {
        let declarations = vec![
            RuleDeclaration {
                id: "stig-visited".into(),
                kind: RuleKind::Simple,
                pattern_type: "stigmergy:visited".into(),
                priority: -0.2,
                matches_position: Some("target".into()),
                sparql_pattern: None,
                extract_target_variable: None,
                extract_relevance_variable: None,
            },
            RuleDeclaration {
                id: "stig-goal-candidate".into(),
                kind: RuleKind::Simple,
                pattern_type: "stigmergy:goal-candidate".into(),
                priority: 0.9,
                matches_position: Some("target".into()),
                sparql_pattern: None,
                extract_target_variable: None,
                extract_relevance_variable: None,
            },
            RuleDeclaration {
                id: "stig-success-trail".into(),
                kind: RuleKind::Structural,
                pattern_type: "stigmergy:success".into(),
                priority: 0.8,
                matches_position: None,
                sparql_pattern: Some(
                    "?option <urn:ccrs:stig:markedBy> ?mark . \
                     ?mark <urn:ccrs:stig:outcome> <urn:ccrs:stig:Success>"
                        .into(),
                ),
                extract_target_variable: Some("option".into()),
                extract_relevance_variable: None,
            },
            RuleDeclaration {
                id: "stig-waypoint".into(),
                kind: RuleKind::Structural,
                pattern_type: "stigmergy:waypoint".into(),
                priority: 0.5,
                matches_position: None,
                sparql_pattern: Some(
                    "?option <urn:ccrs:stig:waypoint> ?mark . \
                     ?mark <urn:ccrs:stig:strength> ?strength"
                        .into(),
                ),
                extract_target_variable: Some("option".into()),
                extract_relevance_variable: Some("strength".into()),
            },
            RuleDeclaration {
                id: "stig-dead-end".into(),
                kind: RuleKind::Structural,
                pattern_type: "stigmergy:dead-end".into(),
                priority: -0.9,
                matches_position: None,
                sparql_pattern: Some(
                    "?option <urn:ccrs:stig:markedBy> ?mark . \
                     ?mark <urn:ccrs:stig:outcome> <urn:ccrs:stig:DeadEnd>"
                        .into(),
                ),
                extract_target_variable: Some("option".into()),
                extract_relevance_variable: None,
            },
        ];

        Self {
            loaded_sources: vec!["builtin".into()],
            declarations,
        }
    }

    /// Parse a catalog from a JSON array of declarations.
    pub fn from_json(json: &str, source: &str) -> Result<Self, VocabError> {
        let declarations: Vec<RuleDeclaration> =
            serde_json::from_str(json).map_err(|e| VocabError::SourceJson {
                source: source.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            declarations,
            loaded_sources: vec![source.to_string()],
        })
    }

    /// Load and merge the given sources in order.
    ///
    /// A source that fails to load or parse is logged and skipped; the
    /// remaining sources still contribute. Loading never aborts the agent.
    pub fn load(sources: &[RuleSource]) -> Self {
        let mut merged = Self::default();
        for source in sources {
            match Self::load_one(source) {
                Ok(catalog) => {
                    tracing::debug!(
                        source = %source,
                        rules = catalog.declarations.len(),
                        "loaded rule source"
                    );
                    merged.declarations.extend(catalog.declarations);
                    merged.loaded_sources.extend(catalog.loaded_sources);
                }
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "skipping rule source");
                }
            }
        }
        merged
    }

    fn load_one(source: &RuleSource) -> Result<Self, VocabError> {
        match source {
            RuleSource::Builtin => Ok(Self::builtin()),
            RuleSource::File(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| VocabError::SourceLoad {
                    source: path.display().to_string(),
                    message: e.to_string(),
                })?;
                Self::from_json(&text, &path.display().to_string())
            }
            RuleSource::Url(url) => {
                let agent = ureq::AgentBuilder::new()
                    .timeout(std::time::Duration::from_secs(10))
                    .build();
                let text = agent
                    .get(url)
                    .call()
                    .map_err(|e| VocabError::SourceLoad {
                        source: url.clone(),
                        message: e.to_string(),
                    })?
                    .into_string()
                    .map_err(|e| VocabError::SourceLoad {
                        source: url.clone(),
                        message: e.to_string(),
                    })?;
                Self::from_json(&text, url)
            }
        }
    }

    /// Number of declarations in the catalog.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
