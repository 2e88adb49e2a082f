//! # ccrs
//!
//! Contingency recovery for autonomous agents exploring remote hypermedia
//! graphs. When an action fails, the agent is stuck, or it is uncertain how
//! to proceed, CCRS picks the least intrusive recovery that can plausibly
//! help.
//!
//! ## Architecture
//!
//! - **Pattern vocabulary** (`vocab`): declarative graph-pattern rules
//!   compiled once into an O(1) simple index plus fast-path/slow-path
//!   structural patterns
//! - **Structural matcher** (`matcher`): backtracking constraint joins over
//!   a bounded triple-query adapter, with SPARQL delegation for the slow path
//! - **Relevance scoring** (`relevance`): ranks discovered options against
//!   the compiled vocabulary (stigmergic markers left by other agents)
//! - **Strategy pipeline** (`strategy`): registry of recovery strategies
//!   escalating from cheap retries up to abandonment
//! - **Graph adapters** (`graph`): in-memory (petgraph) and SPARQL
//!   (oxigraph) implementations of the knowledge-graph boundary
//!
//! ## Library usage
//!
//! ```no_run
//! use ccrs::config::RecoveryConfig;
//! use ccrs::graph::memory::MemoryGraph;
//! use ccrs::situation::{Situation, SituationKind};
//! use ccrs::strategy::registry::StrategyRegistry;
//! use ccrs::strategy::StrategyContext;
//!
//! let graph = MemoryGraph::new();
//! let registry = StrategyRegistry::with_builtins(&RecoveryConfig::default()).unwrap();
//! let situation = Situation::builder(SituationKind::Failure)
//!     .failed_action("GET")
//!     .target_resource("http://example.org/door/3")
//!     .error_info("http_status", 503)
//!     .build();
//! let ctx = StrategyContext::new(&graph);
//! let result = registry.evaluate(&situation, &ctx).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod matcher;
pub mod relevance;
pub mod result;
pub mod situation;
pub mod strategy;
pub mod vocab;
