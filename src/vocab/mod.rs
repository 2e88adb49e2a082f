//! Declarative pattern vocabulary: rule sources, declarations, and the
//! compiler producing the read-only matching artifacts.
//!
//! Rules describe what makes a discovered option relevant to a recovery
//! decision — most importantly stigmergic markers left in the knowledge
//! graph by other agents. The vocabulary is compiled once at startup; the
//! compiled form is shared, immutable, across every evaluation thereafter.

pub mod compile;
pub mod rules;

pub use compile::{
    CompiledForm, PatternTerm, PatternVocabulary, SimplePattern, StructuralPattern,
    TripleConstraint,
};
pub use rules::{RuleCatalog, RuleDeclaration, RuleKind, RuleSource};
