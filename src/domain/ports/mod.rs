//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that external collaborators
//! must implement:
//! - QualityAnalyzer: primary score plus findings for a code artifact
//! - StaticAnalyzer / StaticTool: rule-based findings
//! - Critic: re-ranks and re-explains reconciled findings
//! - CodeTransformer: applies fixes
//! - OptimizationSuggester: one-off optimization hints
//!
//! The orchestrator depends only on these traits, never on a concrete
//! backend.

pub mod code_transformer;
pub mod critic;
pub mod optimization_suggester;
pub mod quality_analyzer;
pub mod static_analyzer;

pub use code_transformer::CodeTransformer;
pub use critic::Critic;
pub use optimization_suggester::OptimizationSuggester;
pub use quality_analyzer::{QualityAnalyzer, QualityReport};
pub use static_analyzer::{StaticAnalyzer, StaticTool};
