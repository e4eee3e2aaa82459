//! Service layer
//!
//! Coordinates one review run:
//! - `orchestrator`: the round state machine and stop rules
//! - `reconciler`: merges findings from independent analyzers
//! - `static_dispatcher`: runs static tools concurrently over a code snapshot

pub mod orchestrator;
pub mod reconciler;
pub mod static_dispatcher;

pub use orchestrator::{Collaborators, RefinementOrchestrator, StopSignal};
pub use reconciler::{
    description_similarity, AnalyzerOutput, IssueReconciler, Reconciliation, ReconciliationStats,
};
pub use static_dispatcher::StaticAnalysisDispatcher;
