//! Domain models for review runs.

pub mod config;
pub mod history;
pub mod issue;
pub mod language;
pub mod lenient;
pub mod scoring;
pub mod session;

pub use config::{
    AnalysisConfig, CategoryWeights, CollaboratorsConfig, CommandSpec, Config, CredentialsConfig,
    IssueDefaults, LoggingConfig, OptimizationConfig, PriorityConfig, ReconcilerConfig,
    ScoreWeights, SeverityMultipliers, StaticAnalysisConfig, StaticToolConfig,
};
pub use history::{AuditEntry, AuditLevel, RoundRecord, RunHistory};
pub use issue::{Category, Issue, IssueSource, RawIssue, RawSuggestion, Severity};
pub use language::Language;
pub use scoring::{BestResult, ScoreHistory};
pub use session::{AnalysisContext, Feedback, RoundPhase, RunOutcome, SessionState, StopReason};
