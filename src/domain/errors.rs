//! Domain errors for the coderefine review loop.

use thiserror::Error;

/// Errors raised while preparing or driving a review run.
///
/// Only [`DomainError::Configuration`] ever escapes
/// [`RefinementOrchestrator::run`](crate::services::RefinementOrchestrator::run);
/// collaborator failures are recovered inside the round that produced them.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Quality analyzer failed: {0}")]
    QualityAnalyzerFailed(String),

    #[error("Static analysis failed: {0}")]
    StaticAnalysisFailed(String),

    #[error("Critic failed: {0}")]
    CriticFailed(String),

    #[error("Code transformer failed: {0}")]
    TransformerFailed(String),

    #[error("Optimization suggester failed: {0}")]
    OptimizerFailed(String),

    #[error("Collaborator timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

/// Configuration error types
///
/// These are the only fatal errors of a run: they are detected before the
/// first round and abort it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid max_iterations: {0}. Must be at least 1")]
    InvalidMaxIterations(u32),

    #[error("Invalid min_score_threshold: {0}. Must be between 0 and 100")]
    InvalidScoreThreshold(f64),

    #[error("Invalid convergence_threshold: {0}. Must be positive")]
    InvalidConvergenceThreshold(f64),

    #[error("Invalid stagnation_threshold: {0}. Must be at least 1")]
    InvalidStagnationThreshold(u32),

    #[error("Invalid similarity_threshold: {0}. Must be between 0 and 1")]
    InvalidSimilarityThreshold(f64),

    #[error("Invalid confidence default for {field}: {value}. Must be between 0 and 1")]
    InvalidConfidence { field: String, value: f64 },

    #[error("Invalid weight for {name}: {value}. Must be non-negative")]
    InvalidWeight { name: String, value: f64 },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid max_workers: {0}. Must be at least 1")]
    InvalidMaxWorkers(usize),

    #[error("Missing required credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("Missing required collaborator command: {0}")]
    MissingCollaborator(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}
