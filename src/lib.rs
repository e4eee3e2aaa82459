//! coderefine - iterative multi-analyzer code refinement
//!
//! A review run analyzes a piece of code with an LLM-backed quality analyzer
//! and a set of static tools, reconciles their findings, asks a transformer to
//! fix them, and repeats until the code is good enough or stops improving.
//! The best version seen is always what the run returns.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, scoring rules and collaborator ports
//! - **Service Layer** (`services`): the refinement state machine and reconciler
//! - **Infrastructure Layer** (`infrastructure`): command adapters, config, logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use coderefine::infrastructure::{collaborators, config::ConfigLoader};
//! use coderefine::RefinementOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let api_key = ConfigLoader::resolve_credential(&config.credentials)?;
//!     let collaborators = collaborators::from_config(&config, api_key)?;
//!     let outcome = RefinementOrchestrator::new(config, collaborators)
//!         .run("def f(): pass", Default::default(), Vec::new())
//!         .await?;
//!     println!("{}", outcome.best_code);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{ConfigError, DomainError, DomainResult};
pub use domain::models::{
    AnalysisConfig, AnalysisContext, Config, Feedback, Issue, IssueSource, Language, RawIssue,
    RoundRecord, RunOutcome, Severity, StopReason,
};
pub use infrastructure::config::ConfigLoader;
pub use services::{Collaborators, IssueReconciler, RefinementOrchestrator, StopSignal};
