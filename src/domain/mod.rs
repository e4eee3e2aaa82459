//! Domain layer for the coderefine review loop
//!
//! This module contains the issue model, scoring rules, session state and the
//! port traits implemented by external collaborators.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{ConfigError, DomainError, DomainResult};
