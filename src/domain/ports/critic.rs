//! Critic port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Issue, RawIssue};

/// Refinement pass over reconciled findings.
///
/// Implementations may re-rank or re-explain findings. When the backend's
/// reply cannot be parsed they must return the input findings unchanged
/// rather than an empty list.
#[async_trait]
pub trait Critic: Send + Sync {
    async fn refine(&self, code: &str, issues: &[Issue]) -> DomainResult<Vec<RawIssue>>;
}
