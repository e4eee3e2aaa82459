//! Optimization suggester port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::RawSuggestion;

/// Suggests optimizations for code that is already in good shape.
#[async_trait]
pub trait OptimizationSuggester: Send + Sync {
    async fn suggest(&self, code: &str) -> DomainResult<Vec<RawSuggestion>>;
}
