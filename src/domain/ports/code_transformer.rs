//! Code transformer port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Issue;

/// Applies fixes for the given findings.
///
/// `Ok(None)` means nothing usable was produced; the round then keeps its
/// input code.
#[async_trait]
pub trait CodeTransformer: Send + Sync {
    async fn transform(&self, code: &str, issues: &[Issue]) -> DomainResult<Option<String>>;
}
