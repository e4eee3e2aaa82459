//! Static analysis ports.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Language, RawIssue};

/// Runs whatever rule-based tools apply to a language.
///
/// Running zero tools is valid and yields an empty list.
#[async_trait]
pub trait StaticAnalyzer: Send + Sync {
    async fn analyze(&self, code: &str, language: Language) -> DomainResult<Vec<RawIssue>>;
}

/// A single rule-based tool driven by the static-analysis dispatcher.
#[async_trait]
pub trait StaticTool: Send + Sync {
    /// Name used as the findings' source label.
    fn name(&self) -> &str;

    /// Whether this tool can analyze the given language.
    fn supports(&self, language: Language) -> bool;

    /// Analyze a snapshot file on disk.
    async fn run(&self, snapshot: &Path) -> DomainResult<Vec<RawIssue>>;
}
