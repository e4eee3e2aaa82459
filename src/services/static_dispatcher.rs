//! Static analysis dispatcher.
//!
//! Runs every registered [`StaticTool`] that supports the code's language on a
//! bounded worker pool. Each tool gets its own temporary snapshot of the code
//! and runs under a timeout; a tool that fails or times out contributes zero
//! findings and never fails the dispatch.
//!
//! Results are deduplicated on (line, normalized description) and sorted by
//! (line, tool). Snapshots are removed when the tool finishes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tempfile::NamedTempFile;

use crate::domain::errors::DomainResult;
use crate::domain::models::issue::normalize_text;
use crate::domain::models::{Language, RawIssue, StaticAnalysisConfig};
use crate::domain::ports::{StaticAnalyzer, StaticTool};

/// Bounded, timeout-guarded runner for static tools.
pub struct StaticAnalysisDispatcher {
    tools: Vec<Arc<dyn StaticTool>>,
    max_workers: usize,
    tool_timeout: Duration,
}

impl StaticAnalysisDispatcher {
    /// Dispatcher over the given tools.
    pub fn new(tools: Vec<Arc<dyn StaticTool>>, config: &StaticAnalysisConfig) -> Self {
        Self {
            tools,
            max_workers: config.max_workers.max(1),
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
        }
    }

    /// Dispatcher with no tools; every analysis yields no findings.
    pub fn empty() -> Self {
        Self::new(Vec::new(), &StaticAnalysisConfig::default())
    }

    /// Override the per-tool timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Tool count.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Names of the tools that would run for a language.
    pub fn tools_for(&self, language: Language) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|tool| tool.supports(language))
            .map(|tool| tool.name())
            .collect()
    }

    async fn run_tool(
        &self,
        tool: Arc<dyn StaticTool>,
        code: &str,
        language: Language,
    ) -> Vec<RawIssue> {
        let name = tool.name().to_string();

        let snapshot = match write_snapshot(code, language).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Failed to write code snapshot");
                return Vec::new();
            }
        };

        let started = Instant::now();
        let result = tokio::time::timeout(self.tool_timeout, tool.run(snapshot.path())).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(issues)) => {
                tracing::debug!(
                    tool = %name,
                    issue_count = issues.len(),
                    elapsed_ms,
                    "Static tool complete"
                );
                issues
                    .into_iter()
                    .map(|issue| label_source(issue, &name))
                    .collect()
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %name, error = %e, elapsed_ms, "Static tool failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    tool = %name,
                    timeout_secs = self.tool_timeout.as_secs(),
                    "Static tool timed out"
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl StaticAnalyzer for StaticAnalysisDispatcher {
    async fn analyze(&self, code: &str, language: Language) -> DomainResult<Vec<RawIssue>> {
        let selected: Vec<Arc<dyn StaticTool>> = self
            .tools
            .iter()
            .filter(|tool| tool.supports(language))
            .cloned()
            .collect();

        if selected.is_empty() {
            tracing::debug!(language = %language, "No static tools for language");
            return Ok(Vec::new());
        }

        tracing::info!(
            language = %language,
            tool_count = selected.len(),
            max_workers = self.max_workers,
            "Running static analysis"
        );

        // `buffered` keeps results in tool registration order.
        let runs: Vec<_> = selected
            .into_iter()
            .map(|tool| self.run_tool(tool, code, language))
            .collect();
        let per_tool: Vec<Vec<RawIssue>> = stream::iter(runs)
            .buffered(self.max_workers)
            .collect()
            .await;

        let issues = dedup_and_sort(per_tool.into_iter().flatten().collect());
        tracing::info!(issue_count = issues.len(), "Static analysis complete");
        Ok(issues)
    }
}

async fn write_snapshot(code: &str, language: Language) -> std::io::Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("coderefine-")
        .suffix(language.extension())
        .tempfile()?;
    tokio::fs::write(file.path(), code).await?;
    Ok(file)
}

fn label_source(mut issue: RawIssue, tool: &str) -> RawIssue {
    if issue.source.as_deref().is_none_or(|s| s.trim().is_empty()) {
        issue.source = Some(tool.to_string());
    }
    issue
}

fn dedup_and_sort(issues: Vec<RawIssue>) -> Vec<RawIssue> {
    let mut seen = std::collections::HashSet::new();
    let mut unique: Vec<RawIssue> = issues
        .into_iter()
        .filter(|issue| {
            let key = (
                issue.line.unwrap_or(0),
                normalize_text(issue.description.as_deref().unwrap_or_default()),
            );
            seen.insert(key)
        })
        .collect();
    unique.sort_by(|a, b| {
        a.line
            .unwrap_or(0)
            .cmp(&b.line.unwrap_or(0))
            .then_with(|| a.source.cmp(&b.source))
    });
    unique
}
