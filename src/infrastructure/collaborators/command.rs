//! Subprocess-backed collaborators.
//!
//! Each adapter runs a configured command, writes a JSON request to its
//! stdin and reads the reply from stdout. The API key, when present, is
//! exported to the child under the configured variable name.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::parsing::{extract_code_block, extract_json_payload, list_field};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    lenient, AnalysisContext, CommandSpec, Issue, RawIssue, RawSuggestion,
};
use crate::domain::ports::{
    CodeTransformer, Critic, OptimizationSuggester, QualityAnalyzer, QualityReport,
};

/// Credential forwarded to collaborator processes.
#[derive(Clone, Default)]
pub struct Credential {
    /// Variable the key is exported under
    pub env_var: String,
    /// The secret, if one was resolved
    pub value: Option<String>,
}

impl Credential {
    /// Credential exported under `env_var`.
    pub fn new(env_var: impl Into<String>, value: Option<String>) -> Self {
        Self {
            env_var: env_var.into(),
            value,
        }
    }

    /// Replace the secret with a marker wherever it occurs in `text`.
    fn redact(&self, text: &str) -> String {
        match self.value.as_deref() {
            Some(secret) if !secret.is_empty() => text.replace(secret, "[REDACTED]"),
            _ => text.to_string(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("env_var", &self.env_var)
            .field("present", &self.value.is_some())
            .finish()
    }
}

type ErrorKind = fn(String) -> DomainError;

/// Runs one collaborator command per request.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    role: &'static str,
    spec: CommandSpec,
    credential: Credential,
    error: ErrorKind,
}

impl CommandRunner {
    /// Runner reporting failures through `error`.
    pub fn new(
        role: &'static str,
        spec: CommandSpec,
        credential: Credential,
        error: ErrorKind,
    ) -> Self {
        Self {
            role,
            spec,
            credential,
            error,
        }
    }

    /// Role label sent in every request.
    pub fn role(&self) -> &'static str {
        self.role
    }

    /// Send a request and return the raw stdout of a successful run.
    pub async fn invoke(&self, request: &Value) -> DomainResult<String> {
        let payload = serde_json::to_vec(request)?;

        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref key) = self.credential.value {
            cmd.env(&self.credential.env_var, key);
        }

        tracing::debug!(
            role = self.role,
            program = %self.spec.program,
            request_bytes = payload.len(),
            "Invoking collaborator"
        );

        let mut child = cmd
            .spawn()
            .map_err(|e| (self.error)(format!("Failed to spawn {}: {e}", self.spec.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| (self.error)("Failed to get stdin handle".to_string()))?;
        let write_request = async move {
            let written = stdin.write_all(&payload).await;
            // Close stdin to signal end of input
            drop(stdin);
            written
        };

        // The request write counts against the timeout.
        let exchange = async {
            let (written, output) = tokio::join!(write_request, child.wait_with_output());
            match written {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err((self.error)(format!("Failed to write request: {e}")));
                }
                Err(_) => {
                    tracing::debug!(
                        role = self.role,
                        "Collaborator exited before reading the full request"
                    );
                }
                Ok(()) => {}
            }
            output.map_err(|e| (self.error)(format!("Failed to wait for process: {e}")))
        };

        let output = tokio::time::timeout(Duration::from_secs(self.spec.timeout_secs), exchange)
            .await
            .map_err(|_| DomainError::Timeout(self.spec.timeout_secs))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err((self.error)(format!(
                "{} exited with code {:?}. Stderr: {}",
                self.spec.program,
                output.status.code(),
                self.credential.redact(stderr.trim())
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn raw_issues(issues: &[Issue]) -> Vec<RawIssue> {
    issues.iter().map(Issue::to_raw).collect()
}

/// Quality analyzer backed by a command.
///
/// Request: `{"role": "quality", "code", "context"}`. Reply: `{"score",
/// "issues"}`, optionally inside a fenced JSON block.
pub struct CommandQualityAnalyzer {
    runner: CommandRunner,
}

impl CommandQualityAnalyzer {
    /// Adapter over the given command.
    pub fn new(spec: CommandSpec, credential: Credential) -> Self {
        Self {
            runner: CommandRunner::new(
                "quality",
                spec,
                credential,
                DomainError::QualityAnalyzerFailed,
            ),
        }
    }
}

#[async_trait]
impl QualityAnalyzer for CommandQualityAnalyzer {
    async fn analyze(&self, code: &str, context: &AnalysisContext) -> DomainResult<QualityReport> {
        let reply = self
            .runner
            .invoke(&json!({ "role": self.runner.role(), "code": code, "context": context }))
            .await?;

        let payload = extract_json_payload(&reply).ok_or_else(|| {
            DomainError::QualityAnalyzerFailed("Reply contained no JSON payload".to_string())
        })?;
        let report: QualityReport = serde_json::from_value(payload).map_err(|e| {
            DomainError::QualityAnalyzerFailed(format!("Malformed quality report: {e}"))
        })?;

        tracing::debug!(
            score = report.score,
            issue_count = report.issues.len(),
            "Quality analysis reply parsed"
        );
        Ok(report)
    }
}

/// Critic backed by a command.
///
/// Request: `{"role": "critic", "code", "issues"}`. Reply: a list of issues,
/// bare or under `improved_issues` / `issues`. A reply with no usable
/// findings keeps the input findings.
pub struct CommandCritic {
    runner: CommandRunner,
}

impl CommandCritic {
    /// Adapter over the given command.
    pub fn new(spec: CommandSpec, credential: Credential) -> Self {
        Self {
            runner: CommandRunner::new("critic", spec, credential, DomainError::CriticFailed),
        }
    }
}

#[async_trait]
impl Critic for CommandCritic {
    async fn refine(&self, code: &str, issues: &[Issue]) -> DomainResult<Vec<RawIssue>> {
        let input = raw_issues(issues);
        let reply = self
            .runner
            .invoke(&json!({ "role": self.runner.role(), "code": code, "issues": input }))
            .await?;

        let refined: Vec<RawIssue> = extract_json_payload(&reply)
            .and_then(|p| list_field(p, &["improved_issues", "issues"]))
            .map(lenient::items_of)
            .unwrap_or_default();

        // The critic re-ranks and re-explains; it never empties the list.
        if refined.is_empty() && !input.is_empty() {
            tracing::warn!("Critic reply held no usable findings; keeping input findings");
            return Ok(input);
        }
        Ok(refined)
    }
}

/// Critic that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCritic;

#[async_trait]
impl Critic for PassthroughCritic {
    async fn refine(&self, _code: &str, issues: &[Issue]) -> DomainResult<Vec<RawIssue>> {
        Ok(raw_issues(issues))
    }
}

/// Code transformer backed by a command.
///
/// Request: `{"role": "transformer", "code", "issues"}`. Reply: the new code,
/// bare or inside a fenced block.
pub struct CommandTransformer {
    runner: CommandRunner,
}

impl CommandTransformer {
    /// Adapter over the given command.
    pub fn new(spec: CommandSpec, credential: Credential) -> Self {
        Self {
            runner: CommandRunner::new(
                "transformer",
                spec,
                credential,
                DomainError::TransformerFailed,
            ),
        }
    }
}

#[async_trait]
impl CodeTransformer for CommandTransformer {
    async fn transform(&self, code: &str, issues: &[Issue]) -> DomainResult<Option<String>> {
        let reply = self
            .runner
            .invoke(&json!({
                "role": self.runner.role(),
                "code": code,
                "issues": raw_issues(issues),
            }))
            .await?;
        Ok(extract_code_block(&reply))
    }
}

/// Optimization suggester backed by a command.
///
/// Request: `{"role": "optimizer", "code"}`. Reply: a list of suggestions,
/// bare or under `suggestions`. An unparseable reply yields no suggestions.
pub struct CommandOptimizer {
    runner: CommandRunner,
}

impl CommandOptimizer {
    /// Adapter over the given command.
    pub fn new(spec: CommandSpec, credential: Credential) -> Self {
        Self {
            runner: CommandRunner::new("optimizer", spec, credential, DomainError::OptimizerFailed),
        }
    }
}

#[async_trait]
impl OptimizationSuggester for CommandOptimizer {
    async fn suggest(&self, code: &str) -> DomainResult<Vec<RawSuggestion>> {
        let reply = self
            .runner
            .invoke(&json!({ "role": self.runner.role(), "code": code }))
            .await?;

        match extract_json_payload(&reply).and_then(|p| list_field(p, &["suggestions"])) {
            Some(items) => Ok(lenient::items_of(items)),
            None => {
                tracing::warn!("Optimizer reply could not be parsed; no suggestions");
                Ok(Vec::new())
            }
        }
    }
}

/// Optimization suggester that never suggests anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOptimizer;

#[async_trait]
impl OptimizationSuggester for NoOptimizer {
    async fn suggest(&self, _code: &str) -> DomainResult<Vec<RawSuggestion>> {
        Ok(Vec::new())
    }
}
