//! Command-backed static analysis tool.
//!
//! Runs a configured linter against a snapshot file and parses its
//! `path:line[:col]: message` output lines. Linters conventionally exit
//! non-zero when they report findings, so the exit status is not treated as a
//! failure; only a spawn error is.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Language, RawIssue, Severity, StaticToolConfig};
use crate::domain::ports::StaticTool;

/// Placeholder in tool arguments replaced with the snapshot path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Static tool that shells out to a linter.
#[derive(Debug, Clone)]
pub struct CommandTool {
    name: String,
    program: String,
    args: Vec<String>,
    languages: Vec<Language>,
}

impl CommandTool {
    /// Tool described by a configuration entry.
    pub fn new(config: &StaticToolConfig) -> Self {
        Self {
            name: config.name.clone(),
            program: config.program.clone(),
            args: config.args.clone(),
            languages: config.languages.clone(),
        }
    }

    fn build_args(&self, snapshot: &Path) -> Vec<String> {
        let path = snapshot.to_string_lossy();
        if self.args.iter().any(|arg| arg.contains(FILE_PLACEHOLDER)) {
            self.args
                .iter()
                .map(|arg| arg.replace(FILE_PLACEHOLDER, &path))
                .collect()
        } else {
            let mut args = self.args.clone();
            args.push(path.into_owned());
            args
        }
    }

    /// Parse linter output into findings.
    fn parse_output(output: &str) -> Vec<RawIssue> {
        output.lines().filter_map(parse_line).collect()
    }
}

/// Parse one `path:line[:col]: message` line.
///
/// A leading `error:` / `warning:` style label in the message becomes the
/// finding's severity.
fn parse_line(line: &str) -> Option<RawIssue> {
    let mut parts = line.splitn(4, ':');
    let _path = parts.next()?;
    let line_no: i64 = parts.next()?.trim().parse().ok()?;
    let third = parts.next()?;
    let message = match parts.next() {
        Some(rest) if third.trim().parse::<u32>().is_ok() => rest.to_string(),
        Some(rest) => format!("{third}:{rest}"),
        None => third.to_string(),
    };

    let mut message = message.trim();
    let mut severity = None;
    if let Some((label, rest)) = message.split_once(':') {
        if let Some(parsed) = Severity::from_str(label) {
            severity = Some(parsed.as_str().to_string());
            message = rest.trim();
        }
    }
    if message.is_empty() {
        return None;
    }

    Some(RawIssue {
        line: Some(line_no),
        description: Some(message.to_string()),
        severity,
        ..Default::default()
    })
}

#[async_trait]
impl StaticTool for CommandTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, language: Language) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }

    async fn run(&self, snapshot: &Path) -> DomainResult<Vec<RawIssue>> {
        tracing::debug!(tool = %self.name, snapshot = %snapshot.display(), "Running static tool");

        let output = Command::new(&self.program)
            .args(self.build_args(snapshot))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                tracing::error!(tool = %self.name, error = %e, "Failed to spawn static tool");
                DomainError::StaticAnalysisFailed(format!("Failed to spawn {}: {e}", self.program))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Some linters write to stdout, others to stderr.
        let mut issues = Self::parse_output(&stdout);
        issues.extend(Self::parse_output(&stderr));

        tracing::debug!(
            tool = %self.name,
            exit_code = ?output.status.code(),
            issue_count = issues.len(),
            "Static tool finished"
        );
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(args: &[&str], languages: Vec<Language>) -> CommandTool {
        CommandTool::new(&StaticToolConfig {
            name: "lint".to_string(),
            program: "sh".to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            languages,
        })
    }

    #[test]
    fn parse_line_with_and_without_column() {
        let issue = parse_line("/tmp/a.py:12: Missing docstring").unwrap();
        assert_eq!(issue.line, Some(12));
        assert_eq!(issue.description.as_deref(), Some("Missing docstring"));

        let issue = parse_line("/tmp/a.py:3:7: E225 missing whitespace around operator").unwrap();
        assert_eq!(issue.line, Some(3));
        assert_eq!(
            issue.description.as_deref(),
            Some("E225 missing whitespace around operator")
        );
    }

    #[test]
    fn parse_line_keeps_colons_in_message() {
        let issue = parse_line("a.py:4: Use of eval: dangerous").unwrap();
        assert_eq!(issue.description.as_deref(), Some("Use of eval: dangerous"));
    }

    #[test]
    fn parse_line_reads_severity_label() {
        let issue = parse_line("main.c:9:2: warning: unused variable 'x'").unwrap();
        assert_eq!(issue.severity.as_deref(), Some("medium"));
        assert_eq!(issue.description.as_deref(), Some("unused variable 'x'"));
    }

    #[test]
    fn parse_line_rejects_noise() {
        assert!(parse_line("************* Module a").is_none());
        assert!(parse_line("Your code has been rated at 5.00/10").is_none());
        assert!(parse_line("a.py:12:").is_none());
    }

    #[test]
    fn placeholder_is_substituted_or_appended() {
        let path = Path::new("/tmp/snap.py");
        let with = tool(&["--format=parseable", "{file}"], vec![]);
        assert_eq!(
            with.build_args(path),
            vec!["--format=parseable", "/tmp/snap.py"]
        );
        let without = tool(&["-q"], vec![]);
        assert_eq!(without.build_args(path), vec!["-q", "/tmp/snap.py"]);
    }

    #[test]
    fn empty_language_list_supports_everything() {
        assert!(tool(&[], vec![]).supports(Language::Go));
        let python_only = tool(&[], vec![Language::Python]);
        assert!(python_only.supports(Language::Python));
        assert!(!python_only.supports(Language::Java));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_parses_both_streams_despite_exit_code() {
        let tool = tool(
            &[
                "-c",
                "echo \"$0:1: Unused import os\"; echo \"$0:5:3: error: undefined name\" >&2; exit 1",
                "{file}",
            ],
            vec![Language::Python],
        );
        let issues = tool.run(Path::new("/tmp/snapshot.py")).await.unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].line, Some(1));
        assert_eq!(issues[1].severity.as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let tool = CommandTool::new(&StaticToolConfig {
            name: "ghost".to_string(),
            program: "coderefine-no-such-linter".to_string(),
            args: vec![],
            languages: vec![],
        });
        let err = tool.run(Path::new("/tmp/x.py")).await.unwrap_err();
        assert!(matches!(err, DomainError::StaticAnalysisFailed(_)));
    }
}
