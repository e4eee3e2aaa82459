//! Implementation of the `coderefine review` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{output, CommandOutput};
use crate::cli::table::TableFormatter;
use crate::domain::models::{AnalysisContext, Config, Feedback, Language, RunOutcome};
use crate::infrastructure::collaborators;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::context::ProjectContext;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};
use crate::infrastructure::report::{ReportStore, RunReport};
use crate::services::{RefinementOrchestrator, StopSignal};

/// Remaining findings shown in human output
const ISSUE_ROWS: usize = 10;

/// Arguments for `coderefine review`
#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Source file to review
    pub file: PathBuf,

    /// Override analysis.max_iterations
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Override analysis.min_score_threshold
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Write the best code to this path instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// JSON file with feedback on earlier findings
    #[arg(long)]
    pub feedback: Option<PathBuf>,

    /// JSON file with project facts; merged over the detected project context
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// Project directory holding the .coderefine config directory and manifests
    #[arg(long)]
    pub project_dir: Option<PathBuf>,
}

/// Result of a review run as printed by the CLI
#[derive(Debug, serde::Serialize)]
pub struct ReviewOutput {
    /// Reviewed file as given on the command line
    pub file: String,
    /// Outcome of the run
    pub outcome: RunOutcome,
    /// Where the best code was written, if anywhere
    pub output_path: Option<PathBuf>,
    /// Where the JSON report was written, if anywhere
    pub report_path: Option<PathBuf>,
}

impl CommandOutput for ReviewOutput {
    fn to_human(&self) -> String {
        let outcome = &self.outcome;
        let formatter = TableFormatter::new();
        let mut lines = vec![
            format!("Reviewed {} (run {})", self.file, outcome.run_id),
            format!("Stopped: {}", outcome.stop_reason),
            match outcome.best_iteration {
                Some(iteration) => format!(
                    "Best score: {:.1} (round {iteration} of {})",
                    outcome.best_score, outcome.iterations
                ),
                None => format!(
                    "Best score: {:.1} (initial code, {} rounds)",
                    outcome.best_score, outcome.iterations
                ),
            },
        ];

        if let Some(last) = outcome.history.last_round() {
            lines.push(format!(
                "Last round: {:.1} with {} outstanding issues",
                last.score, last.issue_count
            ));
            lines.push(format!(
                "Issues fixed: {}",
                outcome.history.total_issues_fixed()
            ));
            lines.push(String::new());
            lines.push(formatter.format_rounds(outcome.history.rounds()));
        }

        if outcome.best_issues.is_empty() {
            lines.push("\nNo remaining issues".to_string());
        } else {
            lines.push(format!(
                "\nRemaining issues ({}):",
                outcome.best_issues.len()
            ));
            lines.push(formatter.format_issues(&outcome.best_issues, ISSUE_ROWS));
        }

        match &self.output_path {
            Some(path) => lines.push(format!("\nBest code written to {}", path.display())),
            None => {
                lines.push("\nBest code:".to_string());
                lines.push(outcome.best_code.clone());
            }
        }
        if let Some(path) = &self.report_path {
            lines.push(format!("Report written to {}", path.display()));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.outcome).unwrap_or_default()
    }
}

fn apply_overrides(config: &mut Config, args: &ReviewArgs) {
    if let Some(max_iterations) = args.max_iterations {
        config.analysis.max_iterations = max_iterations;
    }
    if let Some(min_score) = args.min_score {
        config.analysis.min_score_threshold = min_score;
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Malformed {what} file {}", path.display()))
}

/// Cancel the run at the next round boundary on Ctrl-C.
fn stop_on_ctrl_c(stop: StopSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current round");
            stop.request_stop();
        }
    });
}

/// Run a review and print the outcome.
pub async fn execute(args: ReviewArgs, json_mode: bool, explicit: Option<&Path>) -> Result<()> {
    let project_dir = super::project_root(args.project_dir.as_deref())?;
    let mut config = super::load_config(&project_dir, explicit)?;
    apply_overrides(&mut config, &args);
    ConfigLoader::validate(&config).context("Invalid command-line override")?;

    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))
        .context("Failed to initialize logging")?;

    let code = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let feedback: Vec<Feedback> = match &args.feedback {
        Some(path) => read_json(path, "feedback").await?,
        None => Vec::new(),
    };
    let explicit_context: serde_json::Value = match &args.context {
        Some(path) => read_json(path, "context").await?,
        None => serde_json::Value::Null,
    };
    let project = ProjectContext::detect(&project_dir)
        .await
        .merge_into(explicit_context);

    let file_name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let context = AnalysisContext {
        language: Language::from_path(&args.file),
        file_name: file_name.clone(),
        project,
    };

    let api_key = ConfigLoader::resolve_credential(&config.credentials)?;
    let collaborators =
        collaborators::from_config(&config, api_key).context("Collaborators are not configured")?;

    let stop = StopSignal::new();
    stop_on_ctrl_c(stop.clone());

    let orchestrator = RefinementOrchestrator::new(config, collaborators).with_stop_signal(stop);
    let outcome = orchestrator
        .run(code, context, feedback)
        .await
        .context("Review run failed")?;

    if let Some(path) = &args.output {
        tokio::fs::write(path, &outcome.best_code)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.report {
        ReportStore::new(path)
            .save(&RunReport::new(outcome.clone(), file_name))
            .await?;
    }

    let output_data = ReviewOutput {
        file: args.file.display().to_string(),
        outcome,
        output_path: args.output,
        report_path: args.report,
    };
    output(&output_data, json_mode);
    Ok(())
}
