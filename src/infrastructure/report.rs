//! JSON run reports.
//!
//! A report wraps a [`RunOutcome`] with the reviewed file name and the time
//! it was written. It is written atomically (temp file, then rename), so an
//! interrupted write never leaves a truncated report behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::RunOutcome;

/// Persisted form of one review run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// When the report was written
    pub generated_at: DateTime<Utc>,
    /// Reviewed file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Outcome of the run
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Report stamped with the current time.
    pub fn new(outcome: RunOutcome, file: Option<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            file,
            outcome,
        }
    }
}

/// Writes and reads run reports on disk.
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
}

impl ReportStore {
    /// Store writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File the store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the report atomically through a temporary file.
    pub async fn save(&self, report: &RunReport) -> Result<()> {
        let json =
            serde_json::to_string_pretty(report).context("Failed to serialize run report")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to move report into {}", self.path.display()))?;

        tracing::info!(
            path = %self.path.display(),
            run_id = %report.outcome.run_id,
            "Run report written"
        );
        Ok(())
    }

    /// Read a report written by [`ReportStore::save`].
    pub async fn load(&self) -> Result<RunReport> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed run report {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AnalysisConfig, AnalysisContext, SessionState, StopReason};

    fn outcome() -> RunOutcome {
        let mut state = SessionState::new(
            "x = 1",
            AnalysisConfig::default(),
            AnalysisContext::default(),
        );
        state.iteration = 2;
        state.into_outcome(StopReason::Stagnated { rounds: 2 })
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().join("reports").join("run.json"));
        let report = RunReport::new(outcome(), Some("app.py".to_string()));

        store.save(&report).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, report);
        assert!(!dir.path().join("reports").join("run.json.tmp").exists());
    }

    #[tokio::test]
    async fn report_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().join("run.json"));
        store.save(&RunReport::new(outcome(), None)).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["outcome"]["stop_reason"]["kind"], "stagnated");
        assert_eq!(raw["outcome"]["iterations"], 2);
        assert!(raw.get("file").is_none());
        assert!(raw["generated_at"].is_string());
    }

    #[tokio::test]
    async fn load_missing_report_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReportStore::new(dir.path().join("none.json"))
            .load()
            .await
            .is_err());
    }
}
