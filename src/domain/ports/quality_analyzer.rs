//! Quality analyzer port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::{AnalysisContext, RawIssue};

/// Output of one quality analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Primary quality score, 0-100
    #[serde(default, deserialize_with = "crate::domain::models::lenient::score")]
    pub score: f64,
    /// Findings; items that are not objects are dropped individually
    #[serde(default, deserialize_with = "crate::domain::models::lenient::list")]
    pub issues: Vec<RawIssue>,
}

impl QualityReport {
    /// Report with a score and findings.
    pub fn new(score: f64, issues: Vec<RawIssue>) -> Self {
        Self { score, issues }
    }

    /// Score clamped into 0-100; NaN becomes 0.
    pub fn clamped_score(&self) -> f64 {
        if self.score.is_nan() {
            0.0
        } else {
            self.score.clamp(0.0, 100.0)
        }
    }
}

/// Scores a code artifact and reports findings.
///
/// Must be callable repeatedly on the same code; the orchestrator invokes it
/// both before and after the fix step of every round.
#[async_trait]
pub trait QualityAnalyzer: Send + Sync {
    async fn analyze(&self, code: &str, context: &AnalysisContext) -> DomainResult<QualityReport>;
}
