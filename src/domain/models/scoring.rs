//! Scoring and convergence evaluation.
//!
//! Two kinds of measurement drive the refinement loop:
//!
//! - the **primary score** (0-100) supplied by the quality analyzer, tracked
//!   in a [`ScoreHistory`] to detect improvement, stagnation and convergence;
//! - the **weighted outstanding score**, a severity- and category-weighted
//!   count of remaining findings. Lower is better; 0 means nothing is left.
//!
//! [`BestResult`] keeps the best round seen so far independently of the last
//! one, and [`prioritize`] orders findings before they reach the fix step.

use serde::{Deserialize, Serialize};

use super::config::{PriorityConfig, ScoreWeights};
use super::issue::{normalize_text, Issue};
use super::session::Feedback;

/// Number of trailing scores inspected by the convergence test.
pub const CONVERGENCE_WINDOW: usize = 3;

/// Weighted outstanding-issue score.
pub fn weighted_issue_score(issues: &[Issue], weights: &ScoreWeights) -> f64 {
    issues
        .iter()
        .map(|issue| weights.weight_of(issue.category, issue.severity))
        .sum()
}

/// Count of findings at high severity or above.
pub fn high_severity_count(issues: &[Issue]) -> usize {
    issues.iter().filter(|i| i.severity.is_high()).count()
}

/// Whether the trailing scores have flattened out.
///
/// True once at least [`CONVERGENCE_WINDOW`] scores exist and the spread of
/// the last window is strictly below `threshold`.
pub fn has_converged(scores: &[f64], threshold: f64) -> bool {
    if scores.len() < CONVERGENCE_WINDOW {
        return false;
    }
    let recent = &scores[scores.len() - CONVERGENCE_WINDOW..];
    let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = recent.iter().copied().fold(f64::INFINITY, f64::min);
    max - min < threshold
}

/// Rolling primary-score history with a stagnation counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistory {
    scores: Vec<f64>,
    stagnation_count: u32,
}

impl ScoreHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a round's primary score; returns whether it improved.
    ///
    /// A score improves iff it is strictly greater than the previous one. The
    /// first score has nothing to improve on and counts as stagnant.
    pub fn push(&mut self, score: f64) -> bool {
        let improved = self.scores.last().is_some_and(|prev| score > *prev);
        self.scores.push(score);
        if improved {
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }
        improved
    }

    /// Scores in the order they were recorded.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Most recent score.
    pub fn last(&self) -> Option<f64> {
        self.scores.last().copied()
    }

    /// Consecutive non-improving rounds.
    pub fn stagnation_count(&self) -> u32 {
        self.stagnation_count
    }

    /// Whether the last three scores lie within `threshold` of each other.
    pub fn has_converged(&self, threshold: f64) -> bool {
        has_converged(&self.scores, threshold)
    }
}

/// Best result seen so far in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestResult {
    /// Code of the best round, or the input before any round
    pub code: String,
    /// Score of the best code
    pub score: f64,
    /// Outstanding findings of the best code
    pub issues: Vec<Issue>,
    /// Round that produced it; `None` while it is still the input artifact
    pub iteration: Option<u32>,
}

impl BestResult {
    /// Seed with the run's input artifact.
    pub fn initial(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            score: 0.0,
            issues: Vec::new(),
            iteration: None,
        }
    }

    /// Whether a round result would replace the current best.
    ///
    /// Strictly higher score wins; an equal score wins only with strictly
    /// fewer outstanding issues. Recency never breaks a tie.
    pub fn is_beaten_by(&self, score: f64, issue_count: usize) -> bool {
        if self.iteration.is_none() {
            return true;
        }
        score > self.score || (score == self.score && issue_count < self.issues.len())
    }

    /// Replace the best with a round result when it is better.
    pub fn consider(&mut self, iteration: u32, code: &str, score: f64, issues: &[Issue]) -> bool {
        if !self.is_beaten_by(score, issues.len()) {
            return false;
        }
        self.code = code.to_string();
        self.score = score;
        self.issues = issues.to_vec();
        self.iteration = Some(iteration);
        true
    }
}

/// Assign priorities and order findings for the fix step.
///
/// Priority comes from severity. Findings whose normalized description
/// matches a rejected feedback entry are scaled by `rejected_factor` so they
/// sink to the back; they are never dropped. The sort is stable, so equal
/// priorities keep the reconciler's order.
pub fn prioritize(
    mut issues: Vec<Issue>,
    feedback: &[Feedback],
    config: &PriorityConfig,
) -> Vec<Issue> {
    let rejected: Vec<String> = feedback
        .iter()
        .filter(|fb| !fb.accepted)
        .map(|fb| normalize_text(&fb.description))
        .collect();

    for issue in &mut issues {
        let mut priority = config.base_for(issue.severity);
        if rejected.contains(&issue.normalized_description()) {
            priority *= config.rejected_factor;
        }
        issue.priority = priority;
    }

    issues.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    issues
}
