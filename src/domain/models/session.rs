//! Review session domain model.
//!
//! A [`SessionState`] is created once per review run and threaded through
//! every round by the orchestrator, which is its only mutator. When the loop
//! terminates the state is folded into a [`RunOutcome`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::AnalysisConfig;
use super::history::RunHistory;
use super::issue::Issue;
use super::language::Language;
use super::scoring::{BestResult, ScoreHistory};

/// Phase of the refinement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    /// Before the first round
    Idle,
    /// Quality and static analysis
    Analyzing,
    /// Merging, criticizing and prioritizing findings
    Reconciling,
    /// Applying fixes
    Refactoring,
    /// Scoring the fixed code
    Reevaluating,
    /// Running the stop checks
    DecidingContinuation,
    /// Run finished
    Terminated,
}

impl RoundPhase {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Reconciling => "reconciling",
            Self::Refactoring => "refactoring",
            Self::Reevaluating => "reevaluating",
            Self::DecidingContinuation => "deciding_continuation",
            Self::Terminated => "terminated",
        }
    }

    /// Whether the run is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(&self) -> Vec<RoundPhase> {
        match self {
            Self::Idle => vec![Self::Analyzing],
            Self::Analyzing => vec![Self::Reconciling],
            Self::Reconciling => vec![Self::Refactoring],
            Self::Refactoring => vec![Self::Reevaluating],
            Self::Reevaluating => vec![Self::DecidingContinuation],
            Self::DecidingContinuation => vec![Self::Analyzing, Self::Terminated],
            Self::Terminated => vec![],
        }
    }

    /// Whether the state machine allows moving to `next`.
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run stopped. Checked in declaration order; the first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// The stop signal was raised
    UserRequested,
    /// The round limit was hit
    MaxIterations {
        /// Configured maximum
        limit: u32,
    },
    /// Nothing left to fix
    NoIssuesRemaining,
    /// Score and outstanding issues met the threshold
    QualityThresholdReached {
        /// Score of the last round
        score: f64,
        /// Weighted outstanding-issue score of the last round
        weighted_issue_score: f64,
    },
    /// Too many rounds without improvement
    Stagnated {
        /// Consecutive rounds without improvement
        rounds: u32,
    },
    /// Recent scores stopped moving
    Converged,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserRequested => f.write_str("User requested stop"),
            Self::MaxIterations { limit } => write!(f, "Reached max iterations ({limit})"),
            Self::NoIssuesRemaining => f.write_str("No issues remaining"),
            Self::QualityThresholdReached {
                score,
                weighted_issue_score,
            } => write!(
                f,
                "Quality threshold reached (score: {score:.1}, weighted issues: {weighted_issue_score:.1})"
            ),
            Self::Stagnated { rounds } => write!(f, "No improvement for {rounds} iterations"),
            Self::Converged => f.write_str("Quality scores have converged"),
        }
    }
}

/// User verdict on a previously reported finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Line the feedback refers to
    #[serde(default)]
    pub line: u32,
    /// Description of the finding as it was shown
    pub description: String,
    /// Whether the user accepted the finding
    pub accepted: bool,
}

/// Context forwarded to the quality analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Language of the reviewed code
    #[serde(default)]
    pub language: Language,
    /// Base name of the reviewed file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Free-form project facts (frameworks, conventions, dependencies)
    #[serde(default)]
    pub project: serde_json::Value,
}

/// Evolving state of one review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Identifier of the run
    pub run_id: Uuid,
    /// Current code artifact
    pub code: String,
    /// Rounds completed so far
    pub iteration: u32,
    /// Current state machine phase
    pub phase: RoundPhase,
    /// Best result so far
    pub best: BestResult,
    /// Recorded round scores
    pub scores: ScoreHistory,
    /// Stop criteria for the run
    pub criteria: AnalysisConfig,
    /// Per-round records and audit trail
    pub history: RunHistory,
    /// Set once the optimization pass produced code
    pub optimization_applied: bool,
    /// User feedback on earlier findings
    pub feedback: Vec<Feedback>,
    /// Context forwarded to the quality analyzer
    pub context: AnalysisContext,
    /// Outstanding findings after the previous round, used as fallback data
    pub last_issues: Vec<Issue>,
}

impl SessionState {
    /// Fresh session over the input code.
    pub fn new(
        code: impl Into<String>,
        criteria: AnalysisConfig,
        context: AnalysisContext,
    ) -> Self {
        let code = code.into();
        Self {
            run_id: Uuid::new_v4(),
            best: BestResult::initial(code.clone()),
            code,
            iteration: 0,
            phase: RoundPhase::Idle,
            scores: ScoreHistory::new(),
            criteria,
            history: RunHistory::new(),
            optimization_applied: false,
            feedback: Vec::new(),
            context,
            last_issues: Vec::new(),
        }
    }

    /// Set the feedback.
    #[must_use]
    pub fn with_feedback(mut self, feedback: Vec<Feedback>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Last known primary score, or the best one when no round has run.
    pub fn last_score(&self) -> f64 {
        self.scores.last().unwrap_or(self.best.score)
    }

    /// Fold the terminated session into its run output.
    pub fn into_outcome(self, stop_reason: StopReason) -> RunOutcome {
        RunOutcome {
            run_id: self.run_id,
            best_code: self.best.code,
            best_score: self.best.score,
            best_issues: self.best.issues,
            best_iteration: self.best.iteration,
            final_code: self.code,
            iterations: self.iteration,
            stop_reason,
            history: self.history,
        }
    }
}

/// Result of a review run.
///
/// `best_code` is the best artifact found, which is not necessarily the last
/// round's `final_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Identifier shared with the log output
    pub run_id: Uuid,
    /// Best code seen during the run
    pub best_code: String,
    /// Score of the best code
    pub best_score: f64,
    /// Outstanding findings of the best code
    pub best_issues: Vec<Issue>,
    /// Round that produced the best code; `None` if no round beat the input
    pub best_iteration: Option<u32>,
    /// Code left by the last round
    pub final_code: String,
    /// Rounds run
    pub iterations: u32,
    /// Why the run stopped
    pub stop_reason: StopReason,
    /// Per-round records and audit trail
    pub history: RunHistory,
}
