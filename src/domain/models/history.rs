//! Run history: the append-only record of one review run.
//!
//! Holds one [`RoundRecord`] per completed round plus a sequence of
//! [`AuditEntry`] notes written by the orchestrator phases (fallbacks,
//! decisions, stop reason). Entries are ordered by a logical sequence number;
//! nothing is ever removed or rewritten.

use serde::{Deserialize, Serialize};

use super::session::RoundPhase;

/// Immutable snapshot of one orchestration round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 1-based round index
    pub iteration: u32,
    /// Primary quality score after the round (0-100)
    pub score: f64,
    /// Outstanding findings after the round
    pub issue_count: usize,
    /// Findings addressed by this round's fix step
    pub issues_fixed: usize,
    /// Outstanding issues at severity high or above
    pub high_severity_count: usize,
    /// Weighted outstanding-issue score after the round
    pub weighted_issue_score: f64,
    /// Score strictly above the previous round's
    pub improved: bool,
    /// The optimization pass ran and was applied this round
    pub optimization_applied: bool,
    /// Suggestions offered by the optimization pass
    pub optimization_suggestions: usize,
    /// Best score of the run after this round
    pub best_score: f64,
    /// Transformer failed or returned nothing; code left unchanged
    pub transformer_fallback: bool,
}

/// Audit severity of a history note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    /// General information about a phase
    Info,
    /// An autonomous decision (best result, stop reason)
    Decision,
    /// A recovered collaborator failure
    Warning,
}

impl AuditLevel {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Decision => "decision",
            Self::Warning => "warning",
        }
    }
}

/// One note in the run's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the trail, starting at 0
    pub sequence: u64,
    /// Round the entry belongs to, 0 before the first round
    pub iteration: u32,
    /// Phase that produced the entry
    pub phase: RoundPhase,
    /// Entry level
    pub level: AuditLevel,
    /// Human-readable note
    pub message: String,
}

/// Append-only log of a run's rounds and audit notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    rounds: Vec<RoundRecord>,
    audit: Vec<AuditEntry>,
}

impl RunHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a round record.
    pub fn record_round(&mut self, record: RoundRecord) {
        debug_assert!(
            self.rounds
                .last()
                .is_none_or(|last| last.iteration < record.iteration),
            "round records must be appended in iteration order"
        );
        self.rounds.push(record);
    }

    /// Append an audit note.
    pub fn note(
        &mut self,
        iteration: u32,
        phase: RoundPhase,
        level: AuditLevel,
        message: impl Into<String>,
    ) {
        let sequence = self.audit.len() as u64;
        self.audit.push(AuditEntry {
            sequence,
            iteration,
            phase,
            level,
            message: message.into(),
        });
    }

    /// Rounds in the order they ran.
    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Audit entries in sequence order.
    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }

    /// Number of recorded rounds.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Whether no rounds were recorded.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// The most recently recorded round.
    pub fn last_round(&self) -> Option<&RoundRecord> {
        self.rounds.last()
    }

    /// Sum of issues fixed across all rounds.
    pub fn total_issues_fixed(&self) -> usize {
        self.rounds.iter().map(|r| r.issues_fixed).sum()
    }

    /// Warnings recorded for a given round.
    pub fn warnings_for(&self, iteration: u32) -> impl Iterator<Item = &AuditEntry> {
        self.audit
            .iter()
            .filter(move |e| e.iteration == iteration && e.level == AuditLevel::Warning)
    }
}
