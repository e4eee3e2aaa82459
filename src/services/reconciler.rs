//! Issue reconciliation across analyzers.
//!
//! Merges the findings of several analyzers into one deduplicated,
//! severity-escalated list. Two findings are the same finding iff they come
//! from different sources, sit on the same line and their normalized
//! descriptions are at least `similarity_threshold` alike.
//!
//! Matching is greedy and order-dependent only on input order: every
//! incoming finding joins the first earlier entry it matches, and an entry
//! absorbs at most one finding per source. The output is sorted most severe
//! first, then by line, with a stable sort over arrival order, so identical
//! input always yields identical output.

use std::collections::BTreeMap;

use serde::Serialize;
use similar::TextDiff;

use crate::domain::models::issue::normalize_text;
use crate::domain::models::{
    Category, Issue, IssueDefaults, IssueSource, RawIssue, ReconcilerConfig, Severity,
};

/// Separator used when two differing descriptions are combined.
const ADDITIONAL_SEPARATOR: &str = ". Additional: ";

/// Raw findings of one analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerOutput {
    /// Source assigned to findings that do not label themselves
    pub source: IssueSource,
    /// Findings in the order the analyzer reported them
    pub issues: Vec<RawIssue>,
}

impl AnalyzerOutput {
    /// Output of one analyzer.
    pub fn new(source: IssueSource, issues: Vec<RawIssue>) -> Self {
        Self { source, issues }
    }
}

/// Summary statistics of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationStats {
    /// Findings received, before merging
    pub received: usize,
    /// Findings in the output
    pub total: usize,
    /// Output findings confirmed by two or more sources
    pub merged: usize,
    /// Output findings per source label
    pub by_source: BTreeMap<String, usize>,
    /// Output findings at critical severity
    pub critical: usize,
    /// Output findings at high severity
    pub high: usize,
    /// Output findings at medium severity
    pub medium: usize,
    /// Output findings at low severity
    pub low: usize,
}

/// Reconciled findings plus statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Reconciled findings, most severe first
    pub issues: Vec<Issue>,
    /// Counts describing the merge
    pub stats: ReconciliationStats,
}

struct Entry {
    issue: Issue,
    /// Normalized first description, used for matching
    anchor: String,
    /// Normalized descriptions already folded into `issue.description`
    seen_descriptions: Vec<String>,
    sources: Vec<IssueSource>,
}

impl Entry {
    fn new(issue: Issue) -> Self {
        let anchor = issue.normalized_description();
        Self {
            anchor: anchor.clone(),
            seen_descriptions: vec![anchor],
            sources: vec![issue.source.clone()],
            issue,
        }
    }

    /// Fold a matching finding into this entry. Severity only escalates.
    fn absorb(&mut self, incoming: Issue) {
        let normalized = incoming.normalized_description();
        if !self.seen_descriptions.contains(&normalized) {
            self.issue.description.push_str(ADDITIONAL_SEPARATOR);
            self.issue.description.push_str(&incoming.description);
            self.seen_descriptions.push(normalized);
        }

        self.issue.severity = self.issue.severity.max(incoming.severity);
        self.issue.confidence = self.issue.confidence.max(incoming.confidence);
        if self.issue.suggestion.is_empty() {
            self.issue.suggestion = incoming.suggestion;
        }
        if self.issue.category == Category::General {
            self.issue.category = incoming.category;
        }
        self.issue.source = IssueSource::Merged;
        self.sources.push(incoming.source);
    }
}

/// Merges findings from multiple analyzers.
#[derive(Debug, Clone)]
pub struct IssueReconciler {
    similarity_threshold: f64,
    defaults: IssueDefaults,
}

impl Default for IssueReconciler {
    fn default() -> Self {
        Self::new(&ReconcilerConfig::default(), IssueDefaults::default())
    }
}

impl IssueReconciler {
    /// Reconciler using the configured threshold.
    pub fn new(config: &ReconcilerConfig, defaults: IssueDefaults) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            defaults,
        }
    }

    /// Create a reconciler with a custom similarity threshold
    pub fn with_threshold(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
            defaults: IssueDefaults::default(),
        }
    }

    /// Similarity threshold.
    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Normalize and reconcile raw analyzer outputs.
    pub fn reconcile(&self, outputs: Vec<AnalyzerOutput>) -> Reconciliation {
        let lists = outputs
            .into_iter()
            .map(|output| {
                output
                    .issues
                    .into_iter()
                    .map(|raw| Issue::from_raw(raw, output.source.clone(), &self.defaults))
                    .collect()
            })
            .collect();
        self.reconcile_issues(lists)
    }

    /// Reconcile already-normalized finding lists.
    pub fn reconcile_issues(&self, lists: Vec<Vec<Issue>>) -> Reconciliation {
        let mut entries: Vec<Entry> = Vec::new();
        let mut received = 0;

        for issue in lists.into_iter().flatten() {
            received += 1;
            match entries.iter_mut().find(|entry| self.matches(entry, &issue)) {
                Some(entry) => entry.absorb(issue),
                None => entries.push(Entry::new(issue)),
            }
        }

        let merged = entries.iter().filter(|e| e.sources.len() > 1).count();

        let mut issues: Vec<Issue> = entries.into_iter().map(|e| e.issue).collect();
        issues.sort_by_key(|issue| (issue.severity.rank(), issue.line));

        let stats = Self::stats(&issues, received, merged);
        tracing::info!(
            received = stats.received,
            total = stats.total,
            merged = stats.merged,
            critical = stats.critical,
            high = stats.high,
            medium = stats.medium,
            low = stats.low,
            "Issue reconciliation complete"
        );

        Reconciliation { issues, stats }
    }

    fn matches(&self, entry: &Entry, issue: &Issue) -> bool {
        entry.issue.line == issue.line
            && !entry.sources.contains(&issue.source)
            && description_similarity(&entry.anchor, &issue.description)
                >= self.similarity_threshold
    }

    fn stats(issues: &[Issue], received: usize, merged: usize) -> ReconciliationStats {
        let mut stats = ReconciliationStats {
            received,
            total: issues.len(),
            merged,
            ..Default::default()
        };
        for issue in issues {
            *stats.by_source.entry(issue.source.to_string()).or_default() += 1;
            match issue.severity {
                Severity::Critical => stats.critical += 1,
                Severity::High => stats.high += 1,
                Severity::Medium => stats.medium += 1,
                Severity::Low => stats.low += 1,
            }
        }
        stats
    }
}

/// Similarity ratio of two descriptions after trimming and lowercasing.
///
/// Symmetric, in [0, 1], and 1.0 for identical normalized text.
pub fn description_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a == b {
        return 1.0;
    }
    let forward = f64::from(TextDiff::from_chars(a.as_str(), b.as_str()).ratio());
    let backward = f64::from(TextDiff::from_chars(b.as_str(), a.as_str()).ratio());
    forward.max(backward)
}
