//! Issue domain model.
//!
//! An [`Issue`] is one finding about the code under review. Analyzers return
//! the lenient [`RawIssue`] wire shape; it is normalized exactly once, at
//! ingestion, into a fully populated `Issue` so that reconciliation and
//! scoring never deal with absent fields.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::IssueDefaults;
use super::lenient;

/// Description used when an analyzer reports a finding without any text.
pub const UNSPECIFIED_DESCRIPTION: &str = "Unspecified issue";

const SECURITY_KEYWORDS: &[&str] = &[
    "security",
    "vulnerability",
    "injection",
    "xss",
    "csrf",
    "hardcode",
];
const PERFORMANCE_KEYWORDS: &[&str] = &["performance", "slow", "inefficient", "loop", "complexity"];
const STYLE_KEYWORDS: &[&str] = &["style", "formatting", "convention", "naming"];
const BUG_KEYWORDS: &[&str] = &["bug", "error", "exception", "null", "undefined"];

/// Severity of a finding.
///
/// Variants are declared in ascending order so the derived `Ord` gives
/// `Critical > High > Medium > Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Cosmetic or advisory
    Low,
    /// Worth fixing
    #[default]
    Medium,
    /// Likely defect or risk
    High,
    /// Must be fixed
    Critical,
}

impl Severity {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Lenient parse covering the labels LLMs and common linters emit.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" | "blocker" | "fatal" => Some(Self::Critical),
            "high" | "major" | "error" => Some(Self::High),
            "medium" | "moderate" | "warning" => Some(Self::Medium),
            "low" | "minor" | "info" | "convention" | "refactor" => Some(Self::Low),
            _ => None,
        }
    }

    /// Sort rank, 0 for the most severe.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Whether this severity counts towards the high-severity limit.
    pub fn is_high(&self) -> bool {
        *self >= Self::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a finding, used for weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Security weakness
    Security,
    /// Slow or wasteful code
    Performance,
    /// Formatting and naming
    Style,
    /// Incorrect behavior
    Bug,
    /// Anything else
    #[default]
    General,
}

impl Category {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Style => "style",
            Self::Bug => "bug",
            Self::General => "general",
        }
    }

    /// Parse a label case-insensitively.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "security" => Some(Self::Security),
            "performance" => Some(Self::Performance),
            "style" => Some(Self::Style),
            "bug" => Some(Self::Bug),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    /// Infer a category from free text.
    ///
    /// Case-insensitive substring search; the first vocabulary that matches
    /// wins, in the order security, performance, style, bug.
    pub fn classify(description: &str) -> Self {
        let lowered = description.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

        if matches(SECURITY_KEYWORDS) {
            Self::Security
        } else if matches(PERFORMANCE_KEYWORDS) {
            Self::Performance
        } else if matches(STYLE_KEYWORDS) {
            Self::Style
        } else if matches(BUG_KEYWORDS) {
            Self::Bug
        } else {
            Self::General
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a finding came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    /// The LLM-backed quality analyzer
    Quality,
    /// A static-analysis tool, by name
    Tool(String),
    /// Added or rewritten by the critic pass
    Critic,
    /// Produced by the optimization suggester
    Optimization,
    /// Confirmed by at least two analyzers
    Merged,
}

impl IssueSource {
    /// Parse a provenance label as found in analyzer output.
    ///
    /// Unknown labels are treated as tool names.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_lowercase().as_str() {
            "quality" | "ai" | "llm" => Self::Quality,
            "critic" => Self::Critic,
            "optimization" => Self::Optimization,
            "merged" | "both" => Self::Merged,
            lowered => {
                let name = if lowered.starts_with("tool:") {
                    trimmed.get("tool:".len()..).map_or(trimmed, str::trim)
                } else {
                    trimmed
                };
                Self::Tool(name.to_string())
            }
        }
    }

    /// Whether findings from this source come from an LLM.
    pub fn is_llm(&self) -> bool {
        matches!(self, Self::Quality | Self::Critic | Self::Merged)
    }
}

impl fmt::Display for IssueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quality => f.write_str("quality"),
            Self::Tool(name) => write!(f, "tool:{name}"),
            Self::Critic => f.write_str("critic"),
            Self::Optimization => f.write_str("optimization"),
            Self::Merged => f.write_str("merged"),
        }
    }
}

/// A finding as returned by an analyzer; every field is optional.
///
/// Fields are read leniently: quoted numbers are accepted and values of the
/// wrong shape become `None` instead of failing the whole reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    /// 1-based line, as reported
    #[serde(
        default,
        deserialize_with = "lenient::integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub line: Option<i64>,

    #[serde(
        default,
        alias = "issue",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    /// Finding text; `issue` is accepted as an alias
    pub description: Option<String>,

    /// Proposed fix
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub suggestion: Option<String>,

    /// Severity label, parsed leniently during normalization
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<String>,

    /// Confidence in [0, 1]
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,

    /// Category label; inferred from the text when absent
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,

    /// Provenance label, for example `tool:pylint`
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
}

impl RawIssue {
    /// Convenience constructor for a line-anchored finding.
    pub fn new(line: i64, description: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    /// Attach a severity label.
    #[must_use]
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    /// Attach a suggested fix.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach a confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach a provenance label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Optimization suggestion as returned by the optimization suggester.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSuggestion {
    /// Line the suggestion applies to
    #[serde(default, deserialize_with = "lenient::integer")]
    pub line: Option<i64>,
    /// What could be faster or simpler
    #[serde(default, alias = "issue", deserialize_with = "lenient::text")]
    pub description: Option<String>,
    /// Proposed change
    #[serde(default, deserialize_with = "lenient::text")]
    pub suggestion: Option<String>,
}

/// A fully populated finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// 1-based line, 0 for file-level findings
    pub line: u32,
    /// Finding text, never empty
    pub description: String,
    /// Proposed fix; may be empty
    pub suggestion: String,
    /// Normalized severity
    pub severity: Severity,
    /// Reported confidence in [0, 1]
    pub confidence: f64,
    /// Normalized category
    pub category: Category,
    /// Analyzer that reported the finding
    pub source: IssueSource,
    /// Ordering weight assigned during prioritization
    #[serde(default)]
    pub priority: f64,
}

impl Issue {
    /// Normalize a raw finding.
    ///
    /// `fallback_source` is used when the raw issue carries no provenance
    /// label. Missing or malformed fields are defaulted, never rejected.
    pub fn from_raw(raw: RawIssue, fallback_source: IssueSource, defaults: &IssueDefaults) -> Self {
        let source = raw
            .source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map_or(fallback_source, IssueSource::parse);

        let description = raw
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| UNSPECIFIED_DESCRIPTION.to_string());

        let severity = raw
            .severity
            .as_deref()
            .and_then(Severity::from_str)
            .unwrap_or_else(|| default_severity(&description));

        let default_confidence = if source.is_llm() {
            defaults.llm_confidence
        } else {
            defaults.tool_confidence
        };
        let confidence = raw
            .confidence
            .filter(|c| c.is_finite())
            .map_or(default_confidence, |c| c.clamp(0.0, 1.0));

        let category = raw
            .category
            .as_deref()
            .and_then(Category::from_str)
            .unwrap_or_else(|| Category::classify(&description));

        let line = raw
            .line
            .map_or(0, |l| u32::try_from(l.max(0)).unwrap_or(u32::MAX));

        Self {
            line,
            description,
            suggestion: raw.suggestion.unwrap_or_default().trim().to_string(),
            severity,
            confidence,
            category,
            source,
            priority: 0.0,
        }
    }

    /// Description as used for similarity and rejection matching.
    pub fn normalized_description(&self) -> String {
        normalize_text(&self.description)
    }

    /// Convert back to the wire shape, e.g. for the critic or transformer.
    pub fn to_raw(&self) -> RawIssue {
        RawIssue {
            line: Some(i64::from(self.line)),
            description: Some(self.description.clone()),
            suggestion: Some(self.suggestion.clone()),
            severity: Some(self.severity.as_str().to_string()),
            confidence: Some(self.confidence),
            category: Some(self.category.as_str().to_string()),
            source: Some(self.source.to_string()),
        }
    }
}

/// Trim and lowercase text for comparison.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

fn default_severity(description: &str) -> Severity {
    if Category::classify(description) == Category::Security {
        Severity::High
    } else {
        Severity::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> IssueDefaults {
        IssueDefaults::default()
    }

    #[test]
    fn severity_total_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::Critical.max(Severity::Low), Severity::Critical);
    }

    #[test]
    fn severity_lenient_parse() {
        assert_eq!(Severity::from_str(" HIGH "), Some(Severity::High));
        assert_eq!(Severity::from_str("warning"), Some(Severity::Medium));
        assert_eq!(Severity::from_str("convention"), Some(Severity::Low));
        assert_eq!(Severity::from_str("catastrophic"), None);
    }

    #[test]
    fn classify_first_match_wins() {
        // "loop" is a performance keyword but security is checked first
        assert_eq!(
            Category::classify("SQL injection inside a loop"),
            Category::Security
        );
        assert_eq!(
            Category::classify("Inefficient loop"),
            Category::Performance
        );
        assert_eq!(Category::classify("Naming convention"), Category::Style);
        assert_eq!(
            Category::classify("Possible null dereference"),
            Category::Bug
        );
        assert_eq!(Category::classify("Missing docstring"), Category::General);
    }

    #[test]
    fn from_raw_defaults_everything() {
        let issue = Issue::from_raw(RawIssue::default(), IssueSource::Quality, &defaults());

        assert_eq!(issue.line, 0);
        assert_eq!(issue.description, UNSPECIFIED_DESCRIPTION);
        assert_eq!(issue.suggestion, "");
        assert_eq!(issue.severity, Severity::Medium);
        assert!((issue.confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(issue.category, Category::General);
        assert_eq!(issue.source, IssueSource::Quality);
    }

    #[test]
    fn from_raw_security_language_defaults_high() {
        let raw = RawIssue::new(4, "Hardcoded password is a security risk");
        let issue = Issue::from_raw(raw, IssueSource::Tool("bandit".into()), &defaults());

        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.category, Category::Security);
        assert!((issue.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn from_raw_clamps_and_respects_explicit_fields() {
        let raw = RawIssue {
            line: Some(-3),
            description: Some("  unused variable  ".into()),
            severity: Some("low".into()),
            confidence: Some(1.7),
            category: Some("style".into()),
            source: Some("tool:pylint".into()),
            ..Default::default()
        };
        let issue = Issue::from_raw(raw, IssueSource::Quality, &defaults());

        assert_eq!(issue.line, 0);
        assert_eq!(issue.description, "unused variable");
        assert_eq!(issue.severity, Severity::Low);
        assert!((issue.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(issue.category, Category::Style);
        assert_eq!(issue.source, IssueSource::Tool("pylint".into()));
    }

    #[test]
    fn from_raw_nan_confidence_uses_default() {
        let raw = RawIssue::new(1, "x").with_confidence(f64::NAN);
        let issue = Issue::from_raw(raw, IssueSource::Tool("eslint".into()), &defaults());
        assert!((issue.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn raw_issue_accepts_issue_alias() {
        let raw: RawIssue = serde_json::from_str(r#"{"line": 7, "issue": "Slow query"}"#).unwrap();
        assert_eq!(raw.description.as_deref(), Some("Slow query"));
    }

    #[test]
    fn source_labels_round_trip_through_display() {
        for source in [
            IssueSource::Quality,
            IssueSource::Critic,
            IssueSource::Optimization,
            IssueSource::Merged,
            IssueSource::Tool("pylint".into()),
        ] {
            assert_eq!(IssueSource::parse(&source.to_string()), source);
        }
        assert_eq!(IssueSource::parse("AI"), IssueSource::Quality);
        assert_eq!(
            IssueSource::parse("bandit"),
            IssueSource::Tool("bandit".into())
        );
    }

    #[test]
    fn tool_names_keep_case_with_or_without_prefix() {
        assert_eq!(
            IssueSource::parse("tool:PyLint"),
            IssueSource::Tool("PyLint".into())
        );
        assert_eq!(
            IssueSource::parse("PyLint"),
            IssueSource::Tool("PyLint".into())
        );
        assert_eq!(
            IssueSource::parse(" TOOL: eslint "),
            IssueSource::Tool("eslint".into())
        );
    }
}
