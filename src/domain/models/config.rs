//! Run configuration.
//!
//! Every field has a serde default, so partial YAML files and environment
//! overrides merge over the built-in values.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::issue::{Category, Severity};
use super::language::Language;

/// Main configuration structure for coderefine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Stopping thresholds for the refinement loop
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Category weights and severity multipliers for the weighted score
    #[serde(default)]
    pub weights: ScoreWeights,

    /// Cross-source issue matching
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Issue prioritization
    #[serde(default)]
    pub priority: PriorityConfig,

    /// Gate for the one-off optimization pass
    #[serde(default)]
    pub optimization: OptimizationConfig,

    /// Defaults applied while normalizing raw findings
    #[serde(default)]
    pub issue_defaults: IssueDefaults,

    /// Static-analysis dispatcher
    #[serde(default)]
    pub static_analysis: StaticAnalysisConfig,

    /// External collaborator commands
    #[serde(default)]
    pub collaborators: CollaboratorsConfig,

    /// Credential passed to collaborators
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Caller-supplied stopping thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisConfig {
    /// Primary score (0-100) at which the quality bar is met
    #[serde(default = "default_min_score_threshold")]
    pub min_score_threshold: f64,

    /// Hard limit on the number of rounds
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// High-severity findings tolerated when the quality bar is met
    #[serde(default)]
    pub max_high_severity_issues: usize,

    /// Consecutive non-improving rounds before stopping
    #[serde(default = "default_stagnation_threshold")]
    pub stagnation_threshold: u32,

    /// Max spread of the last three scores that counts as converged
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,
}

const fn default_min_score_threshold() -> f64 {
    90.0
}

const fn default_max_iterations() -> u32 {
    5
}

const fn default_stagnation_threshold() -> u32 {
    2
}

const fn default_convergence_threshold() -> f64 {
    2.0
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: default_min_score_threshold(),
            max_iterations: default_max_iterations(),
            max_high_severity_issues: 0,
            stagnation_threshold: default_stagnation_threshold(),
            convergence_threshold: default_convergence_threshold(),
        }
    }
}

/// Weights for the weighted outstanding-issue score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreWeights {
    /// Weight per issue category
    #[serde(default)]
    pub categories: CategoryWeights,
    /// Multiplier per severity
    #[serde(default)]
    pub severities: SeverityMultipliers,
}

impl ScoreWeights {
    /// Weight of a single finding.
    pub fn weight_of(&self, category: Category, severity: Severity) -> f64 {
        self.categories.get(category) * self.severities.get(severity)
    }
}

/// Category weights of the weighted outstanding-issue score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryWeights {
    /// Weight of security findings
    #[serde(default = "default_security_weight")]
    pub security: f64,
    /// Weight of bug findings
    #[serde(default = "default_bug_weight")]
    pub bug: f64,
    /// Weight of performance findings
    #[serde(default = "default_performance_weight")]
    pub performance: f64,
    /// Weight of style findings
    #[serde(default = "default_style_weight")]
    pub style: f64,
    /// Weight of uncategorized findings
    #[serde(default = "default_unit_weight")]
    pub general: f64,
}

const fn default_security_weight() -> f64 {
    2.0
}

const fn default_bug_weight() -> f64 {
    1.5
}

const fn default_performance_weight() -> f64 {
    1.2
}

const fn default_style_weight() -> f64 {
    0.8
}

const fn default_unit_weight() -> f64 {
    1.0
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            security: default_security_weight(),
            bug: default_bug_weight(),
            performance: default_performance_weight(),
            style: default_style_weight(),
            general: default_unit_weight(),
        }
    }
}

impl CategoryWeights {
    /// Weight of one category.
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Security => self.security,
            Category::Bug => self.bug,
            Category::Performance => self.performance,
            Category::Style => self.style,
            Category::General => self.general,
        }
    }
}

/// Severity multipliers of the weighted outstanding-issue score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SeverityMultipliers {
    /// Multiplier for critical findings
    #[serde(default = "default_critical_multiplier")]
    pub critical: f64,
    /// Multiplier for high findings
    #[serde(default = "default_high_multiplier")]
    pub high: f64,
    /// Multiplier for medium findings
    #[serde(default = "default_unit_weight")]
    pub medium: f64,
    /// Multiplier for low findings
    #[serde(default = "default_low_multiplier")]
    pub low: f64,
}

const fn default_critical_multiplier() -> f64 {
    2.0
}

const fn default_high_multiplier() -> f64 {
    1.5
}

const fn default_low_multiplier() -> f64 {
    0.5
}

impl Default for SeverityMultipliers {
    fn default() -> Self {
        Self {
            critical: default_critical_multiplier(),
            high: default_high_multiplier(),
            medium: default_unit_weight(),
            low: default_low_multiplier(),
        }
    }
}

impl SeverityMultipliers {
    /// Multiplier of one severity.
    pub fn get(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

/// Cross-source matching configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReconcilerConfig {
    /// Minimum description similarity ratio for two findings to merge
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

const fn default_similarity_threshold() -> f64 {
    0.8
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Priority assignment used to order issues before the fix step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PriorityConfig {
    /// Base priority of critical findings
    #[serde(default = "default_unit_weight")]
    pub critical: f64,
    /// Base priority of high findings
    #[serde(default = "default_high_priority")]
    pub high: f64,
    /// Base priority of medium findings
    #[serde(default = "default_medium_priority")]
    pub medium: f64,
    /// Base priority of low findings
    #[serde(default = "default_low_priority")]
    pub low: f64,

    /// Multiplier applied to issues the user previously rejected
    #[serde(default = "default_rejected_factor")]
    pub rejected_factor: f64,
}

const fn default_high_priority() -> f64 {
    0.9
}

const fn default_medium_priority() -> f64 {
    0.7
}

const fn default_low_priority() -> f64 {
    0.4
}

const fn default_rejected_factor() -> f64 {
    0.1
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            critical: default_unit_weight(),
            high: default_high_priority(),
            medium: default_medium_priority(),
            low: default_low_priority(),
            rejected_factor: default_rejected_factor(),
        }
    }
}

impl PriorityConfig {
    /// Base priority of a severity before feedback adjustment.
    pub fn base_for(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

/// Gate for the optimization sub-pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OptimizationConfig {
    /// Whether the optimization pass may run at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum primary score before optimizing
    #[serde(default = "default_optimization_min_score")]
    pub min_score: f64,

    /// Outstanding issues must have dropped to this fraction of the
    /// pre-round count
    #[serde(default = "default_issue_reduction_ratio")]
    pub issue_reduction_ratio: f64,
}

const fn default_true() -> bool {
    true
}

const fn default_optimization_min_score() -> f64 {
    75.0
}

const fn default_issue_reduction_ratio() -> f64 {
    0.5
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            min_score: default_optimization_min_score(),
            issue_reduction_ratio: default_issue_reduction_ratio(),
        }
    }
}

/// Defaults applied while normalizing findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IssueDefaults {
    /// Confidence for LLM-sourced findings without one
    #[serde(default = "default_llm_confidence")]
    pub llm_confidence: f64,

    /// Confidence for tool-sourced findings without one
    #[serde(default = "default_tool_confidence")]
    pub tool_confidence: f64,
}

const fn default_llm_confidence() -> f64 {
    0.9
}

const fn default_tool_confidence() -> f64 {
    0.8
}

impl Default for IssueDefaults {
    fn default() -> Self {
        Self {
            llm_confidence: default_llm_confidence(),
            tool_confidence: default_tool_confidence(),
        }
    }
}

/// Static-analysis dispatcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StaticAnalysisConfig {
    /// Tools run concurrently at most
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-tool timeout in seconds
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Tools to run; the presets are used when the key is absent
    #[serde(default = "StaticToolConfig::presets")]
    pub tools: Vec<StaticToolConfig>,
}

const fn default_max_workers() -> usize {
    3
}

const fn default_tool_timeout_secs() -> u64 {
    15
}

impl Default for StaticAnalysisConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            tool_timeout_secs: default_tool_timeout_secs(),
            tools: StaticToolConfig::presets(),
        }
    }
}

/// One command-backed static-analysis tool.
///
/// `{file}` in `args` is replaced with the path of the code snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StaticToolConfig {
    /// Name used as the finding source
    pub name: String,
    /// Executable, looked up on PATH
    pub program: String,
    /// Arguments; `{file}` is substituted or appended
    #[serde(default)]
    pub args: Vec<String>,
    /// Languages the tool understands; empty means all
    #[serde(default)]
    pub languages: Vec<Language>,
}

impl StaticToolConfig {
    fn preset(name: &str, args: &[&str], languages: &[Language]) -> Self {
        Self {
            name: name.to_string(),
            program: name.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            languages: languages.to_vec(),
        }
    }

    /// Built-in linters per language.
    ///
    /// Each writes `path:line[:col]: [severity:] message` lines. Presets whose
    /// program is not installed are skipped when the tools are built.
    pub fn presets() -> Vec<Self> {
        vec![
            Self::preset(
                "pylint",
                &[
                    "--disable=C0114,C0115,C0116",
                    "--score=n",
                    "--msg-template={path}:{line}:{column}: {category}: {msg} ({symbol})",
                    "{file}",
                ],
                &[Language::Python],
            ),
            Self::preset(
                "bandit",
                &[
                    "-q",
                    "-f",
                    "custom",
                    "--msg-template",
                    "{abspath}:{line}: high: [{test_id}] {msg}",
                    "{file}",
                ],
                &[Language::Python],
            ),
            Self::preset(
                "eslint",
                &[
                    "--no-eslintrc",
                    "--env",
                    "browser,node",
                    "--format",
                    "unix",
                    "{file}",
                ],
                &[Language::JavaScript, Language::TypeScript],
            ),
            Self::preset(
                "checkstyle",
                &["-c", "/google_checks.xml", "{file}"],
                &[Language::Java],
            ),
        ]
    }
}

/// External command used for a collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CommandSpec {
    /// Executable, looked up on PATH
    pub program: String,
    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
    /// Seconds before the process is killed
    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_command_timeout_secs() -> u64 {
    300
}

impl CommandSpec {
    /// Command with the default timeout.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout_secs: default_command_timeout_secs(),
        }
    }
}

/// Collaborator commands. `quality` and `transformer` are required to run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CollaboratorsConfig {
    /// Quality analyzer command (required)
    #[serde(default)]
    pub quality: Option<CommandSpec>,
    /// Critic command; findings pass through unchanged without one
    #[serde(default)]
    pub critic: Option<CommandSpec>,
    /// Code transformer command (required)
    #[serde(default)]
    pub transformer: Option<CommandSpec>,
    /// Optimization suggester command
    #[serde(default)]
    pub optimizer: Option<CommandSpec>,
}

/// Credential configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CredentialsConfig {
    /// Environment variable holding the API key forwarded to collaborators
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Whether a missing key aborts the run
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_api_key_env() -> String {
    "CODEREFINE_API_KEY".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            required: default_true(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
