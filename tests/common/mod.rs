//! Common test utilities for integration tests
//!
//! Fake collaborators with scripted behavior and call counters, plus a
//! config preset that needs no credentials and never touches the network.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use coderefine::domain::errors::{DomainError, DomainResult};
use coderefine::domain::models::{
    AnalysisContext, Config, Issue, Language, RawIssue, RawSuggestion,
};
use coderefine::domain::ports::{
    CodeTransformer, Critic, OptimizationSuggester, QualityAnalyzer, QualityReport, StaticAnalyzer,
};
use coderefine::infrastructure::collaborators::{NoOptimizer, PassthroughCritic};
use coderefine::services::Collaborators;

/// Environment variable no test ever sets
pub const UNSET_KEY_ENV: &str = "CODEREFINE_TEST_UNSET_KEY_5C91";

/// Config for orchestrator tests: no credential needed, no optimization.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.credentials.api_key_env = UNSET_KEY_ENV.to_string();
    config.credentials.required = false;
    config.optimization.enabled = false;
    config
}

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn issue(line: i64, description: &str) -> RawIssue {
    RawIssue::new(line, description)
}

/// `count` low-severity findings on consecutive lines.
pub fn low_issues(count: usize) -> Vec<RawIssue> {
    (0..count)
        .map(|i| issue(i as i64 + 1, &format!("Minor naming issue {i}")).with_severity("low"))
        .collect()
}

pub fn python_context() -> AnalysisContext {
    AnalysisContext {
        language: Language::Python,
        file_name: Some("app.py".to_string()),
        project: serde_json::Value::Null,
    }
}

/// Quality analyzer that scores code by exact content.
///
/// Unknown code gets the fallback report.
pub struct MapQuality {
    reports: HashMap<String, QualityReport>,
    fallback: QualityReport,
    calls: AtomicUsize,
}

impl MapQuality {
    pub fn new(fallback_score: f64, fallback_issues: Vec<RawIssue>) -> Self {
        Self {
            reports: HashMap::new(),
            fallback: QualityReport::new(fallback_score, fallback_issues),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn on(mut self, code: &str, score: f64, issues: Vec<RawIssue>) -> Self {
        self.reports
            .insert(code.to_string(), QualityReport::new(score, issues));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QualityAnalyzer for MapQuality {
    async fn analyze(&self, code: &str, _context: &AnalysisContext) -> DomainResult<QualityReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .reports
            .get(code)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

pub struct FailingQuality;

#[async_trait]
impl QualityAnalyzer for FailingQuality {
    async fn analyze(
        &self,
        _code: &str,
        _context: &AnalysisContext,
    ) -> DomainResult<QualityReport> {
        Err(DomainError::QualityAnalyzerFailed(
            "model unavailable".to_string(),
        ))
    }
}

/// One scripted transformer reply.
#[derive(Debug, Clone)]
pub enum Step {
    Code(String),
    Empty,
    Fail,
}

pub fn code(text: &str) -> Step {
    Step::Code(text.to_string())
}

/// Transformer replaying a script; replies `Empty` once it runs out.
pub struct ScriptedTransformer {
    steps: Mutex<VecDeque<Step>>,
    received: Mutex<Vec<Vec<Issue>>>,
    calls: AtomicUsize,
}

impl ScriptedTransformer {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            received: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Issue lists passed to each call, in call order.
    pub fn received(&self) -> Vec<Vec<Issue>> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeTransformer for ScriptedTransformer {
    async fn transform(&self, _code: &str, issues: &[Issue]) -> DomainResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(issues.to_vec());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Empty);
        match step {
            Step::Code(code) => Ok(Some(code)),
            Step::Empty => Ok(None),
            Step::Fail => Err(DomainError::TransformerFailed("rate limited".to_string())),
        }
    }
}

/// Static analyzer returning the same findings for every call.
pub struct FixedStatic {
    issues: Vec<RawIssue>,
}

impl FixedStatic {
    pub fn new(issues: Vec<RawIssue>) -> Self {
        Self { issues }
    }

    pub fn none() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl StaticAnalyzer for FixedStatic {
    async fn analyze(&self, _code: &str, _language: Language) -> DomainResult<Vec<RawIssue>> {
        Ok(self.issues.clone())
    }
}

pub struct FailingStatic;

#[async_trait]
impl StaticAnalyzer for FailingStatic {
    async fn analyze(&self, _code: &str, _language: Language) -> DomainResult<Vec<RawIssue>> {
        Err(DomainError::StaticAnalysisFailed(
            "pylint crashed".to_string(),
        ))
    }
}

pub struct FailingCritic;

#[async_trait]
impl Critic for FailingCritic {
    async fn refine(&self, _code: &str, _issues: &[Issue]) -> DomainResult<Vec<RawIssue>> {
        Err(DomainError::CriticFailed("malformed reply".to_string()))
    }
}

/// Optimizer returning fixed suggestions and counting calls.
pub struct CountingOptimizer {
    suggestions: Vec<RawSuggestion>,
    calls: AtomicUsize,
}

impl CountingOptimizer {
    pub fn new(count: usize) -> Self {
        let suggestions = (0..count)
            .map(|i| RawSuggestion {
                line: Some(i as i64 + 1),
                description: Some(format!("Cache result {i}")),
                suggestion: Some("memoize".to_string()),
            })
            .collect();
        Self {
            suggestions,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OptimizationSuggester for CountingOptimizer {
    async fn suggest(&self, _code: &str) -> DomainResult<Vec<RawSuggestion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.suggestions.clone())
    }
}

/// Collaborators with no static findings, a passthrough critic and no optimizer.
pub fn collaborators(
    quality: Arc<dyn QualityAnalyzer>,
    transformer: Arc<dyn CodeTransformer>,
) -> Collaborators {
    Collaborators {
        quality,
        static_analyzer: Arc::new(FixedStatic::none()),
        critic: Arc::new(PassthroughCritic),
        transformer,
        optimizer: Arc::new(NoOptimizer),
    }
}

/// Write a file, creating parent directories.
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
