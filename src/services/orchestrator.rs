//! Refinement orchestrator.
//!
//! Drives a review run as an explicit state machine:
//!
//! ```text
//! Idle -> Analyzing -> Reconciling -> Refactoring -> Reevaluating
//!      -> DecidingContinuation -> (Analyzing | Terminated)
//! ```
//!
//! Each phase has its own method. Collaborator failures are recovered inside
//! the phase that saw them and recorded in the run's audit trail; only
//! configuration errors abort a run, and they do so before the first round.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::scoring::{high_severity_count, prioritize, weighted_issue_score};
use crate::domain::models::{
    AnalysisContext, AuditLevel, Config, Feedback, Issue, IssueSource, RawIssue, RoundPhase,
    RoundRecord, RunOutcome, SessionState, StopReason,
};
use crate::domain::ports::{
    CodeTransformer, Critic, OptimizationSuggester, QualityAnalyzer, StaticAnalyzer,
};
use crate::infrastructure::config::ConfigLoader;
use crate::services::reconciler::IssueReconciler;

/// Cooperative stop flag shared between the caller and a running review.
///
/// Checked once per round, at the continuation decision.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Signal that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at the next continuation decision.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// External collaborators used by the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    /// Quality analyzer used before and after each fix
    pub quality: Arc<dyn QualityAnalyzer>,
    /// Static dispatcher or a substitute
    pub static_analyzer: Arc<dyn StaticAnalyzer>,
    /// Refinement pass over reconciled findings
    pub critic: Arc<dyn Critic>,
    /// Applies fixes to the code
    pub transformer: Arc<dyn CodeTransformer>,
    /// Suggests optimizations once the code is clean enough
    pub optimizer: Arc<dyn OptimizationSuggester>,
}

/// Findings gathered in the analyzing phase.
struct Analysis {
    score: f64,
    quality: Vec<Issue>,
    static_findings: Vec<Issue>,
}

/// Result of the refactoring phase.
struct Refactor {
    code: String,
    fallback: bool,
}

/// Result of the reevaluating phase, optimization included.
struct Evaluation {
    code: String,
    score: f64,
    issues: Vec<Issue>,
    high_severity_count: usize,
    weighted_issue_score: f64,
    optimization_ran: bool,
    optimization_suggestions: usize,
}

/// Drives iterative refinement of one code artifact.
pub struct RefinementOrchestrator {
    config: Config,
    collaborators: Collaborators,
    reconciler: IssueReconciler,
    stop: StopSignal,
}

impl RefinementOrchestrator {
    /// Orchestrator over a configuration and its collaborators.
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let reconciler = IssueReconciler::new(&config.reconciler, config.issue_defaults.clone());
        Self {
            config,
            collaborators,
            reconciler,
            stop: StopSignal::new(),
        }
    }

    /// Use an externally owned stop signal.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Handle for stopping the run from another task.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Configuration the orchestrator validated.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the refinement loop until a stop condition holds.
    ///
    /// Returns a configuration error before any round runs when the config
    /// is invalid or a required credential is missing. Every other failure
    /// is recovered and the run always ends with a [`RunOutcome`].
    pub async fn run(
        &self,
        initial_code: impl Into<String>,
        context: AnalysisContext,
        feedback: Vec<Feedback>,
    ) -> DomainResult<RunOutcome> {
        ConfigLoader::validate(&self.config)?;
        ConfigLoader::resolve_credential(&self.config.credentials)?;

        let mut state = SessionState::new(initial_code, self.config.analysis.clone(), context)
            .with_feedback(feedback);

        tracing::info!(
            run_id = %state.run_id,
            language = %state.context.language,
            max_iterations = state.criteria.max_iterations,
            min_score = state.criteria.min_score_threshold,
            "Starting refinement run"
        );

        loop {
            state.iteration += 1;
            let iteration = state.iteration;

            Self::transition(&mut state, RoundPhase::Analyzing)?;
            let analysis = self.analyze(&mut state).await;

            Self::transition(&mut state, RoundPhase::Reconciling)?;
            let issues = self
                .reconcile(&mut state, analysis.quality, analysis.static_findings)
                .await;
            let pre_round_count = issues.len();

            Self::transition(&mut state, RoundPhase::Refactoring)?;
            let refactor = self.refactor(&mut state, &issues).await;

            Self::transition(&mut state, RoundPhase::Reevaluating)?;
            let evaluation = self
                .reevaluate(
                    &mut state,
                    refactor.code,
                    analysis.score,
                    issues,
                    pre_round_count,
                )
                .await;

            Self::transition(&mut state, RoundPhase::DecidingContinuation)?;
            let issues_fixed = if refactor.fallback {
                0
            } else {
                pre_round_count.saturating_sub(evaluation.issues.len())
            };
            self.record_round(&mut state, &evaluation, issues_fixed, refactor.fallback);

            tracing::info!(
                run_id = %state.run_id,
                iteration,
                score = evaluation.score,
                issue_count = evaluation.issues.len(),
                issues_fixed,
                weighted_issue_score = evaluation.weighted_issue_score,
                best_score = state.best.score,
                "Round complete"
            );

            if let Some(reason) = self.check_stop(&state, &evaluation) {
                Self::transition(&mut state, RoundPhase::Terminated)?;
                state.history.note(
                    iteration,
                    RoundPhase::Terminated,
                    AuditLevel::Decision,
                    reason.to_string(),
                );
                tracing::info!(
                    run_id = %state.run_id,
                    iterations = iteration,
                    best_score = state.best.score,
                    stop_reason = %reason,
                    "Refinement run stopped"
                );
                return Ok(state.into_outcome(reason));
            }
        }
    }

    fn transition(state: &mut SessionState, next: RoundPhase) -> DomainResult<()> {
        if !state.phase.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: state.phase.to_string(),
                to: next.to_string(),
            });
        }
        tracing::trace!(from = %state.phase, to = %next, "Phase transition");
        state.phase = next;
        Ok(())
    }

    /// Quality and static analysis of the current code, run concurrently.
    async fn analyze(&self, state: &mut SessionState) -> Analysis {
        let iteration = state.iteration;
        let (quality, static_result) = tokio::join!(
            self.collaborators
                .quality
                .analyze(&state.code, &state.context),
            self.collaborators
                .static_analyzer
                .analyze(&state.code, state.context.language),
        );

        let (score, quality) = match quality {
            Ok(report) => {
                let score = report.clamped_score();
                (score, self.normalize(report.issues, IssueSource::Quality))
            }
            Err(e) => {
                tracing::warn!(iteration, error = %e, "Quality analysis failed; reusing previous findings");
                state.history.note(
                    iteration,
                    RoundPhase::Analyzing,
                    AuditLevel::Warning,
                    format!("Quality analysis failed, reused previous findings: {e}"),
                );
                (state.last_score(), state.last_issues.clone())
            }
        };

        let static_findings = match static_result {
            Ok(raw) => self.normalize(raw, IssueSource::Tool("static".into())),
            Err(e) => {
                tracing::warn!(iteration, error = %e, "Static analysis failed");
                state.history.note(
                    iteration,
                    RoundPhase::Analyzing,
                    AuditLevel::Warning,
                    format!("Static analysis failed: {e}"),
                );
                Vec::new()
            }
        };

        tracing::debug!(
            iteration,
            score,
            quality_issues = quality.len(),
            static_issues = static_findings.len(),
            "Analysis complete"
        );

        Analysis {
            score,
            quality,
            static_findings,
        }
    }

    /// Merge analyzer findings, run the critic and order by priority.
    async fn reconcile(
        &self,
        state: &mut SessionState,
        quality: Vec<Issue>,
        static_findings: Vec<Issue>,
    ) -> Vec<Issue> {
        let iteration = state.iteration;
        let reconciliation = self
            .reconciler
            .reconcile_issues(vec![quality, static_findings]);
        state.history.note(
            iteration,
            RoundPhase::Reconciling,
            AuditLevel::Info,
            format!(
                "Reconciled {} findings into {} ({} merged)",
                reconciliation.stats.received,
                reconciliation.stats.total,
                reconciliation.stats.merged
            ),
        );

        let refined = match self
            .collaborators
            .critic
            .refine(&state.code, &reconciliation.issues)
            .await
        {
            Ok(raw) => self.normalize(raw, IssueSource::Critic),
            Err(e) => {
                tracing::warn!(iteration, error = %e, "Critic failed; keeping reconciled findings");
                state.history.note(
                    iteration,
                    RoundPhase::Reconciling,
                    AuditLevel::Warning,
                    format!("Critic failed, kept reconciled findings: {e}"),
                );
                reconciliation.issues
            }
        };

        prioritize(refined, &state.feedback, &self.config.priority)
    }

    /// Ask the transformer to fix the prioritized findings.
    async fn refactor(&self, state: &mut SessionState, issues: &[Issue]) -> Refactor {
        let iteration = state.iteration;
        if issues.is_empty() {
            return Refactor {
                code: state.code.clone(),
                fallback: false,
            };
        }

        match self
            .collaborators
            .transformer
            .transform(&state.code, issues)
            .await
        {
            Ok(Some(code)) if !code.trim().is_empty() => Refactor {
                code,
                fallback: false,
            },
            Ok(_) => {
                tracing::warn!(
                    iteration,
                    "Transformer returned no code; keeping current code"
                );
                state.history.note(
                    iteration,
                    RoundPhase::Refactoring,
                    AuditLevel::Warning,
                    "Transformer returned no code, kept current code",
                );
                Refactor {
                    code: state.code.clone(),
                    fallback: true,
                }
            }
            Err(e) => {
                tracing::warn!(iteration, error = %e, "Transformer failed; keeping current code");
                state.history.note(
                    iteration,
                    RoundPhase::Refactoring,
                    AuditLevel::Warning,
                    format!("Transformer failed, kept current code: {e}"),
                );
                Refactor {
                    code: state.code.clone(),
                    fallback: true,
                }
            }
        }
    }

    /// Score the candidate and, when the gate allows, run the optimization pass.
    async fn reevaluate(
        &self,
        state: &mut SessionState,
        candidate: String,
        analysis_score: f64,
        reconciled: Vec<Issue>,
        pre_round_count: usize,
    ) -> Evaluation {
        let iteration = state.iteration;
        let (score, issues) = match self
            .collaborators
            .quality
            .analyze(&candidate, &state.context)
            .await
        {
            Ok(report) => (
                report.clamped_score(),
                self.normalize(report.issues, IssueSource::Quality),
            ),
            Err(e) => {
                tracing::warn!(iteration, error = %e, "Re-evaluation failed; reusing analysis results");
                state.history.note(
                    iteration,
                    RoundPhase::Reevaluating,
                    AuditLevel::Warning,
                    format!("Re-evaluation failed, reused analysis results: {e}"),
                );
                (analysis_score, reconciled)
            }
        };

        let high_count = high_severity_count(&issues);
        let weighted = weighted_issue_score(&issues, &self.config.weights);

        let mut evaluation = Evaluation {
            code: candidate,
            score,
            issues,
            high_severity_count: high_count,
            weighted_issue_score: weighted,
            optimization_ran: false,
            optimization_suggestions: 0,
        };

        if self.optimization_gate_open(state, &evaluation, pre_round_count) {
            self.optimize(state, &mut evaluation).await;
        }

        evaluation
    }

    fn optimization_gate_open(
        &self,
        state: &SessionState,
        evaluation: &Evaluation,
        pre_round_count: usize,
    ) -> bool {
        let gate = &self.config.optimization;
        gate.enabled
            && !state.optimization_applied
            && evaluation.high_severity_count <= state.criteria.max_high_severity_issues
            && (evaluation.issues.len() as f64)
                <= pre_round_count as f64 * gate.issue_reduction_ratio
            && evaluation.score >= gate.min_score
    }

    async fn optimize(&self, state: &mut SessionState, evaluation: &mut Evaluation) {
        let iteration = state.iteration;
        let suggestions = match self.collaborators.optimizer.suggest(&evaluation.code).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                tracing::warn!(iteration, error = %e, "Optimization suggester failed");
                state.history.note(
                    iteration,
                    RoundPhase::Reevaluating,
                    AuditLevel::Warning,
                    format!("Optimization suggester failed: {e}"),
                );
                return;
            }
        };
        evaluation.optimization_suggestions = suggestions.len();
        if suggestions.is_empty() {
            return;
        }

        let optimization_issues: Vec<Issue> = suggestions
            .into_iter()
            .map(|s| {
                let raw = RawIssue {
                    line: s.line,
                    description: s.description,
                    suggestion: s.suggestion,
                    severity: Some("low".into()),
                    ..Default::default()
                };
                Issue::from_raw(raw, IssueSource::Optimization, &self.config.issue_defaults)
            })
            .collect();

        match self
            .collaborators
            .transformer
            .transform(&evaluation.code, &optimization_issues)
            .await
        {
            Ok(Some(code)) if !code.trim().is_empty() => {
                evaluation.code = code;
                evaluation.optimization_ran = true;
                state.optimization_applied = true;
                tracing::info!(
                    iteration,
                    suggestions = optimization_issues.len(),
                    "Optimization applied"
                );
                state.history.note(
                    iteration,
                    RoundPhase::Reevaluating,
                    AuditLevel::Decision,
                    format!(
                        "Applied {} optimization suggestions",
                        optimization_issues.len()
                    ),
                );
            }
            Ok(_) => {
                tracing::warn!(iteration, "Transformer returned no optimized code");
            }
            Err(e) => {
                tracing::warn!(iteration, error = %e, "Optimization transform failed");
                state.history.note(
                    iteration,
                    RoundPhase::Reevaluating,
                    AuditLevel::Warning,
                    format!("Optimization transform failed: {e}"),
                );
            }
        }
    }

    /// Fold the round into the session: best result, score history, record.
    fn record_round(
        &self,
        state: &mut SessionState,
        evaluation: &Evaluation,
        issues_fixed: usize,
        transformer_fallback: bool,
    ) {
        let iteration = state.iteration;
        let previous_best = state.best.score;
        if state.best.consider(
            iteration,
            &evaluation.code,
            evaluation.score,
            &evaluation.issues,
        ) {
            state.history.note(
                iteration,
                RoundPhase::DecidingContinuation,
                AuditLevel::Decision,
                format!(
                    "New best score {:.1} (previous {:.1})",
                    evaluation.score, previous_best
                ),
            );
        }

        let improved = state.scores.push(evaluation.score);
        state.code.clone_from(&evaluation.code);
        state.last_issues.clone_from(&evaluation.issues);

        state.history.record_round(RoundRecord {
            iteration,
            score: evaluation.score,
            issue_count: evaluation.issues.len(),
            issues_fixed,
            high_severity_count: evaluation.high_severity_count,
            weighted_issue_score: evaluation.weighted_issue_score,
            improved,
            optimization_applied: evaluation.optimization_ran,
            optimization_suggestions: evaluation.optimization_suggestions,
            best_score: state.best.score,
            transformer_fallback,
        });
    }

    /// Ordered stop checklist; the first satisfied condition wins.
    fn check_stop(&self, state: &SessionState, evaluation: &Evaluation) -> Option<StopReason> {
        let criteria = &state.criteria;

        if self.stop.is_requested() {
            return Some(StopReason::UserRequested);
        }
        if state.iteration >= criteria.max_iterations {
            return Some(StopReason::MaxIterations {
                limit: criteria.max_iterations,
            });
        }
        if evaluation.issues.is_empty() {
            return Some(StopReason::NoIssuesRemaining);
        }
        if evaluation.score >= criteria.min_score_threshold
            && evaluation.high_severity_count <= criteria.max_high_severity_issues
            && evaluation.weighted_issue_score < 1.0
        {
            return Some(StopReason::QualityThresholdReached {
                score: evaluation.score,
                weighted_issue_score: evaluation.weighted_issue_score,
            });
        }
        if state.scores.stagnation_count() >= criteria.stagnation_threshold {
            return Some(StopReason::Stagnated {
                rounds: criteria.stagnation_threshold,
            });
        }
        if state.scores.has_converged(criteria.convergence_threshold) {
            return Some(StopReason::Converged);
        }
        None
    }

    fn normalize(&self, raw: Vec<RawIssue>, source: IssueSource) -> Vec<Issue> {
        raw.into_iter()
            .map(|issue| Issue::from_raw(issue, source.clone(), &self.config.issue_defaults))
            .collect()
    }
}
