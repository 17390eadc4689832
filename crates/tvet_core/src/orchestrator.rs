//! Drives a document through the plan-validate-refine loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info};
use tvet_hcl::{DiagnosticSeverity, Extractor};
use tvet_refine::RefinementEngine;
use tvet_rules::Evaluator;
use tvet_validate::{PipelineConfig, ValidationPipeline, ValidationSummary};

use crate::error::{CoreError, CoreResult};
use crate::machine::{after_analysis, decide, validate_transition};
use crate::review::review;
use crate::state::{Decision, Phase, RunOutcome, RunState, RunStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Refinement rounds allowed before the run is forced to review.
    pub max_iterations: usize,
    pub tool_timeout_seconds: u64,
    pub max_concurrent_runs: usize,
    /// Mark runs that end with critical findings as failed.
    pub fail_on_critical: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            tool_timeout_seconds: 60,
            max_concurrent_runs: 4,
            fail_on_critical: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_seconds)
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tool_timeout(mut self, seconds: u64) -> Self {
        self.tool_timeout_seconds = seconds;
        self
    }

    pub fn with_max_concurrent_runs(mut self, max_concurrent_runs: usize) -> Self {
        self.max_concurrent_runs = max_concurrent_runs;
        self
    }

    pub fn with_fail_on_critical(mut self, fail_on_critical: bool) -> Self {
        self.fail_on_critical = fail_on_critical;
        self
    }
}

/// Owns the collaborators a run needs and executes the state machine.
///
/// Cloning is cheap; all shared pieces are behind `Arc` and are
/// read-only once the orchestrator is built, so clones can run
/// concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    pipeline: ValidationPipeline,
    evaluator: Arc<Evaluator>,
    engine: Arc<RefinementEngine>,
    extractor: Arc<Extractor>,
    cancelled: Arc<AtomicBool>,
}

/// Cooperative cancellation flag for one orchestrator. Takes effect at
/// the next decide checkpoint, never mid-tool.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        let pipeline_config = PipelineConfig::default().with_timeout(config.tool_timeout());
        Self {
            pipeline: ValidationPipeline::standard_with_config(pipeline_config),
            evaluator: Arc::new(Evaluator::standard()),
            engine: Arc::new(RefinementEngine::new()),
            extractor: Arc::new(Extractor::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// Swaps in a custom validation pipeline.
    pub fn with_pipeline(mut self, pipeline: ValidationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Swaps in a custom evaluator, e.g. one with extra rules or a
    /// knowledge source attached.
    pub fn with_evaluator(mut self, evaluator: Arc<Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    /// Runs one document through the full loop and returns everything it
    /// produced.
    pub async fn run(&self, document: &str, source: &str) -> CoreResult<RunOutcome> {
        if document.trim().is_empty() {
            return Err(CoreError::EmptyDocument);
        }
        let started = Instant::now();
        let mut state = RunState::new(document, source, self.config.max_iterations);
        state.status = RunStatus::Running;
        info!(run = %state.run_id, source, "starting run");

        self.advance(&mut state, Phase::Generate)?;
        loop {
            match state.phase {
                Phase::Generate => {
                    state.model = self.extractor.extract(&state.text, &state.source);
                    for diagnostic in &state.model.diagnostics {
                        match diagnostic.severity {
                            DiagnosticSeverity::Error => state.errors.push(diagnostic.message.clone()),
                            DiagnosticSeverity::Warning => {
                                state.warnings.push(diagnostic.message.clone())
                            }
                        }
                    }
                    debug!(
                        run = %state.run_id,
                        resources = state.model.resource_count(),
                        "extracted document model"
                    );
                    self.advance(&mut state, Phase::Validate)?;
                }
                Phase::Validate => {
                    let results = self.pipeline.run(&state.text).await;
                    for result in &results {
                        if !result.passed {
                            state.errors.extend(result.errors.iter().cloned());
                        }
                        state.warnings.extend(result.warnings.iter().cloned());
                    }
                    state.summary = Some(ValidationSummary::from_results(&results));
                    state.results = results;
                    self.advance(&mut state, Phase::Decide)?;
                }
                Phase::Decide => {
                    if self.cancelled.load(Ordering::SeqCst) {
                        info!(run = %state.run_id, "run cancelled, forcing review");
                        state.status = RunStatus::Cancelled;
                        self.advance(&mut state, Phase::Review)?;
                        continue;
                    }
                    let next = match decide(&state) {
                        Decision::Refine => Phase::Refine,
                        Decision::Analyze => Phase::Analyze,
                        Decision::Review => Phase::Review,
                    };
                    self.advance(&mut state, next)?;
                }
                Phase::Refine => {
                    let outcome = self.engine.refine(&state.text, &state.results);
                    info!(
                        run = %state.run_id,
                        iteration = state.iteration + 1,
                        applied = outcome.applied.len(),
                        "applied refinement pass"
                    );
                    state.text = outcome.text;
                    state.fixes_applied.extend(outcome.applied);
                    state.iteration += 1;
                    self.advance(&mut state, Phase::Generate)?;
                }
                Phase::Analyze => {
                    let report = self.evaluator.analyze(&state.model, &state.source);
                    let next = match after_analysis(&report) {
                        Decision::Refine => Phase::Refine,
                        _ => Phase::Review,
                    };
                    info!(
                        run = %state.run_id,
                        issues = report.issues.len(),
                        score = report.score,
                        "analysis complete"
                    );
                    state.report = Some(report);
                    self.advance(&mut state, next)?;
                }
                Phase::Review => {
                    let assessed = review(&state);
                    info!(
                        run = %state.run_id,
                        overall = assessed.overall_score,
                        verdict = %assessed.verdict,
                        "review complete"
                    );
                    let unresolved_critical = self.config.fail_on_critical
                        && state
                            .summary
                            .as_ref()
                            .map_or(false, |s| s.has_critical_issues());
                    if state.status == RunStatus::Running {
                        state.status = if unresolved_critical {
                            RunStatus::Failed
                        } else {
                            RunStatus::Completed
                        };
                    }
                    self.advance(&mut state, Phase::Done)?;
                    let mut outcome = self.outcome(state, started.elapsed());
                    outcome.review = Some(assessed);
                    return Ok(outcome);
                }
                Phase::Plan | Phase::Done => {
                    return Err(CoreError::InvalidTransition {
                        from: state.phase,
                        to: state.phase,
                    });
                }
            }
        }
    }

    /// Runs many documents concurrently, capped by
    /// `max_concurrent_runs`. Results come back in input order.
    pub async fn run_batch(&self, documents: &[(String, String)]) -> Vec<CoreResult<RunOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_runs.max(1)));
        let mut handles = Vec::with_capacity(documents.len());
        for (source, text) in documents {
            let semaphore = Arc::clone(&semaphore);
            let orchestrator = self.clone();
            let source = source.clone();
            let text = text.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| CoreError::TaskFailed("run slot closed".to_string()))?;
                orchestrator.run(&text, &source).await
            }));
        }
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => outcomes.push(result),
                Err(join_error) => outcomes.push(Err(CoreError::TaskFailed(join_error.to_string()))),
            }
        }
        outcomes
    }

    fn advance(&self, state: &mut RunState, to: Phase) -> CoreResult<()> {
        validate_transition(state.phase, to)?;
        debug!(run = %state.run_id, from = %state.phase, to = %to, "phase transition");
        state.phase = to;
        state.trace.push(to);
        Ok(())
    }

    fn outcome(&self, state: RunState, elapsed: Duration) -> RunOutcome {
        RunOutcome {
            run_id: state.run_id,
            source: state.source,
            status: state.status,
            text: state.text,
            iterations: state.iteration,
            resource_count: state.model.resource_count(),
            results: state.results,
            summary: state.summary,
            report: state.report,
            review: None,
            fixes_applied: state.fixes_applied,
            errors: state.errors,
            warnings: state.warnings,
            trace: state.trace,
            started_at: state.started_at,
            duration_seconds: elapsed.as_secs_f64(),
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}
