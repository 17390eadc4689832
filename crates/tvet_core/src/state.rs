//! Run state shared across orchestration phases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tvet_hcl::DocumentModel;
use tvet_refine::FixRecord;
use tvet_rules::AnalysisReport;
use tvet_validate::{ValidationResult, ValidationSummary};
use uuid::Uuid;

use crate::review::Review;

/// Phases of one run. Edges between them are fixed; see
/// [`crate::machine::validate_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Plan,
    Generate,
    Validate,
    Decide,
    Refine,
    Analyze,
    Review,
    Done,
}

impl Phase {
    /// The transitions the state machine allows out of this phase.
    pub fn successors(&self) -> &'static [Phase] {
        match self {
            Phase::Plan => &[Phase::Generate],
            Phase::Generate => &[Phase::Validate],
            Phase::Validate => &[Phase::Decide],
            Phase::Decide => &[Phase::Refine, Phase::Analyze, Phase::Review],
            Phase::Refine => &[Phase::Generate],
            Phase::Analyze => &[Phase::Refine, Phase::Review],
            Phase::Review => &[Phase::Done],
            Phase::Done => &[],
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Plan => "plan",
            Phase::Generate => "generate",
            Phase::Validate => "validate",
            Phase::Decide => "decide",
            Phase::Refine => "refine",
            Phase::Analyze => "analyze",
            Phase::Review => "review",
            Phase::Done => "done",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// Where to go after a validation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Refine,
    Analyze,
    Review,
}

/// Mutable state of a single run. One run owns its state exclusively;
/// nothing here is shared across runs.
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: Uuid,
    pub source: String,
    pub text: String,
    pub phase: Phase,
    pub status: RunStatus,
    pub iteration: usize,
    pub max_iterations: usize,
    pub model: DocumentModel,
    pub results: Vec<ValidationResult>,
    pub summary: Option<ValidationSummary>,
    pub report: Option<AnalysisReport>,
    pub fixes_applied: Vec<FixRecord>,
    /// Error and warning strings accumulated across all rounds.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub trace: Vec<Phase>,
    pub started_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(text: impl Into<String>, source: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source: source.into(),
            text: text.into(),
            phase: Phase::Plan,
            status: RunStatus::Pending,
            iteration: 0,
            max_iterations,
            model: DocumentModel::default(),
            results: Vec::new(),
            summary: None,
            report: None,
            fixes_applied: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            trace: vec![Phase::Plan],
            started_at: Utc::now(),
        }
    }

    /// All validation tools passed in the most recent round.
    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.passed)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub source: String,
    pub status: RunStatus,
    pub text: String,
    pub iterations: usize,
    pub resource_count: usize,
    pub results: Vec<ValidationResult>,
    pub summary: Option<ValidationSummary>,
    pub report: Option<AnalysisReport>,
    pub review: Option<Review>,
    pub fixes_applied: Vec<FixRecord>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub trace: Vec<Phase>,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
