//! Pure transition logic for the run state machine.

use tracing::warn;
use tvet_rules::AnalysisReport;

use crate::error::{CoreError, CoreResult};
use crate::state::{Decision, Phase, RunState};

/// Rejects transitions that are not static edges of the machine.
pub fn validate_transition(from: Phase, to: Phase) -> CoreResult<()> {
    if from.successors().contains(&to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition { from, to })
    }
}

/// Picks the next phase after a validation round.
///
/// The iteration budget is authoritative: once spent, the run goes to
/// review no matter what validation found. Critical findings divert
/// through deep analysis so the refiner gets a full report to work from.
pub fn decide(state: &RunState) -> Decision {
    if state.iteration >= state.max_iterations {
        warn!(
            run = %state.run_id,
            iteration = state.iteration,
            "iteration budget exhausted, forcing review"
        );
        return Decision::Review;
    }
    if state.results.is_empty() {
        return Decision::Analyze;
    }
    if state.all_passed() {
        return Decision::Review;
    }
    let critical = state
        .summary
        .as_ref()
        .map(|summary| summary.has_critical_issues())
        .unwrap_or(false);
    if critical {
        Decision::Analyze
    } else {
        Decision::Refine
    }
}

/// Picks the next phase after deep analysis: blocking findings go back
/// to refinement, anything else is ready for review.
pub fn after_analysis(report: &AnalysisReport) -> Decision {
    let blocking = report.issues.iter().any(|issue| issue.severity.blocks());
    if blocking {
        Decision::Refine
    } else {
        Decision::Review
    }
}
