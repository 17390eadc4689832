//! Composite quality review over a finished run.
//!
//! Four component scores, each 0-100, averaged into an overall verdict.
//! The components look at different signals: document structure, the
//! compliance report, the validation summary, and best-practice markers
//! in the text itself.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::state::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    CompletedSuccessfully,
    CompletedWithWarnings,
    CompletedWithIssues,
}

impl ReviewVerdict {
    pub fn from_score(overall: f64) -> Self {
        if overall >= 80.0 {
            ReviewVerdict::CompletedSuccessfully
        } else if overall >= 60.0 {
            ReviewVerdict::CompletedWithWarnings
        } else {
            ReviewVerdict::CompletedWithIssues
        }
    }
}

impl std::fmt::Display for ReviewVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReviewVerdict::CompletedSuccessfully => "completed_successfully",
            ReviewVerdict::CompletedWithWarnings => "completed_with_warnings",
            ReviewVerdict::CompletedWithIssues => "completed_with_issues",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub structure_score: f64,
    pub compliance_score: f64,
    pub validation_score: f64,
    pub practice_score: f64,
    pub overall_score: f64,
    pub verdict: ReviewVerdict,
}

/// Scores a run. Works on whatever the run produced; missing pieces get
/// neutral or zero scores rather than failing.
pub fn review(state: &RunState) -> Review {
    let structure_score = structure_score(&state.text);
    let compliance_score = state
        .report
        .as_ref()
        .map(|report| report.score)
        .unwrap_or(50.0);
    let validation_score = validation_score(state);
    let practice_score = practice_score(&state.text);
    let overall_score =
        (structure_score + compliance_score + validation_score + practice_score) / 4.0;
    Review {
        structure_score,
        compliance_score,
        validation_score,
        practice_score,
        overall_score,
        verdict: ReviewVerdict::from_score(overall_score),
    }
}

/// Declarations, indentation consistency, comment density and naming.
fn structure_score(text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }
    let mut score = 0.0;

    if text.contains("resource") {
        score += 15.0;
    }
    if text.contains("variable") {
        score += 5.0;
    }
    if text.contains("output") {
        score += 5.0;
    }

    let lines: Vec<&str> = text.lines().collect();
    if !lines.is_empty() {
        let consistent = lines
            .iter()
            .filter(|line| line.starts_with("  ") || line.trim().is_empty() || !line.starts_with(' '))
            .count();
        score += 25.0 * consistent as f64 / lines.len() as f64;
    }

    let comment_lines = lines
        .iter()
        .filter(|line| line.trim_start().starts_with('#'))
        .count();
    score += (comment_lines as f64 * 5.0).min(25.0);

    score += naming_score(text);

    score.min(100.0)
}

fn naming_score(text: &str) -> f64 {
    let header = match Regex::new(r#"resource\s+"[^"]+"\s+"([^"]+)""#) {
        Ok(re) => re,
        Err(_) => return 0.0,
    };
    let snake = match Regex::new(r"^[a-z][a-z0-9_]*$") {
        Ok(re) => re,
        Err(_) => return 0.0,
    };
    let names: Vec<&str> = header
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if names.is_empty() {
        return 12.5;
    }
    let valid = names.iter().filter(|name| snake.is_match(name)).count();
    25.0 * valid as f64 / names.len() as f64
}

/// Pass ratio minus a capped penalty for critical findings.
fn validation_score(state: &RunState) -> f64 {
    let summary = match &state.summary {
        Some(summary) => summary,
        None => return 0.0,
    };
    let penalty = (summary.critical.len() as f64 * 10.0).min(30.0);
    (summary.score - penalty).max(0.0)
}

/// Best-practice markers present in the text.
fn practice_score(text: &str) -> f64 {
    let mut score: f64 = 0.0;
    if text.contains("tags") {
        score += 15.0;
        if text.contains("Environment") {
            score += 10.0;
        }
    }
    if text.contains("description =") {
        score += 25.0;
    }
    if text.contains("validation {") {
        score += 25.0;
    }
    if text.contains("server_side_encryption") || text.contains("public_access_block") {
        score += 25.0;
    }
    score.min(100.0)
}
