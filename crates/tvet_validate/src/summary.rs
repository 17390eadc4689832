//! Aggregation of tool results into a pipeline verdict.

use serde::{Deserialize, Serialize};

use crate::result::ValidationResult;

/// Whether a classified issue came from an error or a warning string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Error,
    Warning,
}

/// One tool message bucketed by severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedIssue {
    pub tool: String,
    pub message: String,
    pub kind: IssueKind,
}

/// Pipeline-level verdict, ordered worst to best for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Critical,
    Failed,
    Warning,
    Partial,
    Passed,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Critical => "critical",
            OverallStatus::Failed => "failed",
            OverallStatus::Warning => "warning",
            OverallStatus::Partial => "partial",
            OverallStatus::Passed => "passed",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived aggregate over one validation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_tools: usize,
    pub passed_tools: usize,
    pub failed_tools: usize,
    pub critical: Vec<ClassifiedIssue>,
    pub high: Vec<ClassifiedIssue>,
    pub medium: Vec<ClassifiedIssue>,
    pub low: Vec<ClassifiedIssue>,
    pub overall_status: OverallStatus,
    pub score: f64,
    pub total_duration_seconds: f64,
}

impl ValidationSummary {
    /// Classifies every error of every failed result by keyword, and every
    /// warning of every result as low.
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let total_tools = results.len();
        let passed_tools = results.iter().filter(|r| r.passed).count();
        let failed_tools = total_tools - passed_tools;

        let mut critical = Vec::new();
        let mut high = Vec::new();
        let mut medium = Vec::new();
        let mut low = Vec::new();

        for result in results {
            if !result.passed {
                for error in &result.errors {
                    let issue = ClassifiedIssue {
                        tool: result.tool.clone(),
                        message: error.clone(),
                        kind: IssueKind::Error,
                    };
                    let lowered = error.to_lowercase();
                    if ["critical", "security", "vulnerability"]
                        .iter()
                        .any(|k| lowered.contains(k))
                    {
                        critical.push(issue);
                    } else if ["error", "failed", "invalid"]
                        .iter()
                        .any(|k| lowered.contains(k))
                    {
                        high.push(issue);
                    } else {
                        medium.push(issue);
                    }
                }
            }
            for warning in &result.warnings {
                low.push(ClassifiedIssue {
                    tool: result.tool.clone(),
                    message: warning.clone(),
                    kind: IssueKind::Warning,
                });
            }
        }

        let score = if total_tools > 0 {
            passed_tools as f64 / total_tools as f64 * 100.0
        } else {
            0.0
        };

        let overall_status = if !critical.is_empty() {
            OverallStatus::Critical
        } else if !high.is_empty() {
            OverallStatus::Failed
        } else if !medium.is_empty() {
            OverallStatus::Warning
        } else if passed_tools == total_tools {
            OverallStatus::Passed
        } else {
            OverallStatus::Partial
        };

        Self {
            total_tools,
            passed_tools,
            failed_tools,
            critical,
            high,
            medium,
            low,
            overall_status,
            score,
            total_duration_seconds: results.iter().map(|r| r.duration_seconds).sum(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.overall_status == OverallStatus::Passed
    }

    pub fn has_critical_issues(&self) -> bool {
        !self.critical.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.critical.len() + self.high.len() + self.medium.len() + self.low.len()
    }

    /// Human-readable summary for terminal output.
    pub fn render(&self, results: &[ValidationResult]) -> String {
        let marker = match self.overall_status {
            OverallStatus::Passed => "✅",
            OverallStatus::Partial | OverallStatus::Warning => "⚠️",
            OverallStatus::Failed => "❌",
            OverallStatus::Critical => "🚨",
        };

        let mut lines = vec![
            format!("{marker} Validation Pipeline Complete"),
            String::new(),
            "Validation Summary:".to_string(),
            format!("   Overall Score: {:.1}/100", self.score),
            format!("   Tools Passed: {}/{}", self.passed_tools, self.total_tools),
            format!("   Execution Time: {:.2}s", self.total_duration_seconds),
            format!("   Status: {}", self.overall_status),
        ];

        if !results.is_empty() {
            lines.push(String::new());
            lines.push("Tool Results:".to_string());
            for result in results {
                let mark = if result.passed { "✅" } else { "❌" };
                lines.push(format!("   {mark} {}", result.tool));
            }
        }

        render_bucket(&mut lines, "Critical Issues", &self.critical);
        render_bucket(&mut lines, "High Priority Issues", &self.high);
        render_bucket(&mut lines, "Medium Priority Issues", &self.medium);

        lines.join("\n")
    }
}

fn render_bucket(lines: &mut Vec<String>, label: &str, issues: &[ClassifiedIssue]) {
    if issues.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(format!("{label} ({}):", issues.len()));
    for issue in issues.iter().take(3) {
        lines.push(format!("   - {}: {}", issue.tool, issue.message));
    }
    if issues.len() > 3 {
        lines.push(format!("   - ... and {} more", issues.len() - 3));
    }
}
