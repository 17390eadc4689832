//! Analysis report aggregation.
//!
//! Issues produced by the rule evaluator are tallied into severity counts,
//! folded into a weighted compliance score and enriched with high-level
//! recommendations. A report is built once per analysis pass; the next pass
//! replaces it wholesale instead of mutating it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::rules::{Category, Severity};

/// A single finding produced by one rule evaluated against one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub resource_type: String,
    pub resource_name: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl Issue {
    /// `type.name` address of the offending resource.
    pub fn resource_address(&self) -> String {
        format!("{}.{}", self.resource_type, self.resource_name)
    }
}

/// Issue tallies broken down by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl IssueCounts {
    pub fn tally(issues: &[Issue]) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            counts.record(issue.severity);
        }
        counts
    }

    pub fn record(&mut self, severity: Severity) {
        self.total += 1;
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    /// Severity-weighted issue mass used by the compliance score.
    pub fn weighted(&self) -> f64 {
        self.critical as f64 * 10.0
            + self.high as f64 * 5.0
            + self.medium as f64 * 2.0
            + self.low as f64
            + self.info as f64 * 0.5
    }
}

/// Context captured alongside the scored issue set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub source: String,
    pub resource_count: usize,
    pub categories: Vec<Category>,
    pub generated_at: DateTime<Utc>,
}

/// Complete output of one analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub counts: IssueCounts,
    pub issues: Vec<Issue>,
    pub score: f64,
    pub recommendations: Vec<String>,
    pub metadata: ReportMetadata,
}

impl AnalysisReport {
    pub fn passes(&self, min_score: f64) -> bool {
        self.score >= min_score
    }

    pub fn has_blocking_issues(&self) -> bool {
        self.issues.iter().any(|issue| issue.severity.blocks())
    }

    /// Markdown rendering for terminal or file output.
    pub fn render(&self) -> String {
        let mut report = String::new();
        report.push_str("# Infrastructure Compliance Report\n\n");
        report.push_str(&format!("Source: {}\n", self.metadata.source));
        report.push_str(&format!(
            "Resources analyzed: {}\n",
            self.metadata.resource_count
        ));
        report.push_str(&format!("Score: {:.1}/100\n\n", self.score));

        report.push_str("## Summary\n\n");
        report.push_str("| Severity | Count |\n");
        report.push_str("|----------|-------|\n");
        report.push_str(&format!("| Critical | {} |\n", self.counts.critical));
        report.push_str(&format!("| High | {} |\n", self.counts.high));
        report.push_str(&format!("| Medium | {} |\n", self.counts.medium));
        report.push_str(&format!("| Low | {} |\n", self.counts.low));
        report.push_str(&format!("| Info | {} |\n", self.counts.info));
        report.push('\n');

        if !self.issues.is_empty() {
            report.push_str("## Findings by Category\n\n");
            let mut by_category: IndexMap<Category, Vec<&Issue>> = IndexMap::new();
            for issue in &self.issues {
                by_category.entry(issue.category).or_default().push(issue);
            }
            for (category, issues) in by_category {
                report.push_str(&format!("### {}\n\n", category));
                for issue in issues {
                    report.push_str(&format!(
                        "- [{}] **{}**: {}\n",
                        issue.severity,
                        issue.resource_address(),
                        issue.title
                    ));
                    report.push_str(&format!("  - {}\n", issue.description));
                    report.push_str(&format!("  - Recommendation: {}\n", issue.recommendation));
                }
                report.push('\n');
            }
        }

        if !self.recommendations.is_empty() {
            report.push_str("## Recommendations\n\n");
            for recommendation in &self.recommendations {
                report.push_str(&format!("- {}\n", recommendation));
            }
        }

        report
    }
}

/// Builds the report for one analysis pass.
///
/// The score is relative to the worst case of every resource carrying a
/// critical issue, so a fixed number of findings scores worse on a smaller
/// resource set. An empty document scores a clean 100.
pub fn aggregate(
    issues: Vec<Issue>,
    resource_count: usize,
    source: impl Into<String>,
) -> AnalysisReport {
    let counts = IssueCounts::tally(&issues);
    let score = compliance_score(&counts, resource_count);
    let recommendations = derive_recommendations(&issues);

    AnalysisReport {
        counts,
        issues,
        score,
        recommendations,
        metadata: ReportMetadata {
            source: source.into(),
            resource_count,
            categories: Category::ALL.to_vec(),
            generated_at: Utc::now(),
        },
    }
}

/// `max(0, 100 - weighted / (10 * resource_count) * 100)`, or 100 for an
/// empty document.
pub fn compliance_score(counts: &IssueCounts, resource_count: usize) -> f64 {
    if resource_count == 0 {
        return 100.0;
    }
    let max_possible = resource_count as f64 * 10.0;
    (100.0 - counts.weighted() / max_possible * 100.0).max(0.0)
}

fn derive_recommendations(issues: &[Issue]) -> Vec<String> {
    let mut by_category: IndexMap<Category, usize> = IndexMap::new();
    for issue in issues {
        *by_category.entry(issue.category).or_default() += 1;
    }

    let mut recommendations: Vec<String> = by_category
        .into_iter()
        .map(|(category, count)| {
            format!("Address {count} {category} issues to improve infrastructure quality")
        })
        .collect();

    if issues.iter().any(|i| i.severity == Severity::Critical) {
        recommendations
            .push("Prioritize fixing critical security and reliability issues".to_string());
    }
    if issues
        .iter()
        .any(|i| i.title.to_lowercase().contains("encryption"))
    {
        recommendations.push("Enable encryption for all data storage and transmission".to_string());
    }
    if issues
        .iter()
        .any(|i| i.title.to_lowercase().contains("tag"))
    {
        recommendations
            .push("Implement consistent tagging strategy for resource management".to_string());
    }

    recommendations
}
