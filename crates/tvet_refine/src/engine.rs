//! Maps validation findings to fixes and applies them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tvet_validate::ValidationResult;

use crate::fixes;

/// The catalog of automated fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    FormatCode,
    FixPublicAccess,
    EnableEncryption,
    FixNaming,
}

impl FixKind {
    pub fn description(&self) -> &'static str {
        match self {
            FixKind::FormatCode => "Reformat code to canonical style",
            FixKind::FixPublicAccess => "Add public access blocks for S3 buckets",
            FixKind::EnableEncryption => "Enable server-side encryption for S3 buckets",
            FixKind::FixNaming => "Rename resources to snake_case",
        }
    }

    fn transform(&self) -> fn(&str) -> Option<String> {
        match self {
            FixKind::FormatCode => fixes::reindent,
            FixKind::FixPublicAccess => fixes::insert_public_access_block,
            FixKind::EnableEncryption => fixes::insert_encryption_config,
            FixKind::FixNaming => fixes::snake_case_names,
        }
    }
}

/// One planned fix together with the finding that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRecord {
    pub kind: FixKind,
    pub description: String,
    pub source_tool: String,
    pub source_error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixPlan {
    /// Every error and warning seen on failed results, recognized or not.
    pub total_issues: usize,
    pub planned: Vec<FixRecord>,
}

impl FixPlan {
    pub fn is_empty(&self) -> bool {
        self.planned.is_empty()
    }

    pub fn len(&self) -> usize {
        self.planned.len()
    }
}

/// The rewritten document plus the fixes that actually landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementOutcome {
    pub text: String,
    pub applied: Vec<FixRecord>,
}

/// Plans and applies fixes for failed validation results.
///
/// Fixes are applied sequentially through a narrow transform interface;
/// a transform whose anchor is missing is dropped rather than failing
/// the whole pass, so `apply` at worst returns the input unchanged.
#[derive(Debug, Default)]
pub struct RefinementEngine;

impl RefinementEngine {
    pub fn new() -> Self {
        Self
    }

    /// Walks the errors and warnings of failed results and plans one fix
    /// per recognized pattern. Unrecognized findings are counted but plan
    /// nothing.
    pub fn plan(&self, results: &[ValidationResult]) -> FixPlan {
        let mut plan = FixPlan::default();
        for result in results {
            if result.passed {
                continue;
            }
            for message in result.errors.iter().chain(result.warnings.iter()) {
                plan.total_issues += 1;
                let kind = match classify(&result.tool, message) {
                    Some(kind) => kind,
                    None => continue,
                };
                if plan.planned.iter().any(|record| record.kind == kind) {
                    continue;
                }
                debug!(tool = %result.tool, fix = ?kind, "planned fix");
                plan.planned.push(FixRecord {
                    kind,
                    description: kind.description().to_string(),
                    source_tool: result.tool.clone(),
                    source_error: message.clone(),
                });
            }
        }
        plan
    }

    pub fn apply(&self, text: &str, plan: &FixPlan) -> RefinementOutcome {
        let mut current = text.to_string();
        let mut applied = Vec::new();
        for record in &plan.planned {
            match (record.kind.transform())(&current) {
                Some(next) => {
                    current = next;
                    applied.push(record.clone());
                }
                None => {
                    warn!(fix = ?record.kind, "fix target not found, skipping");
                }
            }
        }
        info!(
            planned = plan.planned.len(),
            applied = applied.len(),
            "refinement pass complete"
        );
        RefinementOutcome {
            text: current,
            applied,
        }
    }

    /// Convenience for plan-then-apply in one call.
    pub fn refine(&self, text: &str, results: &[ValidationResult]) -> RefinementOutcome {
        let plan = self.plan(results);
        self.apply(text, &plan)
    }
}

fn classify(tool: &str, message: &str) -> Option<FixKind> {
    let lowered = message.to_lowercase();
    match tool {
        "format" => Some(FixKind::FormatCode),
        "security" if lowered.contains("public access") => Some(FixKind::FixPublicAccess),
        "security" if lowered.contains("encryption") => Some(FixKind::EnableEncryption),
        "lint" if lowered.contains("naming convention") => Some(FixKind::FixNaming),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_maps_known_failures() {
        let results = vec![
            ValidationResult::passed("syntax").with_message("Syntax validation passed"),
            ValidationResult::warning("format").with_warning("Code formatting issues found"),
            ValidationResult::failed("lint")
                .with_error("Resource name 'MyBucket' violates naming convention, use snake_case"),
            ValidationResult::failed("security")
                .with_error("Security: S3 bucket 'a' does not block public access")
                .with_error("Security: S3 bucket 'a' is missing server-side encryption"),
        ];
        let plan = RefinementEngine::new().plan(&results);
        assert_eq!(plan.total_issues, 4);
        let kinds: Vec<FixKind> = plan.planned.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FixKind::FormatCode,
                FixKind::FixNaming,
                FixKind::FixPublicAccess,
                FixKind::EnableEncryption,
            ]
        );
    }

    #[test]
    fn test_plan_skips_passed_results_and_unknown_messages() {
        let results = vec![
            ValidationResult::passed("lint")
                .with_warning("Deprecated interpolation syntax: \"${var.x}\" can be unwrapped"),
            ValidationResult::failed("plan")
                .with_error("Invalid reference to undeclared resource: aws_subnet.main"),
        ];
        let plan = RefinementEngine::new().plan(&results);
        assert_eq!(plan.total_issues, 1);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_duplicate_patterns_plan_once() {
        let results = vec![ValidationResult::failed("security")
            .with_error("Security: S3 bucket 'a' does not block public access")
            .with_error("Security: S3 bucket 'b' does not block public access")];
        let plan = RefinementEngine::new().plan(&results);
        assert_eq!(plan.total_issues, 2);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_apply_drops_fix_without_anchor() {
        let results = vec![ValidationResult::failed("security")
            .with_error("Security: S3 bucket 'ghost' does not block public access")];
        let engine = RefinementEngine::new();
        let text = "resource \"aws_instance\" \"app\" {\n  ami = \"ami-1\"\n}\n";
        let outcome = engine.refine(text, &results);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.text, text);
    }

    #[test]
    fn test_applied_is_subset_of_planned() {
        let results = vec![
            ValidationResult::warning("format").with_warning("Code formatting issues found"),
            ValidationResult::failed("security")
                .with_error("Security: S3 bucket 'x' does not block public access"),
        ];
        let engine = RefinementEngine::new();
        let plan = engine.plan(&results);
        assert_eq!(plan.len(), 2);

        // no bucket to anchor the public access fix, so only the reformat lands
        let text = "resource \"aws_instance\" \"app\" {\nami = \"ami-1\"\n}\n";
        let outcome = engine.apply(text, &plan);
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].kind, FixKind::FormatCode);
        for record in &outcome.applied {
            assert!(plan.planned.iter().any(|p| p.kind == record.kind));
        }
    }

    #[test]
    fn test_apply_runs_fixes_sequentially() {
        let results = vec![
            ValidationResult::warning("format").with_warning("Code formatting issues found"),
            ValidationResult::failed("security")
                .with_error("Security: S3 bucket 'data' does not block public access"),
        ];
        let text = "resource \"aws_s3_bucket\" \"data\" {\nbucket = \"data\"\n}\n";
        let outcome = RefinementEngine::new().refine(text, &results);
        assert_eq!(outcome.applied.len(), 2);
        assert!(outcome.text.starts_with("resource \"aws_s3_bucket\" \"data\" {\n  bucket"));
        assert!(outcome
            .text
            .contains("resource \"aws_s3_bucket_public_access_block\" \"data\""));
    }
}
