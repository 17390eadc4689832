//! Built-in validation tools.
//!
//! Each tool mirrors one stage of a Terraform toolchain dry run (syntax
//! check, formatter, plan, linter, security scanner) but runs entirely
//! offline against the document text. Findings are worded so that the
//! summary classifier and the refinement planner can key off them.

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tvet_hcl::{check_syntax, is_truthy, resource_references, DiagnosticSeverity, Extractor, Resource};

use crate::error::ToolResult;
use crate::pipeline::ValidationTool;
use crate::result::ValidationResult;

const PERIMETER_TYPES: [&str; 2] = ["aws_security_group", "azurerm_network_security_group"];
const OPEN_CIDR: &str = "0.0.0.0/0";
const SAFE_TLS_PORT: i64 = 443;

/// Checks brace and quote balance plus structural parseability.
pub struct SyntaxTool;

#[async_trait]
impl ValidationTool for SyntaxTool {
    fn name(&self) -> &str {
        "syntax"
    }

    async fn run(&self, text: &str) -> ToolResult<ValidationResult> {
        let mut errors: Vec<String> = check_syntax(text)
            .into_iter()
            .map(|message| format!("Syntax error: {message}"))
            .collect();
        let model = Extractor::new().extract(text, "syntax");
        for diagnostic in &model.diagnostics {
            if diagnostic.severity == DiagnosticSeverity::Error {
                errors.push(format!("Syntax error: {}", diagnostic.message));
            }
        }
        if errors.is_empty() {
            Ok(ValidationResult::passed(self.name()).with_message("Syntax validation passed"))
        } else {
            Ok(ValidationResult::failed(self.name()).with_errors(errors))
        }
    }
}

/// Compares the document against its canonical formatting.
///
/// A mismatch is reported as a warning, with the canonical text attached
/// under the `formatted_code` metadata key so callers can apply it.
pub struct FormatTool;

#[async_trait]
impl ValidationTool for FormatTool {
    fn name(&self) -> &str {
        "format"
    }

    async fn run(&self, text: &str) -> ToolResult<ValidationResult> {
        let formatted = canonical_format(text);
        if formatted == text {
            Ok(ValidationResult::passed(self.name()).with_message("Formatting is correct"))
        } else {
            Ok(ValidationResult::warning(self.name())
                .with_warning("Code formatting issues found")
                .with_metadata("formatted_code", formatted))
        }
    }
}

/// Dry-run plan: every resource reference must resolve to a declared
/// resource in the same document.
pub struct PlanTool;

#[async_trait]
impl ValidationTool for PlanTool {
    fn name(&self) -> &str {
        "plan"
    }

    async fn run(&self, text: &str) -> ToolResult<ValidationResult> {
        let model = Extractor::new().extract(text, "plan");
        let declared: HashSet<String> = model.resources.iter().map(|r| r.address()).collect();
        let mut errors = Vec::new();
        for resource in &model.resources {
            for reference in resource_references(resource) {
                if !declared.contains(&reference) {
                    errors.push(format!(
                        "Invalid reference to undeclared resource: {reference}"
                    ));
                }
            }
        }
        if !errors.is_empty() {
            return Ok(ValidationResult::failed(self.name()).with_errors(errors));
        }
        let mut result = ValidationResult::passed(self.name())
            .with_message(format!(
                "Plan: {} to add, 0 to change, 0 to destroy",
                model.resource_count()
            ))
            .with_metadata("resource_count", model.resource_count().to_string());
        for resource in &model.resources {
            result = result.with_message(format!("  + {}", resource.address()));
        }
        Ok(result)
    }
}

/// Style linter for resource naming and deprecated interpolation syntax.
pub struct LintTool;

#[async_trait]
impl ValidationTool for LintTool {
    fn name(&self) -> &str {
        "lint"
    }

    async fn run(&self, text: &str) -> ToolResult<ValidationResult> {
        let model = Extractor::new().extract(text, "lint");
        let mut errors = Vec::new();
        if let Ok(name_re) = Regex::new(r"^[a-z][a-z0-9_]*$") {
            for resource in &model.resources {
                if !name_re.is_match(&resource.name) {
                    errors.push(format!(
                        "Resource name '{}' violates naming convention, use snake_case",
                        resource.name
                    ));
                }
            }
        }
        let mut warnings = Vec::new();
        if let Ok(interp_re) = Regex::new(r#""\$\{[^}]+\}""#) {
            for found in interp_re.find_iter(text) {
                warnings.push(format!(
                    "Deprecated interpolation syntax: {} can be unwrapped",
                    found.as_str()
                ));
            }
        }
        if errors.is_empty() {
            Ok(ValidationResult::passed(self.name())
                .with_message("Linting passed")
                .with_warnings(warnings))
        } else {
            Ok(ValidationResult::failed(self.name())
                .with_errors(errors)
                .with_warnings(warnings))
        }
    }
}

/// Offline security scanner.
///
/// Flags world-open ingress on perimeter resources, S3 buckets without a
/// public access block or server-side encryption, and hardcoded
/// credentials. All findings are errors so the summary classifies them
/// as critical.
pub struct SecurityTool;

#[async_trait]
impl ValidationTool for SecurityTool {
    fn name(&self) -> &str {
        "security"
    }

    async fn run(&self, text: &str) -> ToolResult<ValidationResult> {
        let model = Extractor::new().extract(text, "security");
        let mut errors = Vec::new();
        for resource in &model.resources {
            if PERIMETER_TYPES.contains(&resource.resource_type.as_str()) {
                for port in open_ingress_ports(resource) {
                    errors.push(format!(
                        "Security: security group '{}' allows ingress from {OPEN_CIDR} on port {port}",
                        resource.name
                    ));
                }
            }
        }
        let has_public_block = text.contains("aws_s3_bucket_public_access_block");
        let has_sse_resource = text.contains("aws_s3_bucket_server_side_encryption_configuration");
        for bucket in model.resources_of_type("aws_s3_bucket") {
            if !has_public_block {
                errors.push(format!(
                    "Security: S3 bucket '{}' does not block public access",
                    bucket.name
                ));
            }
            let inline_sse = bucket
                .attributes
                .get("server_side_encryption_configuration")
                .map(is_truthy)
                .unwrap_or(false);
            if !inline_sse && !has_sse_resource {
                errors.push(format!(
                    "Security: S3 bucket '{}' is missing server-side encryption",
                    bucket.name
                ));
            }
        }
        errors.extend(scan_for_secrets(text));
        if errors.is_empty() {
            Ok(ValidationResult::passed(self.name()).with_message("No security issues found"))
        } else {
            Ok(ValidationResult::failed(self.name()).with_errors(errors))
        }
    }
}

/// Reindents a document to two-space nesting and normalizes attribute
/// assignments to `key = value` spacing. Blank lines and comment-only
/// lines keep their content; delimiters inside strings and comments do
/// not affect nesting depth.
pub fn canonical_format(text: &str) -> String {
    let assign = Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(\S.*)$").ok();
    let mut depth: usize = 0;
    let mut out: Vec<String> = Vec::new();
    for raw in text.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            out.push(String::new());
            continue;
        }
        let (opens, closes) = delimiter_balance(trimmed);
        let leading_closers = trimmed
            .chars()
            .take_while(|c| matches!(c, '}' | ')' | ']'))
            .count();
        let body = match &assign {
            Some(re) => normalize_assignment(re, trimmed),
            None => trimmed.to_string(),
        };
        out.push(format!(
            "{}{}",
            "  ".repeat(depth.saturating_sub(leading_closers)),
            body
        ));
        depth = (depth + opens).saturating_sub(closes);
    }
    let mut formatted = out.join("\n");
    if text.ends_with('\n') {
        formatted.push('\n');
    }
    formatted
}

fn normalize_assignment(assign: &Regex, line: &str) -> String {
    if let Some(caps) = assign.captures(line) {
        let value = caps[2].trim_end();
        // a leading '=' means the line was a comparison, not an assignment
        if !value.starts_with('=') {
            return format!("{} = {}", &caps[1], value);
        }
    }
    line.to_string()
}

fn delimiter_balance(line: &str) -> (usize, usize) {
    let mut opens = 0;
    let mut closes = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => break,
            '/' if !in_string && chars.peek() == Some(&'/') => break,
            '{' | '(' | '[' if !in_string => opens += 1,
            '}' | ')' | ']' if !in_string => closes += 1,
            _ => {}
        }
    }
    (opens, closes)
}

fn open_ingress_ports(resource: &Resource) -> Vec<i64> {
    let ingress = match resource.attributes.get("ingress") {
        Some(value) => value,
        None => return Vec::new(),
    };
    let blocks: Vec<&serde_json::Map<String, Value>> = match ingress {
        Value::Array(entries) => entries.iter().filter_map(|e| e.as_object()).collect(),
        Value::Object(map) => vec![map],
        _ => Vec::new(),
    };
    let mut ports = Vec::new();
    for block in blocks {
        let open = block
            .get("cidr_blocks")
            .map(cidr_open_to_world)
            .unwrap_or(false);
        if !open {
            continue;
        }
        let port = block.get("from_port").and_then(port_number).unwrap_or(0);
        if port != SAFE_TLS_PORT {
            ports.push(port);
        }
    }
    ports
}

fn cidr_open_to_world(value: &Value) -> bool {
    match value {
        Value::Array(entries) => entries
            .iter()
            .any(|entry| entry.as_str() == Some(OPEN_CIDR)),
        Value::String(raw) => raw.contains(OPEN_CIDR),
        _ => false,
    }
}

fn port_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn scan_for_secrets(text: &str) -> Vec<String> {
    let patterns = [
        (r#"(?i)(password|passwd|pwd)\s*=\s*"[^"$]{4,}""#, "password"),
        (r#"(?i)(api[_-]?key|apikey)\s*=\s*"[^"$]{8,}""#, "API key"),
        (r#"(?i)(secret|token)\s*=\s*"[^"$]{8,}""#, "secret"),
        (r"AKIA[0-9A-Z]{16}", "AWS access key"),
    ];
    let compiled: Vec<(Regex, &str)> = patterns
        .iter()
        .filter_map(|(pattern, label)| Regex::new(pattern).ok().map(|re| (re, *label)))
        .collect();
    let mut findings = Vec::new();
    for (index, line) in text.lines().enumerate() {
        for (regex, label) in &compiled {
            if regex.is_match(line) {
                findings.push(format!(
                    "Security: potential hardcoded {} on line {}",
                    label,
                    index + 1
                ));
                break;
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN_BUCKET: &str = r#"resource "aws_s3_bucket" "artifacts" {
  bucket = "artifacts"
}
"#;

    #[tokio::test]
    async fn test_syntax_tool_accepts_clean_document() {
        let result = SyntaxTool.run(CLEAN_BUCKET).await.unwrap();
        assert!(result.passed);
        assert_eq!(result.messages, vec!["Syntax validation passed"]);
    }

    #[tokio::test]
    async fn test_syntax_tool_reports_unbalanced_braces() {
        let result = SyntaxTool
            .run("resource \"aws_s3_bucket\" \"a\" {\n  bucket = \"a\"\n")
            .await
            .unwrap();
        assert!(!result.passed);
        assert!(result.errors[0].starts_with("Syntax error:"));
        assert!(result.errors.iter().any(|e| e.contains("Unbalanced braces")));
    }

    #[tokio::test]
    async fn test_format_tool_passes_canonical_text() {
        let result = FormatTool.run(CLEAN_BUCKET).await.unwrap();
        assert!(result.passed);
        assert!(result.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_format_tool_warns_and_attaches_fix() {
        let text = "resource \"aws_s3_bucket\" \"a\" {\n      bucket=\"a\"\n}\n";
        let result = FormatTool.run(text).await.unwrap();
        assert!(!result.passed);
        assert_eq!(result.warnings, vec!["Code formatting issues found"]);
        let formatted = &result.metadata["formatted_code"];
        assert!(formatted.contains("\n  bucket = \"a\"\n"));
    }

    #[test]
    fn test_canonical_format_nests_and_dedents() {
        let text = "resource \"aws_security_group\" \"web\" {\ningress {\nfrom_port = 22\n}\n}\n";
        let formatted = canonical_format(text);
        assert_eq!(
            formatted,
            "resource \"aws_security_group\" \"web\" {\n  ingress {\n    from_port = 22\n  }\n}\n"
        );
    }

    #[test]
    fn test_canonical_format_ignores_braces_in_strings_and_comments() {
        let text = "# opening { brace\nname = \"a{b\"\n";
        assert_eq!(canonical_format(text), text);
    }

    #[test]
    fn test_canonical_format_leaves_comparisons_alone() {
        let text = "count = var.enabled == \"yes\" ? 1 : 0\n";
        assert_eq!(canonical_format(text), text);
    }

    #[tokio::test]
    async fn test_plan_tool_lists_resources() {
        let text = r#"resource "aws_s3_bucket" "a" {
  bucket = "a"
}

resource "aws_s3_bucket_public_access_block" "a" {
  bucket = aws_s3_bucket.a.id
}
"#;
        let result = PlanTool.run(text).await.unwrap();
        assert!(result.passed);
        assert_eq!(result.messages[0], "Plan: 2 to add, 0 to change, 0 to destroy");
        assert!(result.messages.contains(&"  + aws_s3_bucket.a".to_string()));
        assert_eq!(result.metadata["resource_count"], "2");
    }

    #[tokio::test]
    async fn test_plan_tool_flags_undeclared_reference() {
        let text = r#"resource "aws_instance" "app" {
  subnet_id = aws_subnet.main.id
}
"#;
        let result = PlanTool.run(text).await.unwrap();
        assert!(!result.passed);
        assert_eq!(
            result.errors,
            vec!["Invalid reference to undeclared resource: aws_subnet.main"]
        );
    }

    #[tokio::test]
    async fn test_plan_tool_ignores_data_and_var_references() {
        let text = r#"resource "aws_instance" "app" {
  ami           = data.aws_ami.ubuntu.id
  instance_type = var.instance_type
}
"#;
        let result = PlanTool.run(text).await.unwrap();
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_lint_tool_flags_camel_case_names() {
        let text = "resource \"aws_s3_bucket\" \"MyBucket\" {\n  bucket = \"x\"\n}\n";
        let result = LintTool.run(text).await.unwrap();
        assert!(!result.passed);
        assert_eq!(
            result.errors,
            vec!["Resource name 'MyBucket' violates naming convention, use snake_case"]
        );
    }

    #[tokio::test]
    async fn test_lint_tool_warns_on_wrapped_interpolation() {
        let text = "resource \"aws_s3_bucket\" \"logs\" {\n  bucket = \"${var.name}\"\n}\n";
        let result = LintTool.run(text).await.unwrap();
        assert!(result.passed);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Deprecated interpolation"));
    }

    #[tokio::test]
    async fn test_security_tool_flags_open_ingress() {
        let text = r#"resource "aws_security_group" "web" {
  ingress {
    from_port   = 22
    to_port     = 22
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }
}
"#;
        let result = SecurityTool.run(text).await.unwrap();
        assert!(!result.passed);
        assert_eq!(
            result.errors,
            vec!["Security: security group 'web' allows ingress from 0.0.0.0/0 on port 22"]
        );
    }

    #[tokio::test]
    async fn test_security_tool_allows_open_tls() {
        let text = r#"resource "aws_security_group" "web" {
  ingress {
    from_port   = 443
    cidr_blocks = ["0.0.0.0/0"]
  }
}
"#;
        let result = SecurityTool.run(text).await.unwrap();
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_security_tool_bucket_checks() {
        let result = SecurityTool.run(CLEAN_BUCKET).await.unwrap();
        assert_eq!(
            result.errors,
            vec![
                "Security: S3 bucket 'artifacts' does not block public access",
                "Security: S3 bucket 'artifacts' is missing server-side encryption",
            ]
        );

        let hardened = r#"resource "aws_s3_bucket" "artifacts" {
  bucket = "artifacts"
}

resource "aws_s3_bucket_public_access_block" "artifacts" {
  bucket = aws_s3_bucket.artifacts.id
}

resource "aws_s3_bucket_server_side_encryption_configuration" "artifacts" {
  bucket = aws_s3_bucket.artifacts.id
}
"#;
        let result = SecurityTool.run(hardened).await.unwrap();
        assert!(result.passed);
        assert_eq!(result.messages, vec!["No security issues found"]);
    }

    #[tokio::test]
    async fn test_security_tool_detects_hardcoded_secret() {
        let text = r#"resource "aws_db_instance" "main" {
  username = "admin"
  password = "hunter2-longer"
}
"#;
        let result = SecurityTool.run(text).await.unwrap();
        assert_eq!(
            result.errors,
            vec!["Security: potential hardcoded password on line 3"]
        );
    }

    #[tokio::test]
    async fn test_secret_scan_skips_interpolations() {
        let text = "password = \"${var.db_password}\"\n";
        assert!(scan_for_secrets(text).is_empty());
    }
}
