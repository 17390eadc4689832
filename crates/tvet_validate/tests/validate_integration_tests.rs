//! Integration tests for the validation pipeline against realistic
//! Terraform documents.

use tvet_validate::{
    OverallStatus, PipelineConfig, ValidationPipeline, ValidationStatus, ValidationSummary,
};

const HARDENED_BUCKET: &str = r#"resource "aws_s3_bucket" "artifacts" {
  bucket = "terravet-artifacts"

  tags = {
    Environment = "production"
  }
}

resource "aws_s3_bucket_public_access_block" "artifacts" {
  bucket = aws_s3_bucket.artifacts.id

  block_public_acls = true
  block_public_policy = true
}

resource "aws_s3_bucket_server_side_encryption_configuration" "artifacts" {
  bucket = aws_s3_bucket.artifacts.id
}
"#;

const OPEN_SECURITY_GROUP: &str = r#"resource "aws_security_group" "web" {
  name = "web"

  ingress {
    from_port = 22
    to_port = 22
    protocol = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }
}
"#;

/// Test that a hardened document passes every built-in tool.
#[tokio::test]
async fn test_standard_pipeline_accepts_hardened_document() {
    let pipeline = ValidationPipeline::standard();
    let results = pipeline.run(HARDENED_BUCKET).await;
    assert_eq!(results.len(), 5);
    for result in &results {
        assert!(result.passed, "tool {} failed: {:?}", result.tool, result.errors);
    }
    let summary = ValidationSummary::from_results(&results);
    assert_eq!(summary.overall_status, OverallStatus::Passed);
    assert_eq!(summary.score, 100.0);
    assert!(summary.is_clean());
}

/// Test that an open security group fails only the security tool and is
/// classified critical.
#[tokio::test]
async fn test_open_ingress_is_critical() {
    let pipeline = ValidationPipeline::standard();
    let results = pipeline.run(OPEN_SECURITY_GROUP).await;
    let security = results
        .iter()
        .find(|r| r.tool == "security")
        .expect("security result");
    assert_eq!(security.status, ValidationStatus::Failed);
    assert!(security.errors[0].contains("allows ingress from 0.0.0.0/0"));
    let summary = ValidationSummary::from_results(&results);
    assert_eq!(summary.overall_status, OverallStatus::Critical);
    assert_eq!(summary.passed_tools, 4);
    assert!((summary.score - 80.0).abs() < 0.1);
    assert!(summary.has_critical_issues());
}

/// Test that running the same document twice yields identical outcomes.
#[tokio::test]
async fn test_pipeline_is_deterministic() {
    let pipeline = ValidationPipeline::standard();
    let first = pipeline.run(OPEN_SECURITY_GROUP).await;
    let second = pipeline.run(OPEN_SECURITY_GROUP).await;
    let digest = |results: &[tvet_validate::ValidationResult]| {
        results
            .iter()
            .map(|r| (r.tool.clone(), r.status, r.passed, r.errors.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(digest(&first), digest(&second));
}

/// Test the rendered pipeline report.
#[tokio::test]
async fn test_summary_render_names_failing_tool() {
    let pipeline = ValidationPipeline::new(PipelineConfig::default())
        .with_tool(std::sync::Arc::new(tvet_validate::SecurityTool))
        .with_tool(std::sync::Arc::new(tvet_validate::SyntaxTool));
    let results = pipeline.run(OPEN_SECURITY_GROUP).await;
    let summary = ValidationSummary::from_results(&results);
    let rendered = summary.render(&results);
    assert!(rendered.contains("Validation Pipeline Complete"));
    assert!(rendered.contains("security"));
    assert!(rendered.contains("Tools Passed: 1/2"));
}
