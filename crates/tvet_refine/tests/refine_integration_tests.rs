//! Integration tests for the validate-refine loop.

use tvet_hcl::Extractor;
use tvet_refine::RefinementEngine;
use tvet_validate::{ValidationPipeline, ValidationSummary};

const ROUGH_BUCKET: &str = r#"resource "aws_s3_bucket" "reports" {
bucket = "terravet-reports"
}
"#;

/// Test that repeated validate-refine rounds drive a rough document to a
/// fully passing state.
#[tokio::test]
async fn test_validate_refine_loop_converges() {
    let pipeline = ValidationPipeline::standard();
    let engine = RefinementEngine::new();
    let mut text = ROUGH_BUCKET.to_string();
    let mut rounds = 0;
    loop {
        let results = pipeline.run(&text).await;
        let summary = ValidationSummary::from_results(&results);
        if summary.is_clean() {
            break;
        }
        rounds += 1;
        assert!(rounds <= 4, "loop failed to converge: {summary:?}");
        text = engine.refine(&text, &results).text;
    }
    assert!(text.contains("aws_s3_bucket_public_access_block"));
    assert!(text.contains("aws_s3_bucket_server_side_encryption_configuration"));

    let model = Extractor::new().extract(&text, "refined");
    assert_eq!(model.resource_count(), 3);
    assert!(!model.has_error_diagnostics());
}

/// Test that refinement leaves an already-clean document alone.
#[tokio::test]
async fn test_clean_document_needs_no_fixes() {
    let text = r#"resource "aws_instance" "app" {
  ami = "ami-0d2f97c8735a48a15"
  instance_type = "t3.micro"
}
"#;
    let pipeline = ValidationPipeline::standard();
    let results = pipeline.run(text).await;
    let plan = RefinementEngine::new().plan(&results);
    assert_eq!(plan.total_issues, 0);
    assert!(plan.is_empty());
}
