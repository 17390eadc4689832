//! Validate command - Run the multi-tool validation pipeline.
//!
//! This command runs the standard tool chain (syntax, format, plan, lint,
//! security) against a document and reports the classified summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use tvet_validate::{OverallStatus, ValidationPipeline, ValidationResult, ValidationSummary};

#[derive(Args)]
pub struct ValidateArgs {
    /// Terraform file or directory to validate
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    summary: &'a ValidationSummary,
    results: &'a [ValidationResult],
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    info!("Validating: {:?}", args.path);

    let text = super::read_document(&args.path)?;
    let pipeline = ValidationPipeline::standard();
    let results = pipeline.run(&text).await;
    let summary = ValidationSummary::from_results(&results);

    // Output results
    if args.format == "json" {
        let output = ValidateOutput {
            summary: &summary,
            results: &results,
        };
        let json =
            serde_json::to_string_pretty(&output).context("Failed to serialize results")?;
        println!("{}", json);
    } else {
        println!("{}", summary.render(&results));
    }

    // Exit with appropriate code
    match summary.overall_status {
        OverallStatus::Failed | OverallStatus::Critical => {
            println!();
            println!("❌ Validation FAILED");
            // Exit with validation failure code
            std::process::exit(3);
        }
        _ => {
            println!();
            println!("✅ Validation PASSED");
            Ok(())
        }
    }
}
