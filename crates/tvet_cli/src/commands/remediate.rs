//! Remediate command - Run the full validate-refine-review loop.
//!
//! This command drives a document through the orchestrated run: extract,
//! validate, apply automated fixes, re-validate until clean or the
//! iteration budget runs out, then review. Ctrl-C cancels cooperatively
//! at the next decision point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use tvet_core::{Orchestrator, OrchestratorConfig, RunOutcome, RunStatus};

#[derive(Args)]
pub struct RemediateArgs {
    /// Terraform file or directory to remediate
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Refinement rounds allowed before the run is forced to review
    #[arg(long, default_value_t = 5)]
    max_iterations: usize,

    /// Write the full run outcome as JSON to a file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rewrite the input file with the refined text
    #[arg(long)]
    write: bool,

    /// Mark the run failed when critical findings remain
    #[arg(long)]
    fail_on_critical: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

pub async fn execute(args: RemediateArgs) -> Result<()> {
    if args.write && !args.path.is_file() {
        anyhow::bail!("--write requires a single .tf file, got {:?}", args.path);
    }

    info!("Remediating: {:?}", args.path);

    let text = super::read_document(&args.path)?;
    let config = OrchestratorConfig::default()
        .with_max_iterations(args.max_iterations)
        .with_fail_on_critical(args.fail_on_critical);
    let orchestrator = Orchestrator::new(config);

    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let source = args.path.display().to_string();
    let outcome = orchestrator.run(&text, &source).await?;

    if let Some(output_path) = &args.output {
        let json =
            serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        info!("Run outcome written to {:?}", output_path);
    }

    if args.write && outcome.status != RunStatus::Cancelled {
        std::fs::write(&args.path, &outcome.text)
            .with_context(|| format!("Failed to write {:?}", args.path))?;
        info!("Refined document written back to {:?}", args.path);
    }

    // Output results
    if args.format == "json" {
        let json =
            serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?;
        println!("{}", json);
    } else {
        print_outcome(&outcome);
    }

    // Exit with appropriate code
    match outcome.status {
        RunStatus::Cancelled => {
            println!();
            println!("❌ Remediation INTERRUPTED");
            // Exit with interrupted code
            std::process::exit(4);
        }
        RunStatus::Failed => {
            println!();
            println!("❌ Remediation FAILED");
            // Exit with validation failure code
            std::process::exit(3);
        }
        _ => {
            println!();
            println!("✅ Remediation COMPLETE");
            Ok(())
        }
    }
}

fn print_outcome(outcome: &RunOutcome) {
    println!("Run:        {}", outcome.run_id);
    println!("Status:     {}", outcome.status);
    println!("Iterations: {}", outcome.iterations);
    println!("Resources:  {}", outcome.resource_count);

    if let Some(summary) = &outcome.summary {
        println!(
            "Validation: {}/{} tools passed ({:.1}/100)",
            summary.passed_tools, summary.total_tools, summary.score
        );
    }
    if let Some(report) = &outcome.report {
        println!("Compliance: {:.1}/100", report.score);
    }
    if let Some(review) = &outcome.review {
        println!(
            "Review:     {:.1}/100 ({})",
            review.overall_score, review.verdict
        );
    }

    if !outcome.fixes_applied.is_empty() {
        println!();
        println!("Fixes applied:");
        for fix in &outcome.fixes_applied {
            println!("  - {} ({})", fix.description, fix.source_tool);
        }
    }
}
