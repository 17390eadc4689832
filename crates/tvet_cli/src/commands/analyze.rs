//! Analyze command - Score a Terraform document against the policy rules.
//!
//! This command extracts the document model, evaluates every applicable
//! rule and prints the aggregated compliance report.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use tvet_hcl::Extractor;
use tvet_rules::{aggregate, Evaluator, RuleStore};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Terraform file or directory to analyze
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Extra rule definitions to merge (YAML or JSON)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Restrict the pass to one category
    #[arg(short, long)]
    category: Option<String>,

    /// Minimum passing score (0-100)
    #[arg(long, default_value_t = 0.0)]
    min_score: f64,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

pub async fn execute(args: AnalyzeArgs) -> Result<()> {
    info!("Analyzing: {:?}", args.path);

    let extractor = Extractor::new();
    let model = if args.path.is_dir() {
        extractor.extract_dir(&args.path)
    } else {
        extractor.extract_file(&args.path)
    }?;

    let mut store = RuleStore::standard();
    if let Some(rules_path) = &args.rules {
        store
            .merge_file(rules_path)
            .with_context(|| format!("Failed to merge rule definitions from {:?}", rules_path))?;
        info!("Merged rule definitions from {:?}", rules_path);
    }
    let evaluator = Evaluator::new(Arc::new(store));

    let source = args.path.display().to_string();
    let report = match &args.category {
        Some(raw) => {
            let category = super::parse_category(raw)?;
            let issues = evaluator.evaluate_categories(&model, &[category]);
            let mut report = aggregate(issues, model.resource_count(), source);
            report.metadata.categories = vec![category];
            report
        }
        None => evaluator.analyze(&model, source),
    };

    // Output results
    if args.format == "json" {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        println!("{}", report.render());
    }

    // Exit with appropriate code
    if report.passes(args.min_score) {
        println!();
        println!("✅ Compliance check PASSED ({:.1}/100)", report.score);
        Ok(())
    } else {
        println!();
        println!(
            "❌ Compliance score {:.1} below required {:.1}",
            report.score, args.min_score
        );
        // Exit with validation failure code
        std::process::exit(3);
    }
}
