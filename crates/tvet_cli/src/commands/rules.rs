//! Rules command - Inspect the policy rule catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use tvet_rules::{Category, RuleStore};

#[derive(Args)]
pub struct RulesArgs {
    /// Restrict the listing to one category
    #[arg(short, long)]
    category: Option<String>,

    /// Extra rule definitions to merge (YAML or JSON)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Export the catalog instead of listing it (yaml, json)
    #[arg(long)]
    export: Option<String>,
}

pub async fn execute(args: RulesArgs) -> Result<()> {
    let mut store = RuleStore::standard();
    if let Some(rules_path) = &args.rules {
        store
            .merge_file(rules_path)
            .with_context(|| format!("Failed to merge rule definitions from {:?}", rules_path))?;
    }

    if let Some(format) = &args.export {
        let rendered = match format.as_str() {
            "yaml" => store.to_yaml().context("Failed to export catalog")?,
            "json" => store.to_json_pretty().context("Failed to export catalog")?,
            other => anyhow::bail!("Unknown export format '{}', expected yaml or json", other),
        };
        println!("{}", rendered);
        return Ok(());
    }

    let categories: Vec<Category> = match &args.category {
        Some(raw) => vec![super::parse_category(raw)?],
        None => Category::ALL.to_vec(),
    };

    println!("Policy rule catalog ({} rules)", store.len());
    println!();
    for category in categories {
        let rules = store.rules_for_category(category);
        if rules.is_empty() {
            continue;
        }
        println!("{} ({})", category, rules.len());
        for rule in rules {
            println!(
                "  {:<24} [{}] {}",
                rule.id,
                rule.severity.as_str(),
                rule.title
            );
        }
        println!();
    }

    Ok(())
}
