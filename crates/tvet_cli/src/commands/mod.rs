//! CLI command definitions.
//!
//! This module defines the command structure for the terravet CLI.
//! Each subcommand maps to one stage of the analysis pipeline, with
//! `remediate` driving the full orchestrated loop.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

pub mod analyze;
pub mod remediate;
pub mod rules;
pub mod validate;

/// terravet - Infrastructure-as-code compliance analyzer
#[derive(Parser)]
#[command(name = "terravet")]
#[command(version, about = "terravet - Infrastructure-as-code compliance analyzer")]
#[command(long_about = r#"
terravet analyzes Terraform documents against a policy rule catalog,
validates them with a multi-tool pipeline, and can remediate common
findings automatically through an iterative refinement loop.

COMMANDS:
  analyze    → Score a document against the policy rules
  validate   → Run the multi-tool validation pipeline
  remediate  → Validate, refine and review in a full orchestrated run
  rules      → List or export the policy rule catalog

EXIT CODES:
  0 - Success
  1 - General error
  2 - Configuration error
  3 - Validation failure
  4 - Interrupted

For more information, visit: https://github.com/terravet/terravet
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a Terraform document against the policy rules
    Analyze(analyze::AnalyzeArgs),

    /// Run the multi-tool validation pipeline on a document
    Validate(validate::ValidateArgs),

    /// Run the full validate-refine-review loop on a document
    Remediate(remediate::RemediateArgs),

    /// List or export the policy rule catalog
    Rules(rules::RulesArgs),
}

/// Reads a document from a `.tf` file, or merges every `.tf` file
/// directly inside a directory in path order.
pub(crate) fn read_document(path: &Path) -> Result<String> {
    if path.is_dir() {
        let pattern = path.join("*.tf");
        let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
            .with_context(|| format!("Invalid path: {:?}", path))?
            .filter_map(|entry| entry.ok())
            .collect();
        files.sort();

        if files.is_empty() {
            anyhow::bail!("No .tf files found in {:?}", path);
        }

        let mut merged = String::new();
        for file in files {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            if !merged.is_empty() {
                merged.push('\n');
            }
            merged.push_str(&text);
        }
        Ok(merged)
    } else if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
    } else {
        anyhow::bail!("Path not found: {:?}", path)
    }
}

pub(crate) fn parse_category(raw: &str) -> Result<tvet_rules::Category> {
    let needle = raw.to_lowercase();
    tvet_rules::Category::ALL
        .into_iter()
        .find(|category| category.as_str() == needle)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown category '{}', expected one of: security, reliability, \
                 performance, cost, operations, sustainability",
                raw
            )
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_read_document_merges_directory_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_outputs.tf"), "output \"b\" {}\n").unwrap();
        std::fs::write(dir.path().join("a_main.tf"), "resource \"aws_instance\" \"a\" {}\n")
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let merged = read_document(dir.path()).unwrap();
        let a = merged.find("aws_instance").unwrap();
        let b = merged.find("output").unwrap();
        assert!(a < b);
        assert!(!merged.contains("ignored"));
    }

    #[test]
    fn test_read_document_rejects_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No .tf files found"));
    }

    #[test]
    fn test_read_document_single_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "locals {{}}").unwrap();
        let text = read_document(file.path()).unwrap();
        assert!(text.contains("locals"));
    }

    #[test]
    fn test_parse_category_is_case_insensitive() {
        assert_eq!(
            parse_category("Security").unwrap(),
            tvet_rules::Category::Security
        );
        assert!(parse_category("speed").is_err());
    }
}
