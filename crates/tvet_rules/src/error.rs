//! Error types for the rules module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rule operations.
pub type RulesResult<T> = Result<T, RulesError>;

/// Errors that can occur while loading or evaluating rules.
///
/// Only load-time problems are hard errors; evaluation failures are caught
/// per rule and logged by the evaluator.
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Rule definition file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported rule file format: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("Rule {rule} evaluation failed: {message}")]
    EvaluationFailed { rule: String, message: String },

    #[error("Knowledge lookup failed for {provider}/{resource_type}: {message}")]
    KnowledgeUnavailable {
        provider: String,
        resource_type: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
