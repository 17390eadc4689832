//! Per-tool validation outcomes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Outcome classification of a single tool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Failed,
    Warning,
}

/// The record of one tool invocation. Never mutated after the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub tool: String,
    pub status: ValidationStatus,
    pub passed: bool,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ValidationResult {
    fn new(tool: impl Into<String>, status: ValidationStatus, passed: bool) -> Self {
        Self {
            tool: tool.into(),
            status,
            passed,
            messages: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            duration_seconds: 0.0,
            metadata: HashMap::new(),
        }
    }

    pub fn passed(tool: impl Into<String>) -> Self {
        Self::new(tool, ValidationStatus::Passed, true)
    }

    pub fn failed(tool: impl Into<String>) -> Self {
        Self::new(tool, ValidationStatus::Failed, false)
    }

    /// Soft failure: the tool objects but the document is usable.
    pub fn warning(tool: impl Into<String>) -> Self {
        Self::new(tool, ValidationStatus::Warning, false)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors.extend(errors.into_iter().map(Into::into));
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings<I, S>(mut self, warnings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.warnings.extend(warnings.into_iter().map(Into::into));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }
}
