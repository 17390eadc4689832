//! Error types for the validation pipeline.

use thiserror::Error;

/// Result type alias for validation tool invocations.
pub type ToolResult<T> = Result<T, ValidateError>;

/// Errors a validation tool may surface.
///
/// The pipeline never propagates these; a failing tool is converted into a
/// synthetic failed [`crate::ValidationResult`] so one broken tool cannot
/// take down the whole pass.
#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("Tool {tool} failed: {message}")]
    ToolFailed { tool: String, message: String },
}

impl ValidateError {
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
