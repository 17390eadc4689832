//! Error types for document extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for extraction operations.
pub type HclResult<T> = Result<T, HclError>;

/// Errors that can occur while reading documents from disk.
///
/// Parsing itself never errors: unparseable text degrades to an empty
/// model with diagnostics attached.
#[derive(Error, Debug)]
pub enum HclError {
    #[error("Document not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Not a Terraform document: {0}")]
    NotTerraform(PathBuf),

    #[error("Invalid glob pattern for {path}: {message}")]
    InvalidPattern { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
