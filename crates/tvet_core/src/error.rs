//! Error types for run orchestration.

use crate::state::Phase;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("Document is empty, nothing to analyze")]
    EmptyDocument,

    #[error("Run task failed: {0}")]
    TaskFailed(String),
}
