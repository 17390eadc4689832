//! # tvet_validate
//!
//! Multi-tool validation pipeline for terravet.
//!
//! ## Features
//!
//! - **Tool abstraction**: async [`ValidationTool`] trait with five
//!   built-in offline tools (syntax, format, plan, lint, security)
//! - **Pipeline**: runs tools sequentially with per-tool timeouts and
//!   converts tool failures into failed results instead of aborting
//! - **Summary**: classifies findings by severity keywords, computes a
//!   pass-rate score and an overall status, and renders a console report
//!
//! Tools never touch the network or shell out; each one analyzes the
//! document text it is given.

pub mod error;
pub mod pipeline;
pub mod result;
pub mod summary;
pub mod tools;

pub use error::{ToolResult, ValidateError};
pub use pipeline::{PipelineConfig, ValidationPipeline, ValidationTool};
pub use result::{ValidationResult, ValidationStatus};
pub use summary::{ClassifiedIssue, IssueKind, OverallStatus, ValidationSummary};
pub use tools::{canonical_format, FormatTool, LintTool, PlanTool, SecurityTool, SyntaxTool};
