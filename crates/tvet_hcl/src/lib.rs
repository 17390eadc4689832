//! # tvet_hcl
//!
//! Best-effort structural extraction of Terraform-style documents for
//! terravet.
//!
//! ## Features
//!
//! - **Structural parsing**: full block-grammar parse of resources,
//!   variables, outputs, locals and terraform settings
//! - **Pattern fallback**: when the grammar parse fails, a scanning pass
//!   recovers top-level blocks and their surface attributes, recording the
//!   degradation as a diagnostic instead of failing
//! - **Syntax checks**: cheap plausibility checks (brace/quote balance,
//!   recognizable blocks) usable as a validation gate
//!
//! Extraction is a pure function of the input text; unparseable input
//! yields an empty model with diagnostics, never an error.

pub mod error;
pub mod extract;
pub mod model;
pub mod syntax;

pub use error::{HclError, HclResult};
pub use extract::{resource_references, Extractor};
pub use model::{
    is_truthy, Diagnostic, DiagnosticSeverity, DocumentModel, Output, Resource, Variable,
};
pub use syntax::check_syntax;
