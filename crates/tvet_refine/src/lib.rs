//! # tvet_refine
//!
//! Automated remediation for terravet validation findings.
//!
//! ## Features
//!
//! - **Fix planning**: maps tool findings to a small catalog of fixes
//!   (reformat, S3 public access block, server-side encryption,
//!   snake_case renames), one per recognized pattern
//! - **Safe application**: each fix is a pure text transform that either
//!   rewrites its anchor or is dropped; a refinement pass never fails
//!
//! Fixes are deliberately conservative. They insert companion resources
//! or rewrite names, but never delete user content.

pub mod engine;
pub mod fixes;

pub use engine::{FixKind, FixPlan, FixRecord, RefinementEngine, RefinementOutcome};
pub use fixes::{
    insert_encryption_config, insert_public_access_block, reindent, snake_case_names,
};
