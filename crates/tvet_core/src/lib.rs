//! # tvet_core
//!
//! Run orchestration for terravet: a small state machine that drives a
//! document through extraction, validation, refinement and analysis to a
//! reviewed outcome.
//!
//! ## Features
//!
//! - **State machine**: fixed phase graph with validated transitions and
//!   pure decision functions
//! - **Orchestrator**: async loop with an iteration budget, cooperative
//!   cancellation at decide checkpoints, and semaphore-capped batch runs
//! - **Composite review**: structure, compliance, validation and
//!   best-practice scores averaged into a final verdict
//!
//! The iteration budget is the termination guarantee: every refinement
//! round increments it, and an exhausted budget forces review.

pub mod error;
pub mod machine;
pub mod orchestrator;
pub mod review;
pub mod state;

pub use error::{CoreError, CoreResult};
pub use machine::{after_analysis, decide, validate_transition};
pub use orchestrator::{CancelHandle, Orchestrator, OrchestratorConfig};
pub use review::{review, Review, ReviewVerdict};
pub use state::{Decision, Phase, RunOutcome, RunState, RunStatus};
