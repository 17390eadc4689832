//! # tvet_rules
//!
//! Policy rules and compliance analysis for terravet.
//!
//! ## Features
//!
//! - **Typed rule catalog**: 21 built-in rules across six categories
//!   inspired by well-architected frameworks, extendable from YAML/JSON
//!   definition files
//! - **Exhaustive evaluation**: rule kinds are a closed sum type dispatched
//!   at compile time; a failing rule is logged and skipped, never aborting
//!   the pass
//! - **Weighted scoring**: issues aggregate into a 0-100 compliance score
//!   relative to the worst case for the resource set
//! - **Provider knowledge**: pluggable best-practice lookups with a
//!   read-through cache and graceful offline degradation

pub mod advisor;
mod catalog;
pub mod error;
pub mod evaluator;
pub mod report;
pub mod rules;

pub use advisor::{CachedKnowledge, KnowledgeSource, StaticKnowledge};
pub use error::{RulesError, RulesResult};
pub use evaluator::Evaluator;
pub use report::{
    aggregate, compliance_score, AnalysisReport, Issue, IssueCounts, ReportMetadata,
};
pub use rules::{Category, Rule, RuleKind, RuleStore, Severity};
