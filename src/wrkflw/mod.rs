//! Integration with the external `wrkflw` validator and runner.
//!
//! Validation is a read-only subprocess call whose JSON result can be
//! overlaid onto a graph with [`crate::graph::WorkflowGraph::apply_validation`].
//! Running a workflow is handed off entirely to `wrkflw run`.

mod runner;
mod types;

pub use runner::{parse_validate_output, Wrkflw};
pub use types::{Severity, ValidationIssue, ValidationResult, ValidationStatus};
