//! Workflow model and parsing.
//!
//! A workflow document is decoded into a generic value tree, then normalized
//! into typed jobs and steps:
//! - `needs` always becomes a list
//! - `runs-on` becomes a single label or a label list
//! - everything else the graph does not interpret is kept as opaque JSON

mod normalize;
mod parser;
mod types;

pub use normalize::{normalize, normalize_needs, normalize_runs_on, INVALID_WORKFLOW};
pub use parser::{parse_result_json, parse_workflow, parse_workflow_file};
pub use types::*;
