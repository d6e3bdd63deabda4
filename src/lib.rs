//! yamlviz - GitHub Actions workflow dependency graphs
//!
//! yamlviz reads a GitHub Actions workflow, turns every job into a node and
//! every `needs` entry into an edge, and places the nodes in top-to-bottom
//! dependency layers ready for a renderer.
//!
//! ## Pipeline
//!
//! - [`yaml::decode`]: tolerant YAML decoder producing a generic value tree
//! - [`workflow::parse_workflow`]: typed workflow model, `needs` normalized to lists
//! - [`graph::build_graph`]: one node per job, one edge per dependency
//! - [`graph::LayoutEngine`]: Kahn layering with centered rows
//!
//! The pipeline is synchronous and pure. Validation through the `wrkflw` CLI
//! and action metadata lookups against GitHub live in [`wrkflw`] and
//! [`actions`].
//!
//! ## Example
//!
//! ```
//! let graph = yamlviz::yaml_to_graph(
//!     "jobs:\n  build:\n    runs-on: ubuntu-latest\n  test:\n    needs: build\n",
//! )
//! .unwrap();
//!
//! assert_eq!(graph.edges[0].id, "build-test");
//! assert_eq!(graph.node("test").unwrap().position.unwrap().y, 210.0);
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod graph;
pub mod workflow;
pub mod wrkflw;
pub mod yaml;

pub use error::{Error, ParseError, ParseResult, Result};

use graph::{build_graph, LayoutConfig, LayoutEngine, WorkflowGraph};

/// Parse, build and lay out a workflow with the default geometry.
///
/// Returns `None` when the text is not a workflow with a `jobs` mapping.
pub fn yaml_to_graph(text: &str) -> Option<WorkflowGraph> {
    yaml_to_graph_with(text, &LayoutConfig::default())
}

/// [`yaml_to_graph`] with custom geometry.
pub fn yaml_to_graph_with(text: &str, layout: &LayoutConfig) -> Option<WorkflowGraph> {
    let workflow = match workflow::parse_workflow(text) {
        Ok(workflow) => workflow,
        Err(e) => {
            tracing::debug!(error = %e, "workflow did not parse");
            return None;
        }
    };
    let mut graph = build_graph(&workflow);
    LayoutEngine::new(layout.clone()).apply(&mut graph);
    Some(graph)
}
