//! Job dependency graph.
//!
//! [`build_graph`] turns a parsed workflow into nodes and `needs` edges,
//! [`LayoutEngine`] positions the nodes in dependency layers, and
//! [`WorkflowGraph::apply_validation`] overlays validator findings.

mod builder;
mod layout;
mod render;
mod types;
mod validation;

pub use builder::build_graph;
pub use layout::{calculate_layout, compute_layers, Layering, LayoutConfig, LayoutEngine};
pub use render::render_text;
pub use types::{GraphEdge, GraphNode, JobNodeData, NodeKind, Position, WorkflowGraph, NEEDS_LABEL};
