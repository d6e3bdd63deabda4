//! Layered top-to-bottom layout.
//!
//! Jobs are grouped into layers with Kahn's algorithm: layer 0 holds every
//! job without dependencies, and each following layer holds the jobs whose
//! last dependency was released by the previous layer. Layers stack downward;
//! each layer is centered on `x = 0`.
//!
//! Jobs caught in a cycle, or waiting on a job that does not exist, never
//! reach in-degree zero. They are left out of every layer and placed at the
//! origin.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{Position, WorkflowGraph};

/// Node box and spacing, in logical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_node_width")]
    pub node_width: f64,
    #[serde(default = "default_node_height")]
    pub node_height: f64,
    #[serde(default = "default_horizontal_gap")]
    pub horizontal_gap: f64,
    #[serde(default = "default_vertical_gap")]
    pub vertical_gap: f64,
    /// Offset of the first layer from the top
    #[serde(default = "default_top_margin")]
    pub top_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: default_node_width(),
            node_height: default_node_height(),
            horizontal_gap: default_horizontal_gap(),
            vertical_gap: default_vertical_gap(),
            top_margin: default_top_margin(),
        }
    }
}

fn default_node_width() -> f64 {
    200.0
}

fn default_node_height() -> f64 {
    80.0
}

fn default_horizontal_gap() -> f64 {
    40.0
}

fn default_vertical_gap() -> f64 {
    80.0
}

fn default_top_margin() -> f64 {
    50.0
}

impl LayoutConfig {
    /// Position of the `index`-th node in a layer of `layer_len` nodes.
    pub fn position(&self, layer: usize, index: usize, layer_len: usize) -> Position {
        let column = self.node_width + self.horizontal_gap;
        let row = self.node_height + self.vertical_gap;
        let start_x = -((layer_len as f64) - 1.0) * column / 2.0;
        Position::new(
            start_x + index as f64 * column,
            layer as f64 * row + self.top_margin,
        )
    }
}

/// Result of layering a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layering {
    /// Node ids per layer, top to bottom
    pub layers: Vec<Vec<String>>,
    /// Node ids that never reached in-degree zero, in node order
    pub unplaced: Vec<String>,
}

impl Layering {
    /// Layer index of a node, if it was placed.
    pub fn layer_of(&self, id: &str) -> Option<usize> {
        self.layers
            .iter()
            .position(|layer| layer.iter().any(|n| n == id))
    }
}

/// Group the graph's nodes into dependency layers.
pub fn compute_layers(graph: &WorkflowGraph) -> Layering {
    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(graph.nodes.len());
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::with_capacity(graph.nodes.len());

    for node in &graph.nodes {
        in_degree.insert(node.id.as_str(), 0);
        adjacency.insert(node.id.as_str(), Vec::new());
    }

    for edge in &graph.edges {
        // An unknown source never fires, so its target keeps this count forever.
        if let Some(targets) = adjacency.get_mut(edge.source.as_str()) {
            targets.push(edge.target.as_str());
        }
        if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
            *degree += 1;
        }
    }

    let mut layers: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<&str> = graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    while !current.is_empty() {
        let mut next: Vec<&str> = Vec::new();
        for node_id in &current {
            let Some(targets) = adjacency.get(node_id) else {
                continue;
            };
            for target in targets {
                if let Some(degree) = in_degree.get_mut(target) {
                    if *degree > 0 {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(*target);
                        }
                    }
                }
            }
        }
        layers.push(current.iter().map(|id| id.to_string()).collect());
        current = next;
    }

    let unplaced = graph
        .nodes
        .iter()
        .filter(|n| in_degree.get(n.id.as_str()).is_some_and(|d| *d > 0))
        .map(|n| n.id.clone())
        .collect();

    Layering { layers, unplaced }
}

/// Assigns positions to graph nodes.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Set the position of every node in `graph`.
    ///
    /// This is the only place positions are written. Nodes outside every
    /// layer get the origin.
    pub fn apply(&self, graph: &mut WorkflowGraph) {
        let layering = compute_layers(graph);

        let mut positions: HashMap<&str, Position> = HashMap::new();
        for (layer_index, layer) in layering.layers.iter().enumerate() {
            for (index, node_id) in layer.iter().enumerate() {
                positions.insert(
                    node_id.as_str(),
                    self.config.position(layer_index, index, layer.len()),
                );
            }
        }

        if !layering.unplaced.is_empty() {
            warn!(
                unplaced = ?layering.unplaced,
                "jobs in a cycle or waiting on a missing job were placed at the origin"
            );
        }

        for node in &mut graph.nodes {
            let position = positions.get(node.id.as_str()).copied().unwrap_or_default();
            node.position = Some(position);
        }

        debug!(
            layers = layering.layers.len(),
            nodes = graph.nodes.len(),
            "laid out workflow graph"
        );
    }
}

/// Lay out `graph` with the default geometry.
pub fn calculate_layout(graph: &mut WorkflowGraph) {
    LayoutEngine::default().apply(graph);
}
