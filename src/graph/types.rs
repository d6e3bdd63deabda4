//! Graph types handed to renderers.

use serde::{Deserialize, Serialize};

use crate::actions::{parse_action_ref, ActionRef};
use crate::error::Result;
use crate::workflow::{RunsOn, Step};
use crate::wrkflw::{ValidationIssue, ValidationStatus};

/// Top-left anchor of a node in logical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node type tag. Every node is a job today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Job,
}

/// Job summary carried by a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNodeData {
    /// Job name, or the job id when the job has no name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs_on: Option<RunsOn>,
    pub needs: Vec<String>,
    pub step_count: usize,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<ValidationStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_issues: Vec<ValidationIssue>,
}

/// One node per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    pub data: JobNodeData,
    /// Set by the layout step; `None` before layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// One edge per `needs` entry, pointing from the needed job to the dependent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

/// Label carried by every dependency edge.
pub const NEEDS_LABEL: &str = "needs";

impl GraphEdge {
    /// Edge for `target` needing `source`; the id is `"<source>-<target>"`.
    pub fn needs(source: &str, target: &str) -> Self {
        Self {
            id: format!("{}-{}", source, target),
            source: source.to_string(),
            target: target.to_string(),
            label: NEEDS_LABEL.to_string(),
        }
    }
}

/// Renderable job graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl WorkflowGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by job id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Whether every node has been positioned.
    pub fn is_laid_out(&self) -> bool {
        self.nodes.iter().all(|n| n.position.is_some())
    }

    /// Edges whose source is not a node in this graph.
    pub fn dangling_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges
            .iter()
            .filter(move |edge| self.node(&edge.source).is_none())
    }

    /// Render as YAML with the same field names as the JSON form.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Distinct `owner/repo[@version]` references used by steps, in node
    /// and step order.
    pub fn action_refs(&self) -> Vec<ActionRef> {
        let mut refs: Vec<ActionRef> = Vec::new();
        let uses = self
            .nodes
            .iter()
            .flat_map(|node| node.data.steps.iter())
            .filter_map(|step| step.uses.as_deref());

        for reference in uses {
            if let Some(parsed) = parse_action_ref(reference) {
                if !refs.contains(&parsed) {
                    refs.push(parsed);
                }
            }
        }
        refs
    }
}
