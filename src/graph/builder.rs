//! Workflow to graph transformation.

use tracing::debug;

use super::types::{GraphEdge, GraphNode, JobNodeData, NodeKind, WorkflowGraph};
use crate::workflow::Workflow;

/// Build the job graph for a workflow. Nodes carry no position yet.
///
/// Nodes follow job order. Edges follow job order, then each job's `needs`
/// order. References to missing jobs still produce an edge.
pub fn build_graph(workflow: &Workflow) -> WorkflowGraph {
    let nodes: Vec<GraphNode> = workflow
        .jobs
        .iter()
        .map(|(job_id, job)| {
            let label = job.name.clone().unwrap_or_else(|| job_id.clone());
            GraphNode {
                id: job_id.clone(),
                kind: NodeKind::Job,
                label: label.clone(),
                data: JobNodeData {
                    name: label,
                    runs_on: job.runs_on.clone(),
                    needs: job.needs.clone(),
                    step_count: job.steps.len(),
                    steps: job.steps.clone(),
                    validation_status: None,
                    validation_issues: Vec::new(),
                },
                position: None,
            }
        })
        .collect();

    let edges: Vec<GraphEdge> = workflow
        .jobs
        .iter()
        .flat_map(|(job_id, job)| {
            job.needs
                .iter()
                .map(move |needed| GraphEdge::needs(needed, job_id))
        })
        .collect();

    debug!(nodes = nodes.len(), edges = edges.len(), "built workflow graph");
    WorkflowGraph { nodes, edges }
}

impl From<&Workflow> for WorkflowGraph {
    fn from(workflow: &Workflow) -> Self {
        build_graph(workflow)
    }
}
