//! Plain-text DAG renderer for terminals.

use std::fmt::Write;

use super::layout::compute_layers;
use super::types::{GraphNode, WorkflowGraph};
use crate::wrkflw::ValidationStatus;

/// Render the graph layer by layer with box-drawn nodes.
///
/// Nodes that could not be layered are listed under a trailing
/// `unplaced` section together with their missing dependencies.
pub fn render_text(graph: &WorkflowGraph) -> String {
    if graph.is_empty() {
        return "  No jobs\n".to_string();
    }

    let layering = compute_layers(graph);
    let mut out = String::new();

    for (depth, layer) in layering.layers.iter().enumerate() {
        if depth > 0 {
            out.push_str("      \u{2502}\n");
        }
        let _ = writeln!(out, "Layer {}", depth);
        for (i, id) in layer.iter().enumerate() {
            if let Some(node) = graph.node(id) {
                let connector = if i == 0 && depth > 0 {
                    "\u{250C}\u{2500}"
                } else if i > 0 {
                    "\u{251C}\u{2500}"
                } else {
                    "  "
                };
                render_node(&mut out, node, connector);
            }
        }
    }

    if !layering.unplaced.is_empty() {
        out.push_str("Unplaced (cycle or missing dependency)\n");
        for id in &layering.unplaced {
            if let Some(node) = graph.node(id) {
                render_node(&mut out, node, "  ");
                let _ = writeln!(out, "     needs: {}", node.data.needs.join(", "));
            }
        }
    }

    out
}

fn render_node(out: &mut String, node: &GraphNode, connector: &str) {
    let width = node.label.chars().count() + 2;
    let rule = "\u{2500}".repeat(width);

    let mut detail = match &node.data.runs_on {
        Some(runs_on) => format!(" {} \u{00B7} {} steps", runs_on, node.data.step_count),
        None => format!(" {} steps", node.data.step_count),
    };
    if let Some(status) = node.data.validation_status {
        let icon = match status {
            ValidationStatus::Valid => "\u{2713}",
            ValidationStatus::Warning => "!",
            ValidationStatus::Error => "\u{2717}",
        };
        let _ = write!(detail, " {}", icon);
    }

    let _ = writeln!(out, "   {}\u{250C}{}\u{2510}", connector, rule);
    let _ = writeln!(out, "     \u{2502} {} \u{2502}{}", node.label, detail);
    let _ = writeln!(out, "     \u{2514}{}\u{2518}", rule);

    for issue in &node.data.validation_issues {
        let _ = writeln!(out, "       {}: {}", issue.severity, issue.message);
    }
}
