//! Overlay of validator findings onto graph nodes.

use tracing::debug;

use super::types::WorkflowGraph;
use crate::wrkflw::{Severity, ValidationResult, ValidationStatus};

impl WorkflowGraph {
    /// Attach the issues reported for each job to its node and set the node
    /// status: `error` if any issue is an error, `warning` if any is a
    /// warning, `valid` otherwise.
    ///
    /// Issues without a job id stay on the result. Applying again replaces
    /// the previous overlay.
    pub fn apply_validation(&mut self, result: &ValidationResult) {
        let mut flagged = 0usize;
        for node in &mut self.nodes {
            let issues: Vec<_> = result
                .issues
                .iter()
                .filter(|issue| issue.job_id.as_deref() == Some(node.id.as_str()))
                .cloned()
                .collect();

            let status = if issues.iter().any(|i| i.severity == Severity::Error) {
                ValidationStatus::Error
            } else if issues.iter().any(|i| i.severity == Severity::Warning) {
                ValidationStatus::Warning
            } else {
                ValidationStatus::Valid
            };
            if status != ValidationStatus::Valid {
                flagged += 1;
            }

            node.data.validation_status = Some(status);
            node.data.validation_issues = issues;
        }
        debug!(
            flagged,
            workflow_issues = result.workflow_issues().count(),
            "applied validation overlay"
        );
    }
}
