//! Workflow type definitions.
//!
//! These mirror the parts of a GitHub Actions workflow the graph needs.
//! Fields the graph does not interpret are carried as opaque JSON so they
//! can still be shown in detail views.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::actions::{parse_action_ref, ActionRef};

/// Opaque passthrough fields, in document order.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// A complete workflow definition.
///
/// # Example YAML
///
/// ```yaml
/// name: CI
/// on: [push, pull_request]
///
/// jobs:
///   build:
///     runs-on: ubuntu-latest
///     steps:
///       - uses: actions/checkout@v4
///       - run: cargo build
///   test:
///     needs: build
///     runs-on: ubuntu-latest
///     steps:
///       - run: cargo test
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Display name of the workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Events that trigger the workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<Trigger>,

    /// Jobs keyed by job identifier, in document order
    pub jobs: IndexMap<String, Job>,

    /// Top-level fields not interpreted here (env, permissions, concurrency, ...)
    #[serde(flatten)]
    pub extra: Extra,
}

/// Workflow trigger: a single event, a list of events, or a detailed mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Trigger {
    Event(String),
    Events(Vec<String>),
    Detailed(Extra),
}

/// Runner selection for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunsOn {
    Label(String),
    Labels(Vec<String>),
}

impl std::fmt::Display for RunsOn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunsOn::Label(label) => write!(f, "{}", label),
            RunsOn::Labels(labels) => write!(f, "{}", labels.join(", ")),
        }
    }
}

/// A job in the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "runs-on", default, skip_serializing_if = "Option::is_none")]
    pub runs_on: Option<RunsOn>,

    /// Upstream jobs, always in list form
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,

    /// Raw condition expression, never evaluated
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A single step of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Action reference (`owner/repo@ref`, `./local`, `docker://image`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,

    /// Shell command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<serde_json::Value>,

    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Action,
    Script,
    Unknown,
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match (&self.uses, &self.run) {
            (Some(_), _) => StepKind::Action,
            (None, Some(_)) => StepKind::Script,
            (None, None) => StepKind::Unknown,
        }
    }

    /// Parsed `uses` reference, when it points at a GitHub repository.
    pub fn action_ref(&self) -> Option<ActionRef> {
        self.uses.as_deref().and_then(parse_action_ref)
    }

    /// Human-readable label: the step name, else the action, else the
    /// first line of the command.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(uses) = &self.uses {
            return uses.clone();
        }
        match self.run.as_deref().and_then(|run| run.lines().next()) {
            Some(line) if !line.trim().is_empty() => line.trim().to_string(),
            _ => "(unnamed step)".to_string(),
        }
    }
}

impl Workflow {
    /// Get a job by identifier.
    pub fn get_job(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Total number of `needs` references across all jobs.
    pub fn needs_count(&self) -> usize {
        self.jobs.values().map(|job| job.needs.len()).sum()
    }

    /// `needs` entries that name a job missing from the workflow, as
    /// `(job, missing dependency)` pairs.
    pub fn dangling_needs(&self) -> Vec<(&str, &str)> {
        self.jobs
            .iter()
            .flat_map(|(id, job)| {
                job.needs
                    .iter()
                    .filter(|dep| !self.jobs.contains_key(dep.as_str()))
                    .map(move |dep| (id.as_str(), dep.as_str()))
            })
            .collect()
    }
}
