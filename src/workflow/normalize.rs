//! Mapping from the decoded value tree to the typed workflow model.
//!
//! Every "string or list" field is coerced here, once, so consumers only ever
//! see the normalized form.

use tracing::{debug, trace};

use super::types::{Extra, Job, RunsOn, Step, Trigger, Workflow};
use crate::error::{ParseError, ParseResult};
use crate::yaml::{Mapping, Value};

/// Message reported when the document has no `jobs` mapping.
pub const INVALID_WORKFLOW: &str = "Invalid GitHub Workflow YAML";

/// Build a [`Workflow`] from a decoded document.
///
/// The only structural requirement is a `jobs` key holding a mapping.
pub fn normalize(root: Value) -> ParseResult<Workflow> {
    let mut root = match root {
        Value::Mapping(map) => map,
        other => {
            debug!(kind = other.type_name(), "workflow root is not a mapping");
            return Err(ParseError::new(INVALID_WORKFLOW));
        }
    };

    let jobs = match root.shift_remove("jobs") {
        Some(Value::Mapping(jobs)) => jobs,
        other => {
            let kind = other.as_ref().map_or("missing", |v| v.type_name());
            debug!(jobs = kind, "workflow has no jobs mapping");
            return Err(ParseError::new(INVALID_WORKFLOW));
        }
    };

    let name = take_string(&mut root, "name");
    let on = root.shift_remove("on").and_then(normalize_trigger);
    let jobs = jobs
        .into_iter()
        .map(|(id, value)| {
            let job = normalize_job(&id, value);
            (id, job)
        })
        .collect();

    Ok(Workflow {
        name,
        on,
        jobs,
        extra: into_extra(root),
    })
}

/// `needs`: absent or null becomes an empty list, a scalar a one-element
/// list, a list passes through unchanged.
pub fn normalize_needs(needs: Option<Value>) -> Vec<String> {
    match needs {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items.iter().filter_map(sequence_string).collect(),
        Some(other) => other.scalar_to_string().into_iter().collect(),
    }
}

/// `runs-on`: absent stays absent, a scalar is a single label, a list is
/// kept as labels.
pub fn normalize_runs_on(runs_on: Option<Value>) -> Option<RunsOn> {
    match runs_on? {
        Value::Sequence(items) => Some(RunsOn::Labels(
            items.iter().filter_map(sequence_string).collect(),
        )),
        other => other.scalar_to_string().map(RunsOn::Label),
    }
}

fn normalize_trigger(on: Value) -> Option<Trigger> {
    match on {
        Value::Null => None,
        Value::Sequence(items) => Some(Trigger::Events(
            items.iter().filter_map(sequence_string).collect(),
        )),
        Value::Mapping(map) => Some(Trigger::Detailed(into_extra(map))),
        other => other.scalar_to_string().map(Trigger::Event),
    }
}

fn normalize_job(id: &str, value: Value) -> Job {
    let mut map = match value {
        Value::Mapping(map) => map,
        other => {
            debug!(job = id, kind = other.type_name(), "job is not a mapping, using empty job");
            return Job::default();
        }
    };

    let runs_on = match map.shift_remove("runs-on") {
        Some(value) => Some(value),
        None => map.shift_remove("runsOn"),
    };
    map.shift_remove("runsOn");

    let steps = match map.shift_remove("steps") {
        Some(Value::Sequence(items)) => items.into_iter().map(normalize_step).collect(),
        Some(other) => {
            trace!(job = id, kind = other.type_name(), "ignoring non-list steps");
            Vec::new()
        }
        None => Vec::new(),
    };

    Job {
        name: take_string(&mut map, "name"),
        runs_on: normalize_runs_on(runs_on),
        needs: normalize_needs(map.shift_remove("needs")),
        condition: take_string(&mut map, "if"),
        steps,
        permissions: take_json(&mut map, "permissions"),
        env: take_json(&mut map, "env"),
        defaults: take_json(&mut map, "defaults"),
        outputs: take_json(&mut map, "outputs"),
        extra: into_extra(map),
    }
}

fn normalize_step(value: Value) -> Step {
    let mut map = match value {
        Value::Mapping(map) => map,
        other => {
            trace!(kind = other.type_name(), "step is not a mapping, using empty step");
            return Step::default();
        }
    };

    Step {
        name: take_string(&mut map, "name"),
        id: take_string(&mut map, "id"),
        uses: take_string(&mut map, "uses"),
        run: take_string(&mut map, "run"),
        with: take_json(&mut map, "with"),
        env: take_json(&mut map, "env"),
        condition: take_string(&mut map, "if"),
        extra: into_extra(map),
    }
}

fn sequence_string(item: &Value) -> Option<String> {
    let text = item.scalar_to_string();
    if text.is_none() {
        trace!(kind = item.type_name(), "skipping non-scalar list entry");
    }
    text
}

fn take_string(map: &mut Mapping, key: &str) -> Option<String> {
    map.shift_remove(key).and_then(|v| v.scalar_to_string())
}

fn take_json(map: &mut Mapping, key: &str) -> Option<serde_json::Value> {
    map.shift_remove(key).map(Into::into)
}

fn into_extra(map: Mapping) -> Extra {
    map.into_iter().map(|(k, v)| (k, v.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::decode;

    fn normalize_yaml(yaml: &str) -> ParseResult<Workflow> {
        normalize(decode(yaml).unwrap())
    }

    #[test]
    fn test_normalize_needs_forms() {
        assert!(normalize_needs(None).is_empty());
        assert!(normalize_needs(Some(Value::Null)).is_empty());
        assert_eq!(
            normalize_needs(Some(Value::String("build".into()))),
            vec!["build"]
        );
        assert_eq!(
            normalize_needs(Some(Value::Sequence(vec![
                Value::String("b".into()),
                Value::String("a".into()),
                Value::String("b".into()),
            ]))),
            vec!["b", "a", "b"]
        );
    }

    #[test]
    fn test_needs_list_drops_null_and_nested_entries() {
        let workflow = normalize_yaml(
            "jobs:\n  a: {}\n  b:\n    needs: [a, ~, null, [x], {y: 1}, 7]\n",
        )
        .unwrap();
        assert_eq!(workflow.jobs["b"].needs, vec!["a", "7"]);
        assert_eq!(normalize_needs(Some(Value::Sequence(vec![Value::Null]))), Vec::<String>::new());
    }

    #[test]
    fn test_normalize_runs_on_forms() {
        assert_eq!(normalize_runs_on(None), None);
        assert_eq!(
            normalize_runs_on(Some(Value::String("ubuntu-latest".into()))),
            Some(RunsOn::Label("ubuntu-latest".into()))
        );
        assert_eq!(
            normalize_runs_on(Some(Value::Sequence(vec![
                Value::String("self-hosted".into()),
                Value::String("x64".into()),
            ]))),
            Some(RunsOn::Labels(vec!["self-hosted".into(), "x64".into()]))
        );
    }

    #[test]
    fn test_missing_jobs_is_invalid() {
        let err = normalize_yaml("name: nothing here\n").unwrap_err();
        assert_eq!(err.message, INVALID_WORKFLOW);
    }

    #[test]
    fn test_scalar_jobs_is_invalid() {
        let err = normalize_yaml("jobs: build\n").unwrap_err();
        assert_eq!(err.message, INVALID_WORKFLOW);
    }

    #[test]
    fn test_sequence_root_is_invalid() {
        let err = normalize(Value::Sequence(vec![])).unwrap_err();
        assert_eq!(err.message, INVALID_WORKFLOW);
    }

    #[test]
    fn test_full_job() {
        let workflow = normalize_yaml(
            r#"
name: CI
on: [push, pull_request]
env:
  CARGO_TERM_COLOR: always
jobs:
  test:
    name: Test suite
    runs-on: [self-hosted, linux]
    needs: [build, lint]
    if: github.ref == 'refs/heads/main'
    timeout-minutes: 30
    permissions:
      contents: read
    steps:
      - uses: actions/checkout@v4
        with:
          fetch-depth: 0
      - name: Run
        id: run-tests
        run: cargo test
        continue-on-error: true
"#,
        )
        .unwrap();

        assert_eq!(workflow.name.as_deref(), Some("CI"));
        assert_eq!(
            workflow.on,
            Some(Trigger::Events(vec!["push".into(), "pull_request".into()]))
        );
        assert_eq!(workflow.extra["env"]["CARGO_TERM_COLOR"], "always");

        let job = workflow.get_job("test").unwrap();
        assert_eq!(job.name.as_deref(), Some("Test suite"));
        assert_eq!(
            job.runs_on,
            Some(RunsOn::Labels(vec!["self-hosted".into(), "linux".into()]))
        );
        assert_eq!(job.needs, vec!["build", "lint"]);
        assert_eq!(job.condition.as_deref(), Some("github.ref == 'refs/heads/main'"));
        assert_eq!(job.permissions, Some(serde_json::json!({ "contents": "read" })));
        assert_eq!(job.extra["timeout-minutes"], 30);

        assert_eq!(job.steps.len(), 2);
        assert_eq!(job.steps[0].uses.as_deref(), Some("actions/checkout@v4"));
        assert_eq!(job.steps[0].with, Some(serde_json::json!({ "fetch-depth": 0 })));
        assert_eq!(job.steps[1].id.as_deref(), Some("run-tests"));
        assert_eq!(job.steps[1].run.as_deref(), Some("cargo test"));
        assert_eq!(job.steps[1].extra["continue-on-error"], true);
    }

    #[test]
    fn test_detailed_trigger() {
        let workflow = normalize_yaml(
            "on:\n  push:\n    branches: [main]\n  workflow_dispatch:\njobs:\n  a:\n    steps: []\n",
        )
        .unwrap();
        match workflow.on {
            Some(Trigger::Detailed(map)) => {
                assert_eq!(map["push"]["branches"], serde_json::json!(["main"]));
                assert!(map.contains_key("workflow_dispatch"));
            }
            other => panic!("Expected detailed trigger, got {:?}", other),
        }
    }

    #[test]
    fn test_camel_case_runs_on_is_accepted() {
        let workflow = normalize_yaml("jobs:\n  a:\n    runsOn: macos-latest\n").unwrap();
        assert_eq!(
            workflow.jobs["a"].runs_on,
            Some(RunsOn::Label("macos-latest".into()))
        );
        assert!(!workflow.jobs["a"].extra.contains_key("runsOn"));
    }

    #[test]
    fn test_non_mapping_job_and_step_degrade() {
        let workflow = normalize_yaml(
            "jobs:\n  odd: just-a-string\n  b:\n    steps:\n      - checkout\n      - run: make\n",
        )
        .unwrap();
        assert_eq!(workflow.jobs["odd"], Job::default());
        let steps = &workflow.jobs["b"].steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], Step::default());
        assert_eq!(steps[1].run.as_deref(), Some("make"));
    }

    #[test]
    fn test_jobs_keep_document_order() {
        let workflow = normalize_yaml("jobs:\n  zeta: {}\n  alpha: {}\n  mid: {}\n").unwrap();
        assert_eq!(
            workflow.jobs.keys().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid"]
        );
    }
}
