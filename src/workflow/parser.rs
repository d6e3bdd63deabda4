//! Workflow YAML parser.
//!
//! This is the parse boundary: every failure below it comes back as a
//! [`ParseError`] value, never as a panic.

use std::path::Path;

use tracing::debug;

use super::normalize::normalize;
use super::types::Workflow;
use crate::error::{ParseResult, Result};
use crate::yaml::decode;

/// Parse a workflow from a YAML string.
pub fn parse_workflow(yaml: &str) -> ParseResult<Workflow> {
    let root = decode(yaml)?;
    let workflow = normalize(root)?;
    debug!(
        name = workflow.name.as_deref().unwrap_or(""),
        jobs = workflow.jobs.len(),
        needs = workflow.needs_count(),
        "parsed workflow"
    );
    Ok(workflow)
}

/// Parse a workflow from a file path.
pub fn parse_workflow_file(path: &Path) -> Result<Workflow> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_workflow(&content)?)
}

/// Render a parse outcome as `{ "ok": true, "data": ... }` or
/// `{ "ok": false, "error": { "message": ... } }`.
pub fn parse_result_json(result: &ParseResult<Workflow>) -> serde_json::Value {
    match result {
        Ok(workflow) => serde_json::json!({ "ok": true, "data": workflow }),
        Err(error) => serde_json::json!({ "ok": false, "error": error }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::workflow::INVALID_WORKFLOW;

    #[test]
    fn test_parse_simple_workflow() {
        let yaml = r#"
name: CI
on: push

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - run: cargo build

  test:
    needs: build
    runs-on: ubuntu-latest
    steps:
      - run: cargo test
"#;

        let workflow = parse_workflow(yaml).unwrap();
        assert_eq!(workflow.name.as_deref(), Some("CI"));
        assert_eq!(workflow.jobs.len(), 2);
        assert_eq!(workflow.jobs["build"].steps.len(), 2);
        assert_eq!(workflow.jobs["test"].needs, vec!["build"]);
    }

    #[test]
    fn test_parse_missing_jobs() {
        let err = parse_workflow("name: empty\non: push\n").unwrap_err();
        assert_eq!(err.message, INVALID_WORKFLOW);
        assert_eq!(err.line, None);
    }

    #[test]
    fn test_parse_empty_document() {
        let err = parse_workflow("").unwrap_err();
        assert_eq!(err.message, INVALID_WORKFLOW);
    }

    #[test]
    fn test_parse_result_json_shapes() {
        let ok = parse_result_json(&parse_workflow("jobs:\n  a:\n    steps: []\n"));
        assert_eq!(ok["ok"], true);
        assert!(ok["data"]["jobs"]["a"].is_object());

        let failed = parse_result_json(&parse_workflow("name: x\n"));
        assert_eq!(failed["ok"], false);
        assert_eq!(failed["error"]["message"], INVALID_WORKFLOW);
    }

    #[test]
    fn test_parse_workflow_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "jobs:\n  lint:\n    runs-on: ubuntu-latest").unwrap();

        let workflow = parse_workflow_file(file.path()).unwrap();
        assert!(workflow.get_job("lint").is_some());
    }

    #[test]
    fn test_parse_workflow_file_reports_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: no jobs").unwrap();

        let err = parse_workflow_file(file.path()).unwrap_err();
        assert_eq!(err.code(), "PARSE_ERROR");
        assert!(err.to_string().contains(INVALID_WORKFLOW));
    }

    #[test]
    fn test_parse_workflow_file_missing() {
        let err = parse_workflow_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
