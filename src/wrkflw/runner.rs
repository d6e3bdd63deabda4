//! Subprocess wrapper around the `wrkflw` CLI.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::types::ValidationResult;
use crate::config::WrkflwConfig;
use crate::error::{Error, Result};

/// Exit status a POSIX shell reports for an unknown command.
const COMMAND_NOT_FOUND: i32 = 127;

/// Handle to the `wrkflw` executable.
#[derive(Debug, Clone)]
pub struct Wrkflw {
    binary: String,
    timeout: Duration,
}

impl Default for Wrkflw {
    fn default() -> Self {
        Self::from_config(&WrkflwConfig::default())
    }
}

impl Wrkflw {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(WrkflwConfig::default().timeout_seconds),
        }
    }

    pub fn from_config(config: &WrkflwConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run `wrkflw validate <path> --json` and return the first result.
    ///
    /// The validator exits non-zero for invalid workflows, so the exit status
    /// only matters when stdout holds no JSON.
    pub async fn validate(&self, path: &Path) -> Result<ValidationResult> {
        debug!(binary = %self.binary, path = %path.display(), "running wrkflw validate");

        let mut command = Command::new(&self.binary);
        command
            .arg("validate")
            .arg(path)
            .arg("--json")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ValidatorNotFound(self.binary.clone()));
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(Error::Validator(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_validate_output(&stdout) {
            Ok(result) => {
                debug!(
                    valid = result.is_valid,
                    issues = result.issues.len(),
                    "wrkflw validate finished"
                );
                Ok(result)
            }
            Err(parse_err) => {
                if output.status.code() == Some(COMMAND_NOT_FOUND) {
                    return Err(Error::ValidatorNotFound(self.binary.clone()));
                }
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr = stderr.trim();
                warn!(status = %output.status, stderr, "wrkflw validate produced no result");
                if output.status.success() || stderr.is_empty() {
                    Err(parse_err)
                } else {
                    Err(Error::Validator(stderr.to_string()))
                }
            }
        }
    }

    /// Spawn `wrkflw run <path>` attached to this process's terminal.
    ///
    /// The caller decides whether to wait on the child.
    pub fn run(&self, path: &Path) -> Result<Child> {
        info!(binary = %self.binary, path = %path.display(), "starting wrkflw run");

        let spawned = Command::new(&self.binary)
            .arg("run")
            .arg(path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn();

        match spawned {
            Ok(child) => Ok(child),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::ValidatorNotFound(self.binary.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Interpret `wrkflw validate --json` output: a JSON array whose first entry
/// is the result for the given file. A bare object is accepted too.
pub fn parse_validate_output(stdout: &str) -> Result<ValidationResult> {
    let value: serde_json::Value = serde_json::from_str(stdout.trim())?;
    let first = match value {
        serde_json::Value::Array(mut results) => {
            if results.is_empty() {
                return Err(Error::Validator("validator returned no results".to_string()));
            }
            results.swap_remove(0)
        }
        object @ serde_json::Value::Object(_) => object,
        other => {
            return Err(Error::Validator(format!(
                "unexpected validator output: {}",
                other
            )));
        }
    };
    Ok(serde_json::from_value(first)?)
}
