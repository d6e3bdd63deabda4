//! Error types for yamlviz.
//!
//! Parse failures at the workflow boundary are reported through [`ParseError`],
//! a recoverable value rather than a crate-level error. Everything that talks
//! to the outside world (files, GitHub, the `wrkflw` binary) reports through
//! [`Error`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for yamlviz operations.
pub type Result<T> = std::result::Result<T, Error>;

/// yamlviz error types.
///
/// Each variant maps to a stable code so callers can branch on it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GitHub API error: status {status}")]
    GitHub { status: u16 },

    #[error("wrkflw CLI not found: {0}")]
    ValidatorNotFound(String),

    #[error("Validator error: {0}")]
    Validator(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Parse(_) => "PARSE_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::GitHub { .. } => "GITHUB_ERROR",
            Error::ValidatorNotFound(_) => "VALIDATOR_NOT_FOUND",
            Error::Validator(_) => "VALIDATOR_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// Convert to a JSON error envelope.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }
}

/// Recoverable failure produced at the workflow parse boundary.
///
/// Carries a human-readable message and, when known, a 1-based source
/// position.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// Result of the workflow parse boundary.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
