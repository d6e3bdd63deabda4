//! `owner/repo[@version]` action references.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// A reference to an action hosted in a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionRef {
    pub owner: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl std::fmt::Display for ActionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ActionRef {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_action_ref(s).ok_or_else(|| {
            crate::error::Error::Config(format!(
                "'{}' is not an owner/repo[@version] action reference",
                s
            ))
        })
    }
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^/]+)/([^@/]+)(?:@([^/]+))?$").expect("action reference pattern is valid")
    })
}

/// Parse `owner/repo` or `owner/repo@version`.
///
/// Local (`./path`), Docker (`docker://image`) and nested-path
/// (`owner/repo/dir@v1`) references return `None`.
pub fn parse_action_ref(reference: &str) -> Option<ActionRef> {
    if is_local_path(reference) {
        return None;
    }
    let caps = pattern().captures(reference)?;
    let owner = caps.get(1)?.as_str();
    if owner == "." || owner == ".." {
        return None;
    }
    Some(ActionRef {
        owner: owner.to_string(),
        repo: caps.get(2)?.as_str().to_string(),
        version: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

pub fn is_valid_action_ref(reference: &str) -> bool {
    parse_action_ref(reference).is_some()
}

/// `./dir` and `../dir` point into the checked-out repository.
fn is_local_path(reference: &str) -> bool {
    reference.starts_with("./") || reference.starts_with("../")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_version() {
        let parsed = parse_action_ref("actions/checkout@v4").unwrap();
        assert_eq!(parsed.owner, "actions");
        assert_eq!(parsed.repo, "checkout");
        assert_eq!(parsed.version.as_deref(), Some("v4"));
        assert_eq!(parsed.to_string(), "actions/checkout@v4");
    }

    #[test]
    fn test_parse_without_version() {
        let parsed = parse_action_ref("dtolnay/rust-toolchain").unwrap();
        assert_eq!(parsed.version, None);
        assert_eq!(parsed.to_string(), "dtolnay/rust-toolchain");
    }

    #[test]
    fn test_rejects_other_forms() {
        for reference in [
            "./.github/actions/setup",
            "./local",
            "../shared@v1",
            "./my-action@main",
            "docker://alpine:3.19",
            "github/codeql-action/init@v3",
            "checkout",
            "",
        ] {
            assert!(parse_action_ref(reference).is_none(), "{}", reference);
            assert!(!is_valid_action_ref(reference), "{}", reference);
        }
        assert!(is_valid_action_ref("actions/cache@v3"));
    }

    #[test]
    fn test_from_str() {
        let parsed: ActionRef = "actions/setup-node@v4".parse().unwrap();
        assert_eq!(parsed.repo, "setup-node");
        assert!("nope".parse::<ActionRef>().is_err());
    }
}
