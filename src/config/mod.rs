//! Configuration management.
//!
//! yamlviz configuration can come from:
//! - Config file (~/.config/yamlviz/config.toml, or an explicit path)
//! - Environment variables (YAMLVIZ_*, plus GITHUB_TOKEN)
//!
//! ```toml
//! [layout]
//! node_width = 200
//! vertical_gap = 80
//!
//! [github]
//! api_url = "https://api.github.com"
//! cache_ttl_seconds = 3600
//!
//! [wrkflw]
//! binary = "wrkflw"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
pub use crate::graph::LayoutConfig;

/// yamlviz configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Graph geometry
    #[serde(default)]
    pub layout: LayoutConfig,

    /// GitHub API access for action metadata
    #[serde(default)]
    pub github: GitHubConfig,

    /// External validator/runner
    #[serde(default)]
    pub wrkflw: WrkflwConfig,
}

/// GitHub API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Personal access token; never written back out
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_github_timeout")]
    pub timeout_seconds: u64,

    /// How long metadata lookups stay cached (seconds)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            timeout_seconds: default_github_timeout(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_timeout() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    3600
}

/// `wrkflw` CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrkflwConfig {
    /// Executable name or path
    #[serde(default = "default_wrkflw_binary")]
    pub binary: String,

    /// Validation timeout (seconds)
    #[serde(default = "default_wrkflw_timeout")]
    pub timeout_seconds: u64,
}

impl Default for WrkflwConfig {
    fn default() -> Self {
        Self {
            binary: default_wrkflw_binary(),
            timeout_seconds: default_wrkflw_timeout(),
        }
    }
}

fn default_wrkflw_binary() -> String {
    "wrkflw".to_string()
}

fn default_wrkflw_timeout() -> u64 {
    120
}

impl Config {
    /// Load configuration from the default location, then the environment.
    ///
    /// A missing default file is fine; an unreadable one is logged and skipped.
    /// Sections that fail validation fall back to their defaults.
    pub fn load() -> Self {
        let mut config = Self::default();

        let primary_path = Self::config_dir().join("config.toml");
        if primary_path.exists() {
            match Self::load_partial_from_path(&primary_path) {
                Ok(partial) => {
                    debug!(path = %primary_path.display(), "loaded config file");
                    config.apply_partial(partial);
                }
                Err(e) => warn!("Ignoring config file {}: {}", primary_path.display(), e),
            }
        }

        config.apply_env_overrides();
        config.reset_invalid_sections();
        config
    }

    /// Load configuration from an explicit file, then the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.apply_partial(Self::load_partial_from_path(path)?);
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("yamlviz"))
            .unwrap_or_else(|| PathBuf::from(".yamlviz"))
    }

    /// Reject geometry that would produce a degenerate layout.
    pub fn validate(&self) -> Result<()> {
        validate_layout(&self.layout)?;
        validate_wrkflw(&self.wrkflw)
    }

    /// Replace every section that fails validation with its defaults.
    fn reset_invalid_sections(&mut self) {
        if let Err(e) = validate_layout(&self.layout) {
            warn!("{}; using default layout", e);
            self.layout = LayoutConfig::default();
        }
        if let Err(e) = validate_wrkflw(&self.wrkflw) {
            warn!("{}; using default wrkflw settings", e);
            self.wrkflw = WrkflwConfig::default();
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var("YAMLVIZ_GITHUB_TOKEN").or_else(|| var("GITHUB_TOKEN")) {
            self.github.token = Some(token);
        }
        if let Some(url) = var("YAMLVIZ_GITHUB_API_URL") {
            self.github.api_url = url;
        }
        if let Some(parsed) = parsed_var(&var, "YAMLVIZ_GITHUB_TIMEOUT_SECONDS") {
            self.github.timeout_seconds = parsed;
        }
        if let Some(parsed) = parsed_var(&var, "YAMLVIZ_CACHE_TTL_SECONDS") {
            self.github.cache_ttl_seconds = parsed;
        }
        if let Some(binary) = var("YAMLVIZ_WRKFLW_BIN") {
            self.wrkflw.binary = binary;
        }
        if let Some(parsed) = parsed_var(&var, "YAMLVIZ_WRKFLW_TIMEOUT_SECONDS") {
            self.wrkflw.timeout_seconds = parsed;
        }
        if let Some(parsed) = parsed_var(&var, "YAMLVIZ_NODE_WIDTH") {
            self.layout.node_width = parsed;
        }
        if let Some(parsed) = parsed_var(&var, "YAMLVIZ_NODE_HEIGHT") {
            self.layout.node_height = parsed;
        }
        if let Some(parsed) = parsed_var(&var, "YAMLVIZ_HORIZONTAL_GAP") {
            self.layout.horizontal_gap = parsed;
        }
        if let Some(parsed) = parsed_var(&var, "YAMLVIZ_VERTICAL_GAP") {
            self.layout.vertical_gap = parsed;
        }
    }

    fn load_partial_from_path(path: &Path) -> Result<PartialConfig> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(layout) = partial.layout {
            self.layout = layout;
        }
        if let Some(github) = partial.github {
            self.github = github;
        }
        if let Some(wrkflw) = partial.wrkflw {
            self.wrkflw = wrkflw;
        }
    }
}

fn validate_layout(layout: &LayoutConfig) -> Result<()> {
    for (name, value) in [
        ("layout.node_width", layout.node_width),
        ("layout.node_height", layout.node_height),
        ("layout.horizontal_gap", layout.horizontal_gap),
        ("layout.vertical_gap", layout.vertical_gap),
        ("layout.top_margin", layout.top_margin),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::Config(format!(
                "{} must be a non-negative number, got {}",
                name, value
            )));
        }
    }
    Ok(())
}

fn validate_wrkflw(wrkflw: &WrkflwConfig) -> Result<()> {
    if wrkflw.binary.trim().is_empty() {
        return Err(Error::Config("wrkflw.binary must not be empty".to_string()));
    }
    Ok(())
}

fn parsed_var<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    layout: Option<LayoutConfig>,
    github: Option<GitHubConfig>,
    wrkflw: Option<WrkflwConfig>,
}
