//! GitHub REST client for action repository metadata.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::reference::{parse_action_ref, ActionRef};
use crate::config::GitHubConfig;
use crate::error::{Error, Result};

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("yamlviz/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Summary of the repository behind an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMetadata {
    /// Repository name
    pub name: String,
    pub owner: String,
    pub description: String,
    /// Repository page on github.com
    pub url: String,
    pub stars: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stargazers_count: Option<u64>,
}

/// Read-only client for `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout defaults: {}", e);
                Client::new()
            });

        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Look up the repository behind an action reference string.
    ///
    /// Returns `Ok(None)` without a request when the string is not an
    /// `owner/repo[@version]` reference.
    pub async fn fetch_action_metadata(&self, reference: &str) -> Result<Option<ActionMetadata>> {
        match parse_action_ref(reference) {
            Some(action) => self.fetch(&action).await,
            None => {
                debug!(reference, "not a repository action reference");
                Ok(None)
            }
        }
    }

    /// Look up the repository behind a parsed reference. A missing
    /// repository is `Ok(None)`.
    pub async fn fetch(&self, action: &ActionRef) -> Result<Option<ActionMetadata>> {
        let url = format!("{}/repos/{}/{}", self.api_url, action.owner, action.repo);
        debug!(%url, "fetching action metadata");

        let mut request = self.client.get(&url).header(reqwest::header::ACCEPT, ACCEPT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(action = %action, "action repository not found");
            return Ok(None);
        }
        if !status.is_success() {
            warn!(action = %action, status = status.as_u16(), "GitHub API request failed");
            return Err(Error::GitHub {
                status: status.as_u16(),
            });
        }

        let repo: RepoResponse = response.json().await?;
        Ok(Some(ActionMetadata {
            name: action.repo.clone(),
            owner: action.owner.clone(),
            description: repo.description.unwrap_or_default(),
            url: format!("https://github.com/{}/{}", action.owner, action.repo),
            stars: repo.stargazers_count.unwrap_or(0),
            version: action.version.clone(),
        }))
    }
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new(&GitHubConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(url: String, token: Option<&str>) -> GitHubClient {
        GitHubClient::new(&GitHubConfig {
            api_url: url,
            token: token.map(str::to_string),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_fetch_metadata_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/actions/checkout")
            .match_header("accept", ACCEPT)
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"description": "Check out a repo", "stargazers_count": 6000}"#)
            .create_async()
            .await;

        let client = client_for(server.url(), Some("secret"));
        let metadata = client
            .fetch_action_metadata("actions/checkout@v4")
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            metadata,
            ActionMetadata {
                name: "checkout".into(),
                owner: "actions".into(),
                description: "Check out a repo".into(),
                url: "https://github.com/actions/checkout".into(),
                stars: 6000,
                version: Some("v4".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/someone/tool")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"description": null}"#)
            .create_async()
            .await;

        let client = client_for(server.url(), None);
        let metadata = client
            .fetch_action_metadata("someone/tool")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.description, "");
        assert_eq!(metadata.stars, 0);
        assert_eq!(metadata.version, None);
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/ghost/action")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(server.url(), None);
        let metadata = client.fetch_action_metadata("ghost/action@v1").await.unwrap();
        assert!(metadata.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/actions/cache")
            .with_status(403)
            .create_async()
            .await;

        let client = client_for(server.url(), None);
        let err = client.fetch_action_metadata("actions/cache").await.unwrap_err();
        assert!(matches!(err, Error::GitHub { status: 403 }));
    }

    #[tokio::test]
    async fn test_invalid_reference_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(server.url(), None);
        assert!(client
            .fetch_action_metadata("./local-action")
            .await
            .unwrap()
            .is_none());
        mock.assert_async().await;
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = client_for("https://api.github.com/".into(), Some(""));
        assert!(!client.has_token());
        assert_eq!(client.api_url(), "https://api.github.com");
    }
}
