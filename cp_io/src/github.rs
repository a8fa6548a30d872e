//! Repository existence checks against the GitHub REST API.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::debug;

use cp_core::Error;

pub const GITHUB_API_URL: &str = "https://api.github.com";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RepositoryLookup: Send + Sync {
    /// `Ok(false)` only when the API positively reports the repository
    /// missing; anything inconclusive is an error.
    async fn repository_exists(&self, owner: &str, repo: &str) -> Result<bool, Error>;
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

pub struct GitHubClient {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(GITHUB_API_URL.to_string(), token)
    }

    pub fn with_base_url(base_url: String, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cprobe/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl RepositoryLookup for GitHubClient {
    async fn repository_exists(&self, owner: &str, repo: &str) -> Result<bool, Error> {
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        let url = format!("{}/repos/{}/{}", self.base_url, owner, repo);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| Error::NetworkFailure {
            message: e.to_string(),
        })?;
        debug!(%url, status = response.status().as_u16(), "looked up repository");

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let detail = response
            .json::<ApiMessage>()
            .await
            .map(|m| m.message)
            .unwrap_or_else(|_| format!("HTTP {}", status));
        Err(Error::NetworkFailure {
            message: format!("GitHub API error for {}/{}: {}", owner, repo, detail),
        })
    }
}
