//! GitHub repository lookup.
//!
//! Before cloning, the server asks the provider whether the repository
//! exists and which branch is its default. [`RepoProvider`] is that
//! question; [`GithubProvider`] answers it with the GitHub REST API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::GithubConfig;
use crate::error::{KegError, Result};
use crate::models::RepoRef;

/// What the provider knows about a repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteRepo {
    pub clone_url: String,
    pub default_branch: String,
}

/// Repository existence check against a hosting provider.
#[async_trait]
pub trait RepoProvider: Send + Sync {
    /// Looks up `repo`, failing with [`KegError::RepositoryNotFound`] if the
    /// provider reports it absent.
    async fn lookup(&self, repo: &RepoRef) -> Result<RemoteRepo>;
}

/// [`RepoProvider`] for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GithubProvider {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GithubProvider {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kegeye/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KegError::Provider(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Builds a provider from config, or `None` when no token is set.
    pub fn from_config(config: &GithubConfig) -> Result<Option<Self>> {
        match config.token() {
            Some(token) => Self::new(config.api_url.clone(), token).map(Some),
            None => Ok(None),
        }
    }

    fn repo_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}", self.api_url, repo.owner(), repo.name())
    }
}

#[async_trait]
impl RepoProvider for GithubProvider {
    async fn lookup(&self, repo: &RepoRef) -> Result<RemoteRepo> {
        let resp = self
            .client
            .get(self.repo_url(repo))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| KegError::Provider(format!("GitHub request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(KegError::RepositoryNotFound {
                owner: repo.owner().to_string(),
                name: repo.name().to_string(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(KegError::Provider(format!(
                "GitHub API error {}: {}",
                status,
                body.trim()
            )));
        }

        let remote: RemoteRepo = resp
            .json()
            .await
            .map_err(|e| KegError::Provider(format!("unexpected GitHub response: {}", e)))?;

        tracing::debug!(
            repo = %repo,
            default_branch = %remote.default_branch,
            "repository exists"
        );
        Ok(remote)
    }
}
