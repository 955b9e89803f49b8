use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use super::types::RepoRef;
use super::{GITHUB_API, USER_AGENT};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),
}

/// Source of file contents at a given repository ref.
///
/// Language rules that need a second file (a changelog, a lockfile) ask for
/// it through this trait so the engine itself never talks to the network.
/// Implementations must be Send + Sync because per-file checks run
/// concurrently.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Return the contents of `path` at `repo.git_ref`, or `None` if the file
    /// does not exist there.
    async fn fetch_file(&self, repo: &RepoRef, path: &str) -> Result<Option<String>, FetchError>;
}

/// Reads raw file contents from the GitHub contents API.
pub struct GitHubFetcher {
    client: reqwest::Client,
    token: String,
}

impl GitHubFetcher {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl ContentFetcher for GitHubFetcher {
    #[instrument(skip(self), fields(owner = %repo.owner, repo = %repo.repo, git_ref = %repo.git_ref))]
    async fn fetch_file(&self, repo: &RepoRef, path: &str) -> Result<Option<String>, FetchError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            GITHUB_API, repo.owner, repo.repo, path
        );
        let response = self
            .client
            .get(&url)
            .query(&[("ref", repo.git_ref.as_str())])
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github.raw")
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("file not found at ref");
            return Ok(None);
        }

        let body = response.error_for_status()?.text().await?;
        debug!(bytes = body.len(), "fetched file contents");
        Ok(Some(body))
    }
}

/// In-memory fetcher keyed by path. Serves the same contents for every ref,
/// which is what snapshot evaluation and tests need.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    files: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticFetcher {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch_file(&self, _repo: &RepoRef, path: &str) -> Result<Option<String>, FetchError> {
        Ok(self.files.get(path).cloned())
    }
}
