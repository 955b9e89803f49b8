pub mod content;
pub mod diff;
pub mod types;

pub use content::{ContentFetcher, FetchError, GitHubFetcher, StaticFetcher};
pub use types::{ChangedFile, PrUrl, PullRequest, RepoRef, Review, ReviewState};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

const GITHUB_API: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = "auto-approve";

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid PR URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to parse diff: {0}")]
    DiffParse(String),

    #[error("Failed to read snapshot: {0}")]
    Snapshot(#[from] std::io::Error),

    #[error("Failed to parse snapshot: {0}")]
    SnapshotParse(#[from] serde_json::Error),

    #[error("GitHub token not found in environment")]
    MissingToken,
}

/// Parse a GitHub PR URL into its component parts.
///
/// Expected format: https://github.com/{owner}/{repo}/pull/{number}
pub fn parse_pr_url(url: &str) -> Result<PrUrl, PrError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    if parsed.host_str() != Some("github.com") {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(|| PrError::InvalidUrl(url.to_string()))?
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() != 4 || segments[2] != "pull" {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let pr_number = segments[3]
        .parse::<u64>()
        .map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    Ok(PrUrl {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        pr_number,
    })
}

/// A PR snapshot on disk: the PullRequest fields plus, optionally, the
/// contents of files language rules may ask for at head.
#[derive(serde::Deserialize)]
struct SnapshotFile {
    #[serde(flatten)]
    pull_request: PullRequest,
    #[serde(default)]
    contents: std::collections::HashMap<String, String>,
}

/// Load a PullRequest snapshot from a JSON file, filling in line counts the
/// payload left out. File contents bundled in the snapshot are served by the
/// returned fetcher.
pub fn load_snapshot(path: &std::path::Path) -> Result<(PullRequest, StaticFetcher), PrError> {
    let contents = std::fs::read_to_string(path)?;
    let snapshot: SnapshotFile = serde_json::from_str(&contents)?;
    let mut pull_request = snapshot.pull_request;
    for file in &mut pull_request.files {
        diff::fill_missing_counts(file)?;
    }
    Ok((pull_request, snapshot.contents.into_iter().collect()))
}

/// Fetch a complete PullRequest snapshot (metadata, changed files, reviews)
/// from the GitHub API.
#[instrument(skip(token), fields(owner = %pr_url.owner, repo = %pr_url.repo, pr = pr_url.pr_number))]
pub async fn fetch_pull_request(pr_url: &PrUrl, token: &str) -> Result<PullRequest, PrError> {
    let client = reqwest::Client::new();
    let base_url = format!(
        "{}/repos/{}/{}/pulls/{}",
        GITHUB_API, pr_url.owner, pr_url.repo, pr_url.pr_number
    );

    #[derive(serde::Deserialize)]
    struct User {
        login: String,
    }

    #[derive(serde::Deserialize)]
    struct Repository {
        name: String,
        owner: User,
    }

    #[derive(serde::Deserialize)]
    struct Branch {
        #[serde(rename = "ref")]
        git_ref: String,
        sha: String,
        // Null when the head fork has been deleted.
        repo: Option<Repository>,
    }

    #[derive(serde::Deserialize)]
    struct PullResponse {
        number: u64,
        title: String,
        user: User,
        head: Branch,
        base: Branch,
    }

    #[derive(serde::Deserialize)]
    struct ReviewResponse {
        id: u64,
        // Null for reviews left by since-deleted accounts.
        user: Option<User>,
        state: ReviewState,
        #[serde(default)]
        commit_id: Option<String>,
    }

    debug!("fetching PR metadata from GitHub API");
    let metadata = client
        .get(&base_url)
        .header("User-Agent", USER_AGENT)
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json::<PullResponse>()
        .await?;
    debug!(title = %metadata.title, head = %metadata.head.sha, "received PR metadata");

    let files: Vec<ChangedFile> =
        get_paginated(&client, &format!("{}/files", base_url), token).await?;
    debug!(files = files.len(), "received changed files");

    let reviews: Vec<ReviewResponse> =
        get_paginated(&client, &format!("{}/reviews", base_url), token).await?;
    debug!(reviews = reviews.len(), "received reviews");

    let to_repo_ref = |branch: Branch, git_ref: String| match branch.repo {
        Some(repo) => RepoRef {
            owner: repo.owner.login,
            repo: repo.name,
            git_ref,
        },
        None => RepoRef {
            owner: pr_url.owner.clone(),
            repo: pr_url.repo.clone(),
            git_ref,
        },
    };
    let head_sha = metadata.head.sha.clone();
    let base_ref = metadata.base.git_ref.clone();

    Ok(PullRequest {
        number: metadata.number,
        title: metadata.title,
        author: metadata.user.login,
        head: to_repo_ref(metadata.head, head_sha),
        base: to_repo_ref(metadata.base, base_ref),
        files,
        reviews: reviews
            .into_iter()
            .filter_map(|r| {
                Some(Review {
                    reviewer: r.user?.login,
                    state: r.state,
                    commit_id: r.commit_id.unwrap_or_default(),
                    id: r.id,
                })
            })
            .collect(),
    })
}

/// GET every page of a GitHub list endpoint.
async fn get_paginated<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    token: &str,
) -> Result<Vec<T>, PrError> {
    let mut items = Vec::new();
    let mut page = 1usize;
    loop {
        let batch = client
            .get(url)
            .query(&[("per_page", PAGE_SIZE), ("page", page)])
            .header("User-Agent", USER_AGENT)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<T>>()
            .await?;
        let done = batch.len() < PAGE_SIZE;
        items.extend(batch);
        if done {
            return Ok(items);
        }
        page += 1;
    }
}
