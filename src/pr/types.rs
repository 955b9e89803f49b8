use serde::Deserialize;

/// Immutable snapshot of a pull request, as consumed by the evaluator.
///
/// Built either from the GitHub REST API (see `fetch_pull_request`) or
/// deserialized from a JSON snapshot. Every collection defaults to empty so
/// partial payloads still load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    /// PR number (e.g., 42)
    #[serde(default)]
    pub number: u64,
    /// PR title
    pub title: String,
    /// Author's GitHub login
    pub author: String,
    /// Repository and ref the PR merges into
    #[serde(default)]
    pub base: RepoRef,
    /// Repository and head commit the PR proposes
    #[serde(default)]
    pub head: RepoRef,
    /// Files changed by the PR, in the order GitHub lists them
    #[serde(default)]
    pub files: Vec<ChangedFile>,
    /// Reviews submitted on the PR
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl PullRequest {
    /// SHA of the commit the PR currently points at.
    pub fn head_sha(&self) -> &str {
        &self.head.git_ref
    }

    pub fn additions(&self) -> usize {
        self.files.iter().filter_map(|f| f.additions).sum()
    }

    pub fn deletions(&self) -> usize {
        self.files.iter().filter_map(|f| f.deletions).sum()
    }

    /// Whether any file in the PR has exactly this path.
    pub fn touches(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.filename == path)
    }
}

/// A repository plus a git ref inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    /// Commit SHA for the head side, branch name for the base side
    #[serde(default, rename = "ref")]
    pub git_ref: String,
}

/// A single file within the PR, shaped like GitHub's `pulls.listFiles` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangedFile {
    /// Blob SHA of the file at head
    #[serde(default)]
    pub sha: String,
    /// File path (e.g., "samples/package.json")
    pub filename: String,
    /// Unified diff hunks for this file; absent for binary or oversized files
    #[serde(default)]
    pub patch: Option<String>,
    #[serde(default)]
    pub additions: Option<usize>,
    #[serde(default)]
    pub deletions: Option<usize>,
    #[serde(default)]
    pub changes: Option<usize>,
}

/// A review submitted on the PR.
#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    /// Reviewer's GitHub login
    pub reviewer: String,
    pub state: ReviewState,
    /// Commit the review was submitted against
    pub commit_id: String,
    /// GitHub review id; increases monotonically, so later reviews have larger ids
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewState::Approved => write!(f, "APPROVED"),
            ReviewState::ChangesRequested => write!(f, "CHANGES_REQUESTED"),
            ReviewState::Commented => write!(f, "COMMENTED"),
            ReviewState::Dismissed => write!(f, "DISMISSED"),
            ReviewState::Pending => write!(f, "PENDING"),
            ReviewState::Other => write!(f, "OTHER"),
        }
    }
}

/// Represents the parsed components of a GitHub PR URL.
#[derive(Debug, Clone)]
pub struct PrUrl {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
}
