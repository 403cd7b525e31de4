//! GitHub API request and response types.
//!
//! These types represent the raw JSON exchanged with the GitHub API.
//! They are mapped to the core types by the client.

use serde::{Deserialize, Serialize};

// =============================================================================
// User
// =============================================================================

/// GitHub user, as returned by `/users/{login}` and team member listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    #[serde(default)]
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// =============================================================================
// Pull Request
// =============================================================================

/// GitHub pull request, reduced to what reviewer assignment needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubPullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
}

/// Body of `POST /repos/{repo}/pulls/{number}/requested_reviewers`.
#[derive(Debug, Clone, Serialize)]
pub struct RequestReviewersRequest {
    pub reviewers: Vec<String>,
}

// =============================================================================
// Search
// =============================================================================

/// Result page of `/search/issues`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSearchResult {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<GitHubSearchItem>,
}

/// Issue or pull request found by a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSearchItem {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    /// API URL of the repository, e.g. `https://api.github.com/repos/acme/api`
    pub repository_url: String,
}

/// `owner/name` from an API repository URL.
///
/// Takes the last two path segments, so enterprise hosts and mock servers
/// work the same way as `api.github.com`.
pub fn repository_from_url(repository_url: &str) -> Option<String> {
    let mut segments = repository_url
        .trim_end_matches('/')
        .rsplit('/')
        .filter(|s| !s.is_empty());
    let name = segments.next()?;
    let owner = segments.next()?;
    if owner.contains(':') {
        return None;
    }
    Some(format!("{}/{}", owner, name))
}
