//! GitHub API client implementation.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use futures::future::join_all;
use reviewer_core::{
    DirectoryProvider, Error, PullRequestInfo, PullRequestProvider, PullRequestRef, Result,
    ReviewHistoryProvider, ReviewerAssigner, TeamMember,
};
use tracing::{debug, warn};

use crate::types::{
    repository_from_url, GitHubPullRequest, GitHubSearchItem, GitHubSearchResult, GitHubUser,
    RequestReviewersRequest,
};
use crate::DEFAULT_GITHUB_URL;

/// Results requested per page for listings and searches.
const PER_PAGE: &str = "100";

/// GitHub API client.
pub struct GitHubClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHubClient {
    /// Create a new GitHub client.
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_GITHUB_URL, token)
    }

    /// Create a new GitHub client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("reviewer-tools")
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to configure HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client,
        }
    }

    /// Build request with common headers.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");

        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Make an authenticated GET request with typed deserialization.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!(url = url, "GitHub GET request");

        let response = self
            .request(reqwest::Method::GET, url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request, ignoring the response body.
    async fn post<B: serde::Serialize>(&self, url: &str, body: &B) -> Result<()> {
        debug!(url = url, "GitHub POST request");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        Self::check_status(response).await.map(|_| ())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "GitHub API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        Ok(response)
    }

    /// Handle response and map errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    /// Run an issue search and map the hits to pull request references.
    async fn search_pull_requests(&self, query: &str) -> Result<Vec<PullRequestRef>> {
        let result: GitHubSearchResult = self
            .get(
                &self.api_url("/search/issues"),
                &[("q", query), ("per_page", PER_PAGE)],
            )
            .await?;

        if result.incomplete_results || result.total_count > result.items.len() as u64 {
            debug!(
                query,
                total = result.total_count,
                returned = result.items.len(),
                "Search returned a partial result"
            );
        }

        Ok(result.items.into_iter().filter_map(map_search_item).collect())
    }

    /// Profile of one user; falls back to the bare login when it cannot be fetched.
    async fn member_profile(&self, login: String) -> TeamMember {
        let url = self.api_url(&format!("/users/{}", login));
        match self.get::<GitHubUser>(&url, &[]).await {
            Ok(user) => map_member(user),
            Err(e) => {
                warn!(login = %login, error = %e, "Failed to fetch user profile");
                TeamMember::new(login.clone(), "", login)
            }
        }
    }
}

// =============================================================================
// Mapping functions
// =============================================================================

fn map_member(user: GitHubUser) -> TeamMember {
    let name = user
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| user.login.clone());
    TeamMember::new(name, user.email.unwrap_or_default(), user.login)
}

fn map_search_item(item: GitHubSearchItem) -> Option<PullRequestRef> {
    let Some(repository) = repository_from_url(&item.repository_url) else {
        warn!(url = %item.repository_url, "Skipping search item with unrecognized repository URL");
        return None;
    };
    Some(PullRequestRef {
        number: item.number,
        title: item.title,
        url: item.html_url,
        repository,
    })
}

fn map_pull_request(pr: GitHubPullRequest) -> PullRequestInfo {
    PullRequestInfo {
        title: pr.title,
        url: pr.html_url,
        author_login: pr.user.map(|u| u.login).unwrap_or_default(),
    }
}

/// Cutoff date of a `days`-long lookback window.
fn reviewed_since(days: u32) -> NaiveDate {
    (Utc::now() - Duration::days(i64::from(days))).date_naive()
}

fn reviewed_by_query(login: &str, days: u32) -> String {
    format!(
        "is:pr reviewed-by:{} updated:>{}",
        login,
        reviewed_since(days).format("%Y-%m-%d")
    )
}

fn pending_review_query(login: &str) -> String {
    format!("is:pr is:open review-requested:{}", login)
}

fn check_repo(repo: &str) -> Result<()> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(())
        }
        _ => Err(Error::InvalidData(format!(
            "Invalid repository '{}', expected owner/name",
            repo
        ))),
    }
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl DirectoryProvider for GitHubClient {
    async fn get_members(&self, org: &str, team_slug: &str) -> Result<Vec<TeamMember>> {
        let url = self.api_url(&format!("/orgs/{}/teams/{}/members", org, team_slug));
        let users: Vec<GitHubUser> = self.get(&url, &[("per_page", PER_PAGE)]).await?;

        debug!(org, team_slug, count = users.len(), "Fetched team members");

        Ok(join_all(users.into_iter().map(|user| self.member_profile(user.login))).await)
    }
}

#[async_trait]
impl ReviewHistoryProvider for GitHubClient {
    async fn search_reviewed_by(
        &self,
        login: &str,
        since_days_ago: u32,
    ) -> Result<Vec<PullRequestRef>> {
        self.search_pull_requests(&reviewed_by_query(login, since_days_ago))
            .await
    }

    async fn search_pending_review_for(&self, login: &str) -> Result<Vec<PullRequestRef>> {
        self.search_pull_requests(&pending_review_query(login)).await
    }
}

#[async_trait]
impl PullRequestProvider for GitHubClient {
    async fn get_pull_request(&self, repo: &str, number: u64) -> Result<PullRequestInfo> {
        check_repo(repo)?;
        let url = self.api_url(&format!("/repos/{}/pulls/{}", repo, number));
        let pr: GitHubPullRequest = self.get(&url, &[]).await?;
        Ok(map_pull_request(pr))
    }
}

#[async_trait]
impl ReviewerAssigner for GitHubClient {
    async fn add_reviewer(&self, repo: &str, number: u64, login: &str) -> Result<()> {
        check_repo(repo)?;
        let url = self.api_url(&format!("/repos/{}/pulls/{}/requested_reviewers", repo, number));
        let body = RequestReviewersRequest {
            reviewers: vec![login.to_string()],
        };
        self.post(&url, &body).await
    }
}
