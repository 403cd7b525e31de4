//! Common types shared by the engine, the plugins and the MCP server.

use serde::{Deserialize, Serialize};

/// Workload factor applied when a member has none configured.
pub const DEFAULT_WORKLOAD_FACTOR: f64 = 1.0;

/// Weight of an outstanding review request relative to a completed review.
pub const PENDING_REVIEW_WEIGHT: f64 = 2.0;

// =============================================================================
// Team
// =============================================================================

/// A reviewer candidate belonging to a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// GitHub login, the identity used for matching and exclusion
    #[serde(default, rename = "github", alias = "github_login", alias = "nickname_github")]
    pub github_login: String,
    /// Review capacity relative to normal (0.5 = half the usual load)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_factor: Option<f64>,
}

impl TeamMember {
    /// Create a member with the default workload factor.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        github_login: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            github_login: github_login.into(),
            workload_factor: None,
        }
    }

    /// Set an explicit workload factor.
    pub fn with_workload_factor(mut self, factor: f64) -> Self {
        self.workload_factor = Some(factor);
        self
    }

    /// Workload factor used as the score divisor.
    ///
    /// Falls back to [`DEFAULT_WORKLOAD_FACTOR`] when unset, zero, negative
    /// or not finite.
    pub fn effective_workload_factor(&self) -> f64 {
        match self.workload_factor {
            Some(f) if f.is_finite() && f > 0.0 => f,
            _ => DEFAULT_WORKLOAD_FACTOR,
        }
    }

    /// Case-insensitive login comparison.
    pub fn has_login(&self, login: &str) -> bool {
        self.github_login.eq_ignore_ascii_case(login)
    }

    /// Lowercased login, used as the merge key.
    pub fn login_key(&self) -> String {
        self.github_login.to_lowercase()
    }
}

/// Team configuration as loaded from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(alias = "team_name")]
    pub name: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    /// Exact `owner/name` entries or prefixes ending in `*`
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Logins never picked as reviewers for this team
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        alias = "exclude_members_by_nickname"
    )]
    pub exclude_members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_slug: Option<String>,
}

impl TeamConfig {
    /// Directory coordinates `(org, team_slug)` when both are configured.
    pub fn directory_key(&self) -> Option<(&str, &str)> {
        match (self.org.as_deref(), self.team_slug.as_deref()) {
            (Some(org), Some(slug)) if !org.is_empty() && !slug.is_empty() => Some((org, slug)),
            _ => None,
        }
    }

    /// Whether a login is in the team's static exclusion list.
    pub fn is_excluded(&self, login: &str) -> bool {
        self.exclude_members
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(login))
    }
}

// =============================================================================
// Reviewer statistics
// =============================================================================

/// Workload of one candidate over the lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerStats {
    pub member: TeamMember,
    pub completed_review_count: u32,
    pub pending_review_count: u32,
    pub normalized_score: f64,
}

impl ReviewerStats {
    /// Build stats and compute the normalized score.
    pub fn new(member: TeamMember, completed_review_count: u32, pending_review_count: u32) -> Self {
        let normalized_score = Self::score(
            completed_review_count,
            pending_review_count,
            member.effective_workload_factor(),
        );
        Self {
            member,
            completed_review_count,
            pending_review_count,
            normalized_score,
        }
    }

    /// `(completed + pending * 2) / workload_factor`.
    pub fn score(completed: u32, pending: u32, workload_factor: f64) -> f64 {
        (f64::from(completed) + f64::from(pending) * PENDING_REVIEW_WEIGHT) / workload_factor
    }
}

// =============================================================================
// Pull requests
// =============================================================================

/// Metadata of the pull request being assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub title: String,
    pub url: String,
    pub author_login: String,
}

/// A pull request returned by a review search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Canonical `owner/name`
    pub repository: String,
}
