//! Capability traits for the external systems reviewer assignment relies on.
//!
//! Each trait is deliberately narrow so the engine can be driven by any
//! backend (GitHub REST, a chat webhook, or a test double).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{PullRequestInfo, PullRequestRef, TeamMember};

/// Live team roster (e.g. a GitHub organization team).
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Get the current members of `org/team_slug`.
    async fn get_members(&self, org: &str, team_slug: &str) -> Result<Vec<TeamMember>>;
}

/// Review history of a user.
#[async_trait]
pub trait ReviewHistoryProvider: Send + Sync {
    /// Pull requests reviewed by `login` and updated in the last `since_days_ago` days.
    async fn search_reviewed_by(&self, login: &str, since_days_ago: u32)
        -> Result<Vec<PullRequestRef>>;

    /// Open pull requests where a review from `login` is still requested.
    async fn search_pending_review_for(&self, login: &str) -> Result<Vec<PullRequestRef>>;
}

/// Pull request metadata lookup.
#[async_trait]
pub trait PullRequestProvider: Send + Sync {
    /// Get title, URL and author of `repo#number`.
    async fn get_pull_request(&self, repo: &str, number: u64) -> Result<PullRequestInfo>;
}

/// The single mutating call: request a review.
#[async_trait]
pub trait ReviewerAssigner: Send + Sync {
    /// Request a review from `login` on `repo#number`.
    async fn add_reviewer(&self, repo: &str, number: u64, login: &str) -> Result<()>;
}

/// Chat notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to the thread `thread_key` of the space behind `webhook_url`.
    async fn post_message(&self, webhook_url: &str, thread_key: &str, text: &str) -> Result<()>;
}
