//! End-to-end reviewer assignment for one pull request.
//!
//! Flow: `Resolving` (membership, owning team, PR metadata, eligibility) →
//! `Scoring` → `Assigning` → `Notifying` → `Done`. Any failure before the
//! reviewer is added ends the request with an [`AssignError`]; nothing has
//! been mutated at that point. Notification is best-effort.

use std::fmt;
use std::sync::Arc;

use reviewer_core::{
    Config, ConfigSource, DirectoryProvider, Notifier, PullRequestInfo, PullRequestProvider,
    ReviewHistoryProvider, ReviewerAssigner, ReviewerStats, TeamConfig, TeamMember,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::MembershipCache;
use crate::team::{available_members, resolve_team_for_repository, TeamResolver};
use crate::workload::WorkloadScorer;

/// Orchestrator state, reported in logs and errors.
///
/// Resolving → Scoring → Assigning → Notifying → Done. The failure state has
/// no variant of its own: a failed run returns an [`AssignError`] whose
/// [`stage`](AssignError::stage) is the state it failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Scoring,
    Assigning,
    Notifying,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolving => "resolving",
            Stage::Scoring => "scoring",
            Stage::Assigning => "assigning",
            Stage::Notifying => "notifying",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why an assignment did not happen.
#[derive(Debug, Error)]
pub enum AssignError {
    #[error("failed to load configuration: {0}")]
    Config(#[source] reviewer_core::Error),

    #[error("failed to resolve team membership: {0}")]
    Membership(#[source] reviewer_core::Error),

    #[error("repository {0} does not belong to any configured team")]
    UnknownRepository(String),

    #[error("failed to fetch pull request {repo}#{number}: {source}")]
    PullRequest {
        repo: String,
        number: u64,
        source: reviewer_core::Error,
    },

    #[error("no available members for review in team {0}")]
    NoAvailableMembers(String),

    #[error("failed to assign reviewer {login} to {repo}#{number}: {source}")]
    Assignment {
        repo: String,
        number: u64,
        login: String,
        source: reviewer_core::Error,
    },
}

impl AssignError {
    /// State the orchestrator was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            AssignError::Assignment { .. } => Stage::Assigning,
            _ => Stage::Resolving,
        }
    }
}

/// External systems the orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn DirectoryProvider>,
    pub history: Arc<dyn ReviewHistoryProvider>,
    pub pull_requests: Arc<dyn PullRequestProvider>,
    pub assigner: Arc<dyn ReviewerAssigner>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Use one code host for every GitHub-side capability.
    pub fn from_host<H>(host: Arc<H>, notifier: Arc<dyn Notifier>) -> Self
    where
        H: DirectoryProvider
            + ReviewHistoryProvider
            + PullRequestProvider
            + ReviewerAssigner
            + 'static,
    {
        Self {
            directory: host.clone(),
            history: host.clone(),
            pull_requests: host.clone(),
            assigner: host,
            notifier,
        }
    }
}

/// Parameters of one assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRequest {
    /// Repository as `owner/name`
    pub repo: String,
    pub pr_number: u64,
    /// Lookback window; the configured `review_days` when unset
    pub days: Option<u32>,
    /// Chat thread; `review-pr-<number>` when unset
    pub thread_key: Option<String>,
    /// One more login to leave out for this request only
    pub exclude_login: Option<String>,
}

impl AssignmentRequest {
    pub fn new(repo: impl Into<String>, pr_number: u64) -> Self {
        Self {
            repo: repo.into(),
            pr_number,
            days: None,
            thread_key: None,
            exclude_login: None,
        }
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }

    pub fn with_thread_key(mut self, thread_key: impl Into<String>) -> Self {
        self.thread_key = Some(thread_key.into());
        self
    }

    pub fn excluding(mut self, login: impl Into<String>) -> Self {
        self.exclude_login = Some(login.into());
        self
    }

    fn effective_thread_key(&self) -> String {
        self.thread_key
            .clone()
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| format!("review-pr-{}", self.pr_number))
    }
}

/// A completed assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentOutcome {
    pub repo: String,
    pub pr_number: u64,
    pub pull_request: PullRequestInfo,
    pub reviewer: TeamMember,
    pub team: String,
    pub thread_key: String,
    pub days: u32,
    /// Candidates by ascending normalized score
    pub ranking: Vec<ReviewerStats>,
    /// Whether the chat notification went out
    pub notified: bool,
}

/// Assigns the least-loaded eligible reviewer to a pull request.
pub struct ReviewerAssignment {
    resolver: TeamResolver,
    scorer: WorkloadScorer,
    pull_requests: Arc<dyn PullRequestProvider>,
    assigner: Arc<dyn ReviewerAssigner>,
    notifier: Arc<dyn Notifier>,
}

impl ReviewerAssignment {
    /// Create an orchestrator with a fresh membership cache.
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_cache(collaborators, Arc::new(MembershipCache::new()))
    }

    /// Create an orchestrator sharing an existing membership cache.
    pub fn with_cache(collaborators: Collaborators, cache: Arc<MembershipCache>) -> Self {
        Self {
            resolver: TeamResolver::new(collaborators.directory, cache),
            scorer: WorkloadScorer::new(collaborators.history),
            pull_requests: collaborators.pull_requests,
            assigner: collaborators.assigner,
            notifier: collaborators.notifier,
        }
    }

    pub fn resolver(&self) -> &TeamResolver {
        &self.resolver
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Load the configuration from `source`, then [`assign`](Self::assign).
    pub async fn assign_from(
        &self,
        source: &ConfigSource,
        request: AssignmentRequest,
    ) -> Result<AssignmentOutcome, AssignError> {
        let config = source.load().map_err(AssignError::Config)?;
        self.assign(&config, request).await
    }

    /// Run one assignment against `config`.
    pub async fn assign(
        &self,
        config: &Config,
        request: AssignmentRequest,
    ) -> Result<AssignmentOutcome, AssignError> {
        let repo = request.repo.as_str();
        let number = request.pr_number;
        info!(stage = %Stage::Resolving, repo, pr = number, "Assigning reviewer");

        let teams = self
            .resolver
            .resolve_membership(config)
            .await
            .map_err(AssignError::Membership)?;

        let team = resolve_team_for_repository(&teams, repo).ok_or_else(|| {
            warn!(repo, "Repository does not belong to any configured team");
            AssignError::UnknownRepository(repo.to_string())
        })?;

        let pull_request = self
            .pull_requests
            .get_pull_request(repo, number)
            .await
            .map_err(|source| AssignError::PullRequest {
                repo: repo.to_string(),
                number,
                source,
            })?;

        let mut excluded = vec![pull_request.author_login.clone()];
        if let Some(login) = request.exclude_login.as_deref().filter(|l| !l.is_empty()) {
            excluded.push(login.to_string());
        }

        let candidates = available_members(team, &excluded);
        if candidates.is_empty() {
            warn!(team = %team.name, repo, pr = number, "No members available for review");
            return Err(AssignError::NoAvailableMembers(team.name.clone()));
        }

        let days = request.days.unwrap_or(config.review_days);
        debug!(
            stage = %Stage::Scoring,
            team = %team.name,
            candidates = candidates.len(),
            days,
            "Scoring candidates"
        );

        let selection = self
            .scorer
            .select_optimal_reviewer(&candidates, &team.repositories, days)
            .await
            .ok_or_else(|| AssignError::NoAvailableMembers(team.name.clone()))?;
        let reviewer = selection.selected;

        debug!(stage = %Stage::Assigning, login = %reviewer.github_login, "Requesting review");
        self.assigner
            .add_reviewer(repo, number, &reviewer.github_login)
            .await
            .map_err(|source| AssignError::Assignment {
                repo: repo.to_string(),
                number,
                login: reviewer.github_login.clone(),
                source,
            })?;

        info!(
            repo,
            pr = number,
            reviewer = %reviewer.name,
            reviewer_github = %reviewer.github_login,
            team = %team.name,
            "Reviewer assigned successfully"
        );

        let thread_key = request.effective_thread_key();
        let notified = self
            .notify(team, repo, &pull_request, &reviewer, &thread_key)
            .await;

        debug!(stage = %Stage::Done, repo, pr = number, notified, "Assignment finished");

        Ok(AssignmentOutcome {
            repo: repo.to_string(),
            pr_number: number,
            pull_request,
            reviewer,
            team: team.name.clone(),
            thread_key,
            days,
            ranking: selection.stats,
            notified,
        })
    }

    async fn notify(
        &self,
        team: &TeamConfig,
        repo: &str,
        pull_request: &PullRequestInfo,
        reviewer: &TeamMember,
        thread_key: &str,
    ) -> bool {
        let Some(webhook_url) = team.webhook_url.as_deref().filter(|url| !url.is_empty()) else {
            warn!(team = %team.name, "No webhook_url configured, notification not sent");
            return false;
        };

        let text = assignment_message(pull_request, repo, reviewer);
        debug!(stage = %Stage::Notifying, team = %team.name, thread_key, "Sending notification");

        match self
            .notifier
            .post_message(webhook_url, thread_key, &text)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, repo, pr = %pull_request.url, "Failed to send notification");
                false
            }
        }
    }
}

/// Chat message announcing an assignment.
pub fn assignment_message(
    pull_request: &PullRequestInfo,
    repo: &str,
    reviewer: &TeamMember,
) -> String {
    let reviewer_name = if reviewer.name.is_empty() {
        &reviewer.github_login
    } else {
        &reviewer.name
    };

    format!(
        "*New PR assigned for review*\n\n\
         - *PR:* {}\n\
         - *Repository:* {}\n\
         - *Created by:* {}\n\
         - *Assigned reviewer:* {}\n\
         - *Link:* {}",
        pull_request.title, repo, pull_request.author_login, reviewer_name, pull_request.url
    )
}

// =============================================================================
// Report
// =============================================================================

/// JSON payload returned to the calling agent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentReport {
    pub status: &'static str,
    pub message: String,
    pub pr: PullRequestSummary,
    pub reviewer: ReviewerSummary,
    pub team: String,
    pub thread_key: String,
    pub notified: bool,
    pub selection_criteria: SelectionCriteria,
}

#[derive(Debug, Clone, Serialize)]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewerSummary {
    pub name: String,
    pub github: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionCriteria {
    pub method: String,
    pub available_reviewers: Vec<CandidateSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub name: String,
    pub github: String,
    pub email: String,
    /// Normalized score
    pub reviews_count: f64,
    pub completed_reviews: u32,
    pub pending_reviews: u32,
}

impl AssignmentOutcome {
    /// Payload for the calling agent, including the full ranking.
    pub fn report(&self) -> AssignmentReport {
        AssignmentReport {
            status: "success",
            message: format!(
                "Reviewer assigned successfully: {} ({})",
                self.reviewer.name, self.reviewer.github_login
            ),
            pr: PullRequestSummary {
                number: self.pr_number,
                title: self.pull_request.title.clone(),
                url: self.pull_request.url.clone(),
                author: self.pull_request.author_login.clone(),
            },
            reviewer: ReviewerSummary {
                name: self.reviewer.name.clone(),
                github: self.reviewer.github_login.clone(),
                email: self.reviewer.email.clone(),
            },
            team: self.team.clone(),
            thread_key: self.thread_key.clone(),
            notified: self.notified,
            selection_criteria: SelectionCriteria {
                method: format!("Lowest review workload over the last {} days", self.days),
                available_reviewers: self
                    .ranking
                    .iter()
                    .map(|stats| CandidateSummary {
                        name: stats.member.name.clone(),
                        github: stats.member.github_login.clone(),
                        email: stats.member.email.clone(),
                        reviews_count: stats.normalized_score,
                        completed_reviews: stats.completed_review_count,
                        pending_reviews: stats.pending_review_count,
                    })
                    .collect(),
            },
        }
    }
}
