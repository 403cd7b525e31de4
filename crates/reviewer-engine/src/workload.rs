//! Workload scoring.
//!
//! A candidate's score is their completed reviews in the lookback window
//! plus twice their outstanding review requests, divided by their workload
//! factor. Only pull requests in the team's repositories count. The lowest
//! score is the least loaded reviewer.
//!
//! Each candidate costs two search requests, so only a few candidates are
//! scored at a time to stay under the search API rate limit.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reviewer_core::{ReviewHistoryProvider, ReviewerStats, TeamMember};
use tracing::{debug, warn};

/// Outcome of a selection: the chosen member and the full ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewerSelection {
    pub selected: TeamMember,
    /// Candidates sorted by ascending normalized score
    pub stats: Vec<ReviewerStats>,
}

/// Candidates scored at the same time by default.
pub const DEFAULT_SCORING_CONCURRENCY: usize = 4;

/// Scores candidates against the review-history provider.
pub struct WorkloadScorer {
    history: Arc<dyn ReviewHistoryProvider>,
    concurrency: usize,
}

impl WorkloadScorer {
    pub fn new(history: Arc<dyn ReviewHistoryProvider>) -> Self {
        Self {
            history,
            concurrency: DEFAULT_SCORING_CONCURRENCY,
        }
    }

    /// Limit how many candidates are scored at once (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Reviews completed by `member` in the last `days` days on team repositories.
    ///
    /// A failed lookup counts as zero.
    pub async fn count_completed_reviews(
        &self,
        member: &TeamMember,
        team_repositories: &[String],
        days: u32,
    ) -> u32 {
        match self
            .history
            .search_reviewed_by(&member.github_login, days)
            .await
        {
            Ok(reviewed) => count_in_repositories(
                reviewed.iter().map(|pr| pr.repository.as_str()),
                team_repositories,
            ),
            Err(e) => {
                warn!(login = %member.github_login, error = %e, "Failed to count completed reviews, using 0");
                0
            }
        }
    }

    /// Review requests still outstanding for `member` on team repositories.
    ///
    /// A failed lookup counts as zero.
    pub async fn count_pending_reviews(
        &self,
        member: &TeamMember,
        team_repositories: &[String],
    ) -> u32 {
        match self
            .history
            .search_pending_review_for(&member.github_login)
            .await
        {
            Ok(pending) => count_in_repositories(
                pending.iter().map(|pr| pr.repository.as_str()),
                team_repositories,
            ),
            Err(e) => {
                warn!(login = %member.github_login, error = %e, "Failed to count pending reviews, using 0");
                0
            }
        }
    }

    /// Stats for every candidate, in input order.
    ///
    /// Up to `concurrency` candidates are queried at once.
    pub async fn score_candidates(
        &self,
        members: &[TeamMember],
        team_repositories: &[String],
        days: u32,
    ) -> Vec<ReviewerStats> {
        stream::iter(
            members
                .iter()
                .map(|member| self.score_member(member, team_repositories, days)),
        )
        .buffered(self.concurrency)
        .collect()
        .await
    }

    async fn score_member(
        &self,
        member: &TeamMember,
        team_repositories: &[String],
        days: u32,
    ) -> ReviewerStats {
        if let Some(factor) = member.workload_factor {
            if factor != member.effective_workload_factor() {
                warn!(login = %member.github_login, factor, "Ignoring invalid workload factor");
            }
        }

        let (completed, pending) = futures::join!(
            self.count_completed_reviews(member, team_repositories, days),
            self.count_pending_reviews(member, team_repositories),
        );

        let stats = ReviewerStats::new(member.clone(), completed, pending);
        debug!(
            login = %member.github_login,
            completed,
            pending,
            score = stats.normalized_score,
            "Scored candidate"
        );
        stats
    }

    /// Pick the candidate with the lowest normalized score.
    ///
    /// Ties keep input order. Returns `None` when `members` is empty.
    pub async fn select_optimal_reviewer(
        &self,
        members: &[TeamMember],
        team_repositories: &[String],
        days: u32,
    ) -> Option<ReviewerSelection> {
        if members.is_empty() {
            return None;
        }

        let mut stats = self.score_candidates(members, team_repositories, days).await;
        stats.sort_by(|a, b| a.normalized_score.total_cmp(&b.normalized_score));

        let selected = stats.first()?.member.clone();
        Some(ReviewerSelection { selected, stats })
    }
}

fn count_in_repositories<'a>(
    repositories: impl Iterator<Item = &'a str>,
    team_repositories: &[String],
) -> u32 {
    let count = repositories
        .filter(|repo| team_repositories.iter().any(|team_repo| team_repo.as_str() == *repo))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reviewer_core::{Error, PullRequestRef, Result};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// History provider answering from fixed per-login repository lists.
    #[derive(Default)]
    struct FixedHistory {
        reviewed: HashMap<String, Vec<&'static str>>,
        pending: HashMap<String, Vec<&'static str>>,
        failing: Vec<String>,
        calls: AtomicUsize,
    }

    impl FixedHistory {
        fn reviewed(mut self, login: &str, repos: Vec<&'static str>) -> Self {
            self.reviewed.insert(login.to_string(), repos);
            self
        }

        fn pending(mut self, login: &str, repos: Vec<&'static str>) -> Self {
            self.pending.insert(login.to_string(), repos);
            self
        }

        fn failing(mut self, login: &str) -> Self {
            self.failing.push(login.to_string());
            self
        }

        fn lookup(
            &self,
            map: &HashMap<String, Vec<&'static str>>,
            login: &str,
        ) -> Result<Vec<PullRequestRef>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.iter().any(|l| l == login) {
                return Err(Error::Command("gh search failed".to_string()));
            }
            Ok(map
                .get(login)
                .map(|repos| {
                    repos
                        .iter()
                        .enumerate()
                        .map(|(i, repo)| PullRequestRef {
                            number: i as u64 + 1,
                            title: format!("PR {}", i),
                            url: String::new(),
                            repository: repo.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    #[async_trait]
    impl ReviewHistoryProvider for FixedHistory {
        async fn search_reviewed_by(
            &self,
            login: &str,
            _since_days_ago: u32,
        ) -> Result<Vec<PullRequestRef>> {
            self.lookup(&self.reviewed, login)
        }

        async fn search_pending_review_for(&self, login: &str) -> Result<Vec<PullRequestRef>> {
            self.lookup(&self.pending, login)
        }
    }

    fn repos() -> Vec<String> {
        vec!["acme/api".to_string(), "acme/web".to_string()]
    }

    fn member(login: &str) -> TeamMember {
        TeamMember::new(login, format!("{}@acme.io", login), login)
    }

    fn scorer(history: FixedHistory) -> WorkloadScorer {
        WorkloadScorer::new(Arc::new(history))
    }

    #[tokio::test]
    async fn test_completed_counts_only_team_repositories() {
        let history = FixedHistory::default().reviewed(
            "ana",
            vec!["acme/api", "acme/api", "other/api", "acme/web", "acme/web-x"],
        );
        let count = scorer(history)
            .count_completed_reviews(&member("ana"), &repos(), 15)
            .await;
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_pending_counts_only_team_repositories() {
        let history = FixedHistory::default().pending("ana", vec!["acme/web", "other/web"]);
        let count = scorer(history)
            .count_pending_reviews(&member("ana"), &repos())
            .await;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_counts_zero() {
        let history = FixedHistory::default()
            .reviewed("ana", vec!["acme/api"])
            .failing("ana");
        let scorer = scorer(history);
        assert_eq!(
            scorer.count_completed_reviews(&member("ana"), &repos(), 15).await,
            0
        );
        assert_eq!(scorer.count_pending_reviews(&member("ana"), &repos()).await, 0);
    }

    #[tokio::test]
    async fn test_score_candidates_keeps_input_order() {
        let history = FixedHistory::default()
            .reviewed("ana", vec!["acme/api", "acme/api"])
            .pending("bob", vec!["acme/web"]);
        let scorer = scorer(history);

        let stats = scorer
            .score_candidates(&[member("bob"), member("ana")], &repos(), 15)
            .await;

        assert_eq!(stats[0].member.github_login, "bob");
        assert_eq!(stats[0].completed_review_count, 0);
        assert_eq!(stats[0].pending_review_count, 1);
        assert_eq!(stats[0].normalized_score, 2.0);
        assert_eq!(stats[1].member.github_login, "ana");
        assert_eq!(stats[1].normalized_score, 2.0);
    }

    #[tokio::test]
    async fn test_select_lowest_score() {
        let history = FixedHistory::default()
            .reviewed("a", vec!["acme/api", "acme/api"])
            .reviewed("b", vec!["acme/api", "acme/web", "acme/web"]);

        let selection = scorer(history)
            .select_optimal_reviewer(&[member("a"), member("b")], &repos(), 15)
            .await
            .unwrap();

        assert_eq!(selection.selected.github_login, "a");
        let ranked: Vec<_> = selection
            .stats
            .iter()
            .map(|s| (s.member.github_login.as_str(), s.normalized_score))
            .collect();
        assert_eq!(ranked, vec![("a", 2.0), ("b", 3.0)]);
    }

    #[tokio::test]
    async fn test_select_accounts_for_workload_factor() {
        let history = FixedHistory::default()
            .reviewed("a", vec!["acme/api", "acme/api"])
            .reviewed("b", vec!["acme/api"]);
        let reduced = member("b").with_workload_factor(0.3);

        let selection = scorer(history)
            .select_optimal_reviewer(&[member("a"), reduced], &repos(), 15)
            .await
            .unwrap();

        assert_eq!(selection.selected.github_login, "a");
        assert_eq!(selection.stats[0].normalized_score, 2.0);
        assert!((selection.stats[1].normalized_score - 3.333).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_select_ties_keep_input_order() {
        let history = FixedHistory::default()
            .reviewed("a", vec!["acme/api"])
            .reviewed("b", vec!["acme/api"])
            .reviewed("c", vec!["acme/api"]);

        let selection = scorer(history)
            .select_optimal_reviewer(&[member("c"), member("a"), member("b")], &repos(), 15)
            .await
            .unwrap();

        let order: Vec<_> = selection
            .stats
            .iter()
            .map(|s| s.member.github_login.as_str())
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert_eq!(selection.selected.github_login, "c");
    }

    #[tokio::test]
    async fn test_pending_weighs_double() {
        let history = FixedHistory::default()
            .reviewed("a", vec!["acme/api", "acme/api", "acme/api"])
            .pending("b", vec!["acme/api", "acme/web"]);

        let selection = scorer(history)
            .select_optimal_reviewer(&[member("b"), member("a")], &repos(), 15)
            .await
            .unwrap();

        assert_eq!(selection.selected.github_login, "a");
        assert_eq!(selection.stats[1].normalized_score, 4.0);
    }

    #[tokio::test]
    async fn test_select_empty_is_none() {
        let history = FixedHistory::default();
        let scorer = scorer(history);
        assert!(scorer.select_optimal_reviewer(&[], &repos(), 15).await.is_none());
    }

    #[tokio::test]
    async fn test_each_candidate_queried_twice() {
        let history = Arc::new(FixedHistory::default());
        let scorer = WorkloadScorer::new(history.clone());

        scorer
            .score_candidates(&[member("a"), member("b"), member("c")], &repos(), 15)
            .await;

        assert_eq!(history.calls.load(Ordering::SeqCst), 6);
    }

    /// Tracks how many searches are running at the same time.
    #[derive(Default)]
    struct SlowHistory {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowHistory {
        async fn search(&self, login: &str) -> Result<Vec<PullRequestRef>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(vec![PullRequestRef {
                number: 1,
                title: login.to_string(),
                url: String::new(),
                repository: "acme/api".to_string(),
            }])
        }
    }

    #[async_trait]
    impl ReviewHistoryProvider for SlowHistory {
        async fn search_reviewed_by(
            &self,
            login: &str,
            _since_days_ago: u32,
        ) -> Result<Vec<PullRequestRef>> {
            self.search(login).await
        }

        async fn search_pending_review_for(&self, login: &str) -> Result<Vec<PullRequestRef>> {
            self.search(login).await
        }
    }

    #[tokio::test]
    async fn test_score_candidates_bounded_concurrency() {
        let history = Arc::new(SlowHistory::default());
        let scorer = WorkloadScorer::new(history.clone()).with_concurrency(2);
        let members: Vec<_> = ["a", "b", "c", "d", "e", "f"]
            .into_iter()
            .map(member)
            .collect();

        let stats = scorer.score_candidates(&members, &repos(), 15).await;

        let logins: Vec<_> = stats.iter().map(|s| s.member.github_login.as_str()).collect();
        assert_eq!(logins, vec!["a", "b", "c", "d", "e", "f"]);
        assert!(stats.iter().all(|s| s.normalized_score == 3.0));

        let peak = history.peak.load(Ordering::SeqCst);
        assert!(peak > 1, "searches should overlap, peak was {}", peak);
        assert!(peak <= 4, "at most two candidates at once, peak was {}", peak);
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let scorer =
            WorkloadScorer::new(Arc::new(FixedHistory::default())).with_concurrency(0);
        assert_eq!(scorer.concurrency, 1);
    }

    #[test]
    fn test_score_monotonicity() {
        for completed in 0..5u32 {
            for pending in 0..5u32 {
                let base = ReviewerStats::score(completed, pending, 1.0);
                assert!(ReviewerStats::score(completed + 1, pending, 1.0) >= base);
                assert!(ReviewerStats::score(completed, pending + 1, 1.0) >= base);
                for factor in [0.25, 0.5, 1.0, 1.5] {
                    let score = ReviewerStats::score(completed, pending, factor);
                    assert!(ReviewerStats::score(completed, pending, factor * 2.0) <= score);
                }
            }
        }
    }
}
