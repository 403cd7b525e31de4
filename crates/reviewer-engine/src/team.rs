//! Team resolution: which team owns a repository, who is on it, and who is
//! eligible to review.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use reviewer_core::{Config, DirectoryProvider, Result, TeamConfig, TeamMember};
use tracing::{debug, info, warn};

use crate::cache::MembershipCache;

/// Whether `repo` (`owner/name`) belongs to `team`.
///
/// Entries match exactly, or as a literal prefix when they end in `*`.
pub fn is_team_repository(team: &TeamConfig, repo: &str) -> bool {
    team.repositories
        .iter()
        .any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => repo.starts_with(prefix),
            None => repo == pattern,
        })
}

/// First team, in configured order, that owns `repo`.
pub fn resolve_team_for_repository<'a>(
    teams: &'a [TeamConfig],
    repo: &str,
) -> Option<&'a TeamConfig> {
    teams.iter().find(|team| is_team_repository(team, repo))
}

/// Team with the given name, ignoring case.
pub fn find_team_by_name<'a>(teams: &'a [TeamConfig], name: &str) -> Option<&'a TeamConfig> {
    teams.iter().find(|team| team.name.eq_ignore_ascii_case(name))
}

/// Members eligible to review for `team`.
///
/// Drops members without a GitHub login, members listed in
/// `exclude_logins`, and members in the team's own exclusion list. All
/// comparisons ignore case. Order is preserved.
pub fn available_members<S: AsRef<str>>(
    team: &TeamConfig,
    exclude_logins: &[S],
) -> Vec<TeamMember> {
    if team.members.is_empty() {
        warn!(team = %team.name, "Team has no configured members");
        return Vec::new();
    }

    let available: Vec<TeamMember> = team
        .members
        .iter()
        .filter(|member| {
            if member.github_login.is_empty() {
                warn!(team = %team.name, member = %member.name, "Member has no GitHub login configured");
                return false;
            }
            let transient = exclude_logins
                .iter()
                .any(|login| member.has_login(login.as_ref()));
            !transient && !team.is_excluded(&member.github_login)
        })
        .cloned()
        .collect();

    if available.is_empty() {
        let excluded: Vec<&str> = exclude_logins.iter().map(|l| l.as_ref()).collect();
        warn!(team = %team.name, excluded = ?excluded, "No members available for review");
    }

    available
}

/// Merge directory members with the statically configured ones.
///
/// Keyed by lowercased login:
/// - in both: the directory's login casing, the configured name, email and
///   workload factor when set, the directory's values otherwise
/// - directory only: kept as fetched
/// - configured only: kept as configured
///
/// Directory members come first, in fetch order, followed by configured-only
/// members.
pub fn merge_members(directory: &[TeamMember], configured: &[TeamMember]) -> Vec<TeamMember> {
    let mut merged: Vec<TeamMember> = Vec::with_capacity(directory.len() + configured.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for member in directory {
        match index.get(&member.login_key()) {
            Some(&i) => merged[i] = member.clone(),
            None => {
                index.insert(member.login_key(), merged.len());
                merged.push(member.clone());
            }
        }
    }

    for member in configured {
        match index.get(&member.login_key()) {
            Some(&i) => merged[i] = merge_member(&merged[i], member),
            None => {
                index.insert(member.login_key(), merged.len());
                merged.push(member.clone());
            }
        }
    }

    merged
}

fn merge_member(directory: &TeamMember, configured: &TeamMember) -> TeamMember {
    fn prefer(configured: &str, directory: &str) -> String {
        if configured.is_empty() {
            directory.to_string()
        } else {
            configured.to_string()
        }
    }

    TeamMember {
        name: prefer(&configured.name, &directory.name),
        email: prefer(&configured.email, &directory.email),
        github_login: directory.github_login.clone(),
        workload_factor: configured.workload_factor.or(directory.workload_factor),
    }
}

/// Resolves team membership, consulting the directory through a cache.
pub struct TeamResolver {
    directory: Arc<dyn DirectoryProvider>,
    cache: Arc<MembershipCache>,
}

impl TeamResolver {
    pub fn new(directory: Arc<dyn DirectoryProvider>, cache: Arc<MembershipCache>) -> Self {
        Self { directory, cache }
    }

    pub fn cache(&self) -> &Arc<MembershipCache> {
        &self.cache
    }

    /// Directory members of `org/team_slug`, fetched at most once per cache.
    pub async fn directory_members(&self, org: &str, team_slug: &str) -> Result<Vec<TeamMember>> {
        if let Some(cached) = self.cache.get(org, team_slug) {
            debug!(org, team_slug, fetched_at = %cached.fetched_at, "Using cached team members");
            return Ok(cached.members);
        }

        let members = self.directory.get_members(org, team_slug).await?;
        info!(
            org,
            team_slug,
            count = members.len(),
            "Fetched team members from directory"
        );
        self.cache.insert(org, team_slug, members.clone());
        Ok(members)
    }

    /// Teams with directory membership merged in when auto-detection is on.
    ///
    /// Returns new values; `config` is left untouched. A directory failure
    /// aborts the whole resolution.
    pub async fn resolve_membership(&self, config: &Config) -> Result<Vec<TeamConfig>> {
        if !config.auto_detect_members {
            return Ok(config.teams.clone());
        }

        join_all(config.teams.iter().map(|team| self.resolve_team(team)))
            .await
            .into_iter()
            .collect()
    }

    async fn resolve_team(&self, team: &TeamConfig) -> Result<TeamConfig> {
        let Some((org, team_slug)) = team.directory_key() else {
            return Ok(team.clone());
        };

        let fetched = self.directory_members(org, team_slug).await?;
        Ok(TeamConfig {
            members: merge_members(&fetched, &team.members),
            ..team.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Directory {}

        #[async_trait]
        impl DirectoryProvider for Directory {
            async fn get_members(&self, org: &str, team_slug: &str) -> Result<Vec<TeamMember>>;
        }
    }

    fn member(login: &str) -> TeamMember {
        TeamMember::new(format!("{} name", login), format!("{}@acme.io", login), login)
    }

    fn team(repositories: &[&str], members: Vec<TeamMember>) -> TeamConfig {
        TeamConfig {
            name: "core".to_string(),
            members,
            repositories: repositories.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    fn resolver(directory: MockDirectory) -> TeamResolver {
        TeamResolver::new(Arc::new(directory), Arc::new(MembershipCache::new()))
    }

    fn directory_team(members: Vec<TeamMember>) -> TeamConfig {
        TeamConfig {
            name: "platform".to_string(),
            org: Some("acme".to_string()),
            team_slug: Some("platform".to_string()),
            members,
            repositories: vec!["acme/api".to_string()],
            ..Default::default()
        }
    }

    // -------------------------------------------------------------------------
    // Repository matching
    // -------------------------------------------------------------------------

    #[test]
    fn test_is_team_repository_exact() {
        let t = team(&["acme/api", "acme/web"], vec![]);
        assert!(is_team_repository(&t, "acme/web"));
        assert!(!is_team_repository(&t, "acme/web2"));
        assert!(!is_team_repository(&t, "acme/ap"));
    }

    #[test]
    fn test_is_team_repository_prefix() {
        let t = team(&["acme/web-*"], vec![]);
        assert!(is_team_repository(&t, "acme/web-"));
        assert!(is_team_repository(&t, "acme/web-admin"));
        assert!(!is_team_repository(&t, "acme/web"));
        assert!(!is_team_repository(&t, "other/web-admin"));
    }

    #[test]
    fn test_is_team_repository_star_is_literal_prefix_only() {
        let t = team(&["acme/*-svc"], vec![]);
        // Only a trailing star has meaning
        assert!(!is_team_repository(&t, "acme/billing-svc"));
        assert!(is_team_repository(&t, "acme/*-svc"));
    }

    #[test]
    fn test_is_team_repository_empty() {
        let t = team(&[], vec![]);
        assert!(!is_team_repository(&t, "acme/api"));
        assert!(!is_team_repository(&t, ""));
    }

    #[test]
    fn test_is_team_repository_property() {
        let patterns = ["acme/api", "acme/web-*", "tools*"];
        let t = team(&patterns, vec![]);
        let repos = [
            "acme/api", "acme/api2", "acme/web-", "acme/web-x", "acme/we", "tools",
            "tools/cli", "tool", "",
        ];

        for repo in repos {
            let expected = patterns.iter().any(|p| match p.strip_suffix('*') {
                Some(prefix) => repo.starts_with(prefix),
                None => repo == *p,
            });
            assert_eq!(is_team_repository(&t, repo), expected, "repo {repo}");
        }
    }

    #[test]
    fn test_resolve_team_first_match_wins() {
        let mut first = team(&["acme/*"], vec![]);
        first.name = "first".to_string();
        let mut second = team(&["acme/api"], vec![]);
        second.name = "second".to_string();
        let teams = vec![first, second];

        assert_eq!(
            resolve_team_for_repository(&teams, "acme/api").unwrap().name,
            "first"
        );
        assert!(resolve_team_for_repository(&teams, "other/api").is_none());
    }

    #[test]
    fn test_find_team_by_name() {
        let teams = vec![team(&[], vec![])];
        assert!(find_team_by_name(&teams, "CORE").is_some());
        assert!(find_team_by_name(&teams, "web").is_none());
    }

    // -------------------------------------------------------------------------
    // Eligibility
    // -------------------------------------------------------------------------

    #[test]
    fn test_available_members_excludes_author() {
        let t = team(&[], vec![member("ana"), member("bob")]);
        let available = available_members(&t, &["bob"]);
        assert_eq!(available, vec![member("ana")]);
    }

    #[test]
    fn test_available_members_case_insensitive() {
        let t = team(&[], vec![member("Ana"), member("bob")]);
        let available = available_members(&t, &["ANA"]);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].github_login, "bob");
    }

    #[test]
    fn test_available_members_static_exclusion() {
        let mut t = team(&[], vec![member("ana"), member("release-bot"), member("bob")]);
        t.exclude_members = vec!["Release-Bot".to_string()];
        let available = available_members::<&str>(&t, &[]);
        let logins: Vec<_> = available.iter().map(|m| m.github_login.as_str()).collect();
        assert_eq!(logins, vec!["ana", "bob"]);
    }

    #[test]
    fn test_available_members_drops_missing_login() {
        let t = team(&[], vec![TeamMember::new("Ghost", "g@acme.io", ""), member("ana")]);
        let available = available_members::<&str>(&t, &[]);
        assert_eq!(available, vec![member("ana")]);
    }

    #[test]
    fn test_available_members_empty_team() {
        let t = team(&[], vec![]);
        assert!(available_members(&t, &["ana"]).is_empty());
    }

    #[test]
    fn test_available_members_all_excluded() {
        let mut t = team(&[], vec![member("ana"), member("bob")]);
        t.exclude_members = vec!["bob".to_string()];
        assert!(available_members(&t, &["ana"]).is_empty());
    }

    #[test]
    fn test_excluding_unknown_login_keeps_size() {
        let t = team(&[], vec![member("ana"), member("bob"), member("cy")]);
        let baseline = available_members::<&str>(&t, &[]);
        for unknown in ["zed", "an", "bobby", ""] {
            assert_eq!(available_members(&t, &[unknown]).len(), baseline.len());
        }
    }

    #[test]
    fn test_available_members_idempotent() {
        let mut t = team(&[], vec![member("cy"), member("ana"), member("bob")]);
        t.exclude_members = vec!["bob".to_string()];
        let first = available_members(&t, &["dan"]);
        let second = available_members(&t, &["dan"]);
        assert_eq!(first, second);
        assert_eq!(first, vec![member("cy"), member("ana")]);
    }

    // -------------------------------------------------------------------------
    // Merge
    // -------------------------------------------------------------------------

    #[test]
    fn test_merge_prefers_configured_fields() {
        let directory = vec![
            TeamMember::new("User 1", "user1@example.com", "User1"),
            TeamMember::new("User 2", "user2@example.com", "user2"),
        ];
        let configured =
            vec![TeamMember::new("Custom Name", "custom@example.com", "user1").with_workload_factor(0.5)];

        let merged = merge_members(&directory, &configured);

        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged[0],
            TeamMember::new("Custom Name", "custom@example.com", "User1").with_workload_factor(0.5)
        );
        assert_eq!(merged[1], directory[1]);
    }

    #[test]
    fn test_merge_falls_back_to_directory_fields() {
        let directory =
            vec![TeamMember::new("From Directory", "dir@acme.io", "ana").with_workload_factor(0.8)];
        let configured = vec![TeamMember::new("", "", "ANA")];

        let merged = merge_members(&directory, &configured);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "From Directory");
        assert_eq!(merged[0].email, "dir@acme.io");
        assert_eq!(merged[0].github_login, "ana");
        assert_eq!(merged[0].workload_factor, Some(0.8));
    }

    #[test]
    fn test_merge_keeps_configured_only_members() {
        let directory = vec![member("ana")];
        let configured = vec![member("stale")];

        let merged = merge_members(&directory, &configured);

        let logins: Vec<_> = merged.iter().map(|m| m.github_login.as_str()).collect();
        assert_eq!(logins, vec!["ana", "stale"]);
    }

    #[test]
    fn test_merge_does_not_touch_inputs() {
        let directory = vec![member("ana")];
        let configured = vec![TeamMember::new("Other", "", "ana")];
        let directory_before = directory.clone();
        let configured_before = configured.clone();

        let _ = merge_members(&directory, &configured);

        assert_eq!(directory, directory_before);
        assert_eq!(configured, configured_before);
    }

    // -------------------------------------------------------------------------
    // Resolver
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_resolve_membership_disabled() {
        let mut directory = MockDirectory::new();
        directory.expect_get_members().never();

        let config = Config {
            auto_detect_members: false,
            teams: vec![directory_team(vec![member("ana")])],
            ..Default::default()
        };

        let teams = resolver(directory).resolve_membership(&config).await.unwrap();
        assert_eq!(teams, config.teams);
    }

    #[tokio::test]
    async fn test_resolve_membership_skips_teams_without_directory() {
        let mut directory = MockDirectory::new();
        directory.expect_get_members().never();

        let config = Config {
            auto_detect_members: true,
            teams: vec![team(&["acme/api"], vec![member("ana")])],
            ..Default::default()
        };

        let teams = resolver(directory).resolve_membership(&config).await.unwrap();
        assert_eq!(teams, config.teams);
    }

    #[tokio::test]
    async fn test_resolve_membership_merges_directory() {
        let mut directory = MockDirectory::new();
        directory
            .expect_get_members()
            .times(1)
            .returning(|org, slug| {
                assert_eq!((org, slug), ("acme", "platform"));
                Ok(vec![member("ana"), member("bob")])
            });

        let configured = vec![TeamMember::new("Ana Custom", "", "ANA").with_workload_factor(0.5)];
        let config = Config {
            auto_detect_members: true,
            teams: vec![directory_team(configured.clone())],
            ..Default::default()
        };

        let teams = resolver(directory).resolve_membership(&config).await.unwrap();

        assert_eq!(teams[0].members.len(), 2);
        assert_eq!(teams[0].members[0].name, "Ana Custom");
        assert_eq!(teams[0].members[0].email, "ana@acme.io");
        assert_eq!(teams[0].members[0].github_login, "ana");
        assert_eq!(teams[0].members[0].workload_factor, Some(0.5));
        // Static config untouched
        assert_eq!(config.teams[0].members, configured);
    }

    #[tokio::test]
    async fn test_directory_fetched_once() {
        let mut directory = MockDirectory::new();
        directory
            .expect_get_members()
            .times(1)
            .returning(|_, _| Ok(vec![member("ana")]));

        let resolver = resolver(directory);
        let first = resolver.directory_members("acme", "platform").await.unwrap();
        let second = resolver.directory_members("acme", "platform").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(resolver.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_membership_twice_uses_cache() {
        let mut directory = MockDirectory::new();
        directory
            .expect_get_members()
            .times(1)
            .returning(|_, _| Ok(vec![member("ana")]));

        let config = Config {
            auto_detect_members: true,
            teams: vec![directory_team(vec![])],
            ..Default::default()
        };

        let resolver = resolver(directory);
        resolver.resolve_membership(&config).await.unwrap();
        let teams = resolver.resolve_membership(&config).await.unwrap();
        assert_eq!(teams[0].members, vec![member("ana")]);
    }

    #[tokio::test]
    async fn test_directory_failure_propagates_and_is_not_cached() {
        let mut directory = MockDirectory::new();
        directory
            .expect_get_members()
            .times(1)
            .returning(|_, _| Err(reviewer_core::Error::Auth("bad token".to_string())));

        let config = Config {
            auto_detect_members: true,
            teams: vec![directory_team(vec![member("ana")])],
            ..Default::default()
        };

        let resolver = resolver(directory);
        let err = resolver.resolve_membership(&config).await.unwrap_err();
        assert!(matches!(err, reviewer_core::Error::Auth(_)));
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_directory_cannot_reintroduce_excluded_login() {
        let mut directory = MockDirectory::new();
        directory
            .expect_get_members()
            .returning(|_, _| Ok(vec![member("ana"), member("Release-Bot")]));

        let mut configured_team = directory_team(vec![member("ana")]);
        configured_team.exclude_members = vec!["release-bot".to_string()];
        let config = Config {
            auto_detect_members: true,
            teams: vec![configured_team],
            ..Default::default()
        };

        let teams = resolver(directory).resolve_membership(&config).await.unwrap();
        assert_eq!(teams[0].members.len(), 2);

        let available = available_members::<&str>(&teams[0], &[]);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].github_login, "ana");
    }
}
