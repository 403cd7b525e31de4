//! Tool handlers for MCP server.
//!
//! Every tool reloads the configuration, so edits to the config file apply
//! to the next call without restarting the server.

use std::sync::Arc;

use reviewer_core::{Config, ConfigSource, TeamConfig};
use reviewer_engine::{
    find_team_by_name, resolve_team_for_repository, AssignError, AssignmentRequest,
    ReviewerAssignment,
};
use reviewer_gchat::thread_name_from_url;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::protocol::{ToolCallResult, ToolDefinition};

/// Why a tool call failed.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Assign(#[from] AssignError),

    #[error("failed to load configuration: {0}")]
    Config(#[source] reviewer_core::Error),

    #[error("failed to resolve team membership: {0}")]
    Membership(#[source] reviewer_core::Error),

    #[error("either team or repo is required")]
    MissingTarget,

    #[error("team {0} is not configured")]
    UnknownTeam(String),

    #[error("repository {0} does not belong to any configured team")]
    UnknownRepository(String),

    #[error("no webhook_url configured for team {0}")]
    NoWebhook(String),

    #[error("failed to post message: {0}")]
    Notify(#[source] reviewer_core::Error),

    #[error("failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Arguments of `assign_reviewer`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignReviewerParams {
    pub repo: String,
    pub pr_number: u64,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub thread_key: Option<String>,
    #[serde(default)]
    pub exclude_login: Option<String>,
}

/// Arguments of `open_review_thread`.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenReviewThreadParams {
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    pub thread_key: String,
    pub text: String,
}

/// Team entry of the `list_teams` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub name: String,
    /// GitHub logins, without the team's static exclusions
    pub members: Vec<String>,
    pub repositories: Vec<String>,
}

impl TeamSummary {
    fn from_team(team: &TeamConfig) -> Self {
        Self {
            name: team.name.clone(),
            members: team
                .members
                .iter()
                .filter(|m| !m.github_login.is_empty() && !team.is_excluded(&m.github_login))
                .map(|m| m.github_login.clone())
                .collect(),
            repositories: team.repositories.clone(),
        }
    }
}

/// Tool handler that executes tools against the assignment engine.
pub struct ToolHandler {
    config: ConfigSource,
    assignment: Arc<ReviewerAssignment>,
}

impl ToolHandler {
    pub fn new(config: ConfigSource, assignment: Arc<ReviewerAssignment>) -> Self {
        Self { config, assignment }
    }

    /// Get available tool definitions.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "assign_reviewer".to_string(),
                description: "Assign the least-loaded eligible team member as reviewer of a \
                              pull request and announce it in the team's chat thread"
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "repo": {
                            "type": "string",
                            "description": "Repository as owner/name"
                        },
                        "pr_number": {
                            "type": "integer",
                            "description": "Pull request number",
                            "minimum": 1
                        },
                        "days": {
                            "type": "integer",
                            "description": "Lookback window for completed reviews (default: review_days from config, 15)",
                            "minimum": 1
                        },
                        "thread_key": {
                            "type": "string",
                            "description": "Chat thread key, thread name or thread link (default: review-pr-<number>)"
                        },
                        "exclude_login": {
                            "type": "string",
                            "description": "GitHub login to leave out for this request"
                        }
                    },
                    "required": ["repo", "pr_number"]
                }),
            },
            ToolDefinition {
                name: "list_teams".to_string(),
                description: "List configured teams with their members and repositories"
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            ToolDefinition {
                name: "open_review_thread".to_string(),
                description: "Post a message into a team's chat thread".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "team": {
                            "type": "string",
                            "description": "Team name"
                        },
                        "repo": {
                            "type": "string",
                            "description": "Repository as owner/name, used when team is not given"
                        },
                        "thread_key": {
                            "type": "string",
                            "description": "Chat thread key, thread name or thread link"
                        },
                        "text": {
                            "type": "string",
                            "description": "Message text"
                        }
                    },
                    "required": ["thread_key", "text"]
                }),
            },
        ]
    }

    /// Execute a tool by name with arguments.
    pub async fn execute(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        let result = match name {
            "assign_reviewer" => match parse_arguments(arguments) {
                Ok(params) => self.assign_reviewer(params).await,
                Err(e) => Err(e),
            },
            "list_teams" => self.list_teams().await,
            "open_review_thread" => match parse_arguments(arguments) {
                Ok(params) => self.open_review_thread(params).await,
                Err(e) => Err(e),
            },
            _ => return ToolCallResult::error(format!("Unknown tool: {}", name)),
        };

        match result {
            Ok(value) => ToolCallResult::json(&value),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                ToolCallResult::error(
                    json!({"status": "error", "message": e.to_string()}).to_string(),
                )
            }
        }
    }

    /// Assign a reviewer and return the assignment report.
    pub async fn assign_reviewer(&self, params: AssignReviewerParams) -> Result<Value, ToolError> {
        let repo = params.repo.trim();
        if repo.is_empty() {
            return Err(ToolError::InvalidArguments("repo must not be empty".to_string()));
        }
        if params.pr_number == 0 {
            return Err(ToolError::InvalidArguments(
                "pr_number must be a positive integer".to_string(),
            ));
        }
        if params.days == Some(0) {
            return Err(ToolError::InvalidArguments(
                "days must be a positive integer".to_string(),
            ));
        }

        let mut request = AssignmentRequest::new(repo, params.pr_number);
        if let Some(days) = params.days {
            request = request.with_days(days);
        }
        if let Some(thread_key) = params.thread_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.with_thread_key(normalize_thread_key(thread_key));
        }
        if let Some(login) = params.exclude_login {
            request = request.excluding(login);
        }

        let outcome = self.assignment.assign_from(&self.config, request).await?;
        to_value(&outcome.report())
    }

    /// Teams after membership resolution.
    pub async fn list_teams(&self) -> Result<Value, ToolError> {
        let config = self.load_config()?;
        let teams = self
            .assignment
            .resolver()
            .resolve_membership(&config)
            .await
            .map_err(ToolError::Membership)?;

        let summaries: Vec<TeamSummary> = teams.iter().map(TeamSummary::from_team).collect();
        Ok(json!({ "teams": to_value(&summaries)? }))
    }

    /// Post a message into the thread of a team, found by name or repository.
    pub async fn open_review_thread(
        &self,
        params: OpenReviewThreadParams,
    ) -> Result<Value, ToolError> {
        if params.thread_key.trim().is_empty() || params.text.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "thread_key and text must not be empty".to_string(),
            ));
        }

        let config = self.load_config()?;
        let team = select_team(&config, params.team.as_deref(), params.repo.as_deref())?;

        let webhook_url = team
            .webhook_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ToolError::NoWebhook(team.name.clone()))?;

        let thread_key = normalize_thread_key(params.thread_key.trim());
        self.assignment
            .notifier()
            .post_message(webhook_url, &thread_key, &params.text)
            .await
            .map_err(ToolError::Notify)?;

        tracing::info!(team = %team.name, thread_key = %thread_key, "Posted message to review thread");

        Ok(json!({
            "status": "success",
            "threadKey": thread_key,
            "team": team.name,
            "repo": params.repo,
        }))
    }

    fn load_config(&self) -> Result<Config, ToolError> {
        self.config.load().map_err(ToolError::Config)
    }
}

fn select_team<'a>(
    config: &'a Config,
    team: Option<&str>,
    repo: Option<&str>,
) -> Result<&'a TeamConfig, ToolError> {
    let team = team.map(str::trim).filter(|t| !t.is_empty());
    let repo = repo.map(str::trim).filter(|r| !r.is_empty());

    match (team, repo) {
        (Some(name), _) => find_team_by_name(&config.teams, name)
            .ok_or_else(|| ToolError::UnknownTeam(name.to_string())),
        (None, Some(repo)) => resolve_team_for_repository(&config.teams, repo)
            .ok_or_else(|| ToolError::UnknownRepository(repo.to_string())),
        (None, None) => Err(ToolError::MissingTarget),
    }
}

/// Chat thread links are turned into thread names; anything else is kept.
fn normalize_thread_key(thread_key: &str) -> String {
    if thread_key.starts_with("http://") || thread_key.starts_with("https://") {
        if let Some(name) = thread_name_from_url(thread_key) {
            return name;
        }
    }
    thread_key.to_string()
}

fn parse_arguments<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T, ToolError> {
    let arguments = arguments.unwrap_or_else(|| json!({}));
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(value)?)
}
