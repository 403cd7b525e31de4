//! Reviewer CLI - Command-line interface for reviewer-tools.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, Subcommand};
use reviewer_core::{Config, ConfigSource, LogConfig};
use reviewer_engine::{Collaborators, ReviewerAssignment};
use reviewer_gchat::GoogleChatClient;
use reviewer_github::{resolve_token, GitHubClient, DEFAULT_GITHUB_URL};
use reviewer_mcp::handlers::{AssignReviewerParams, OpenReviewThreadParams};
use reviewer_mcp::{McpServer, ToolHandler};
use serde_json::Value;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file name inside the configured log directory.
const LOG_FILE_NAME: &str = "reviewer.log";

#[derive(Parser)]
#[command(name = "reviewer")]
#[command(author, version, about = "Reviewer - workload-aware pull request reviewer assignment", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: $REVIEWER_CONFIG, then the user config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdin/stdout
    Serve,

    /// Assign a reviewer to a pull request
    Assign {
        /// Repository as owner/name
        repo: String,

        /// Pull request number
        pr_number: u64,

        /// Lookback window in days (default: review_days from config)
        #[arg(long)]
        days: Option<u32>,

        /// Chat thread key, thread name or thread link
        #[arg(long)]
        thread_key: Option<String>,

        /// GitHub login to leave out for this request
        #[arg(long)]
        exclude: Option<String>,
    },

    /// List teams with their resolved members
    Teams,

    /// Post a message into a team's chat thread
    Thread {
        /// Chat thread key, thread name or thread link
        #[arg(long)]
        thread_key: String,

        /// Message text
        #[arg(long)]
        text: String,

        /// Team name
        #[arg(long, conflicts_with = "repo", required_unless_present = "repo")]
        team: Option<String>,

        /// Repository whose team owns the thread
        #[arg(long)]
        repo: Option<String>,
    },

    /// Show or edit the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the config file path
    Path,

    /// Get a configuration value
    Get {
        /// Key, e.g. review_days or github.base_url
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Key, e.g. review_days or github.token
        key: String,
        /// New value
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => Config::config_path()?,
    };

    init_logging(cli.verbose, &config_path);

    match cli.command {
        Some(Commands::Serve) => {
            let handler = build_handler(&config_path).await?;
            McpServer::new(handler).run().await?;
        }
        Some(Commands::Assign {
            repo,
            pr_number,
            days,
            thread_key,
            exclude,
        }) => {
            let handler = build_handler(&config_path).await?;
            let report = handler
                .assign_reviewer(AssignReviewerParams {
                    repo,
                    pr_number,
                    days,
                    thread_key,
                    exclude_login: exclude,
                })
                .await?;
            print_json(&report)?;
        }
        Some(Commands::Teams) => {
            let handler = build_handler(&config_path).await?;
            print_json(&handler.list_teams().await?)?;
        }
        Some(Commands::Thread {
            thread_key,
            text,
            team,
            repo,
        }) => {
            let handler = build_handler(&config_path).await?;
            let result = handler
                .open_review_thread(OpenReviewThreadParams {
                    team,
                    repo,
                    thread_key,
                    text,
                })
                .await?;
            print_json(&result)?;
        }
        Some(Commands::Config { command }) => run_config(command, &config_path)?,
        None => {
            println!("Reviewer - workload-aware pull request reviewer assignment");
            println!("Run with --help for usage information");
        }
    }

    Ok(())
}

/// Log to stderr, and to `reviewer.log` in the log directory when file logs
/// are enabled. Stdout carries the MCP stream and command output.
///
/// Level: `--verbose`, then `RUST_LOG`, then `logs.level` from the config
/// file, then `info`.
fn init_logging(verbose: bool, config_path: &Path) {
    let config = Config::load_from(config_path).ok();

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = config
                .as_ref()
                .map(|config| config.logs.level.as_str())
                .unwrap_or("info");
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
        })
    };

    let (log_file, file_error) = match config
        .as_ref()
        .map(|config| open_log_file(&config.logs))
        .transpose()
    {
        Ok(file) => (file.flatten(), None),
        Err(e) => (None, Some(e)),
    };
    let log_path = log_file.as_ref().map(|(path, _)| path.clone());
    let file_layer = log_file.map(|(_, file)| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(path) = log_path {
        tracing::debug!(path = ?path, "Writing logs to file");
    }
    if let Some(e) = file_error {
        tracing::warn!(error = %e, "File logging disabled");
    }
}

/// Open the log file for appending, creating its directory.
///
/// Returns `Ok(None)` when file logs are turned off.
fn open_log_file(logs: &LogConfig) -> anyhow::Result<Option<(PathBuf, File)>> {
    if !logs.enable_file_logs {
        return Ok(None);
    }

    let dir = logs.resolved_log_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Ok(Some((path, file)))
}

/// Wire the GitHub and Google Chat clients into a tool handler.
///
/// The config file must exist; it is read again by every tool call.
async fn build_handler(config_path: &Path) -> anyhow::Result<ToolHandler> {
    let config = Config::load_from(config_path)?;
    let github_config = config.github.unwrap_or_default();

    let token = resolve_token(github_config.token.as_deref()).await;
    let base_url = github_config
        .base_url
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_GITHUB_URL.to_string());
    tracing::debug!(base_url = %base_url, authenticated = token.is_some(), "GitHub client configured");

    let github = Arc::new(GitHubClient::with_base_url(base_url, token));
    let chat = Arc::new(GoogleChatClient::new());
    let assignment = ReviewerAssignment::new(Collaborators::from_host(github, chat));

    Ok(ToolHandler::new(
        ConfigSource::File(config_path.to_path_buf()),
        Arc::new(assignment),
    ))
}

fn run_config(command: ConfigCommands, config_path: &Path) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = Config::load_from(config_path)?;
            print!("{}", render_config(&config)?);
        }
        ConfigCommands::Path => println!("{}", config_path.display()),
        ConfigCommands::Get { key } => {
            let config = Config::load_from(config_path)?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => println!("(not set)"),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = if config_path.exists() {
                Config::load_from(config_path)?
            } else {
                Config::default()
            };
            config.set(&key, &value)?;
            config.save_to(config_path)?;
            tracing::info!(key = %key, path = ?config_path, "Config updated");
        }
    }

    Ok(())
}

/// TOML rendering with the GitHub token masked.
fn render_config(config: &Config) -> anyhow::Result<String> {
    let mut shown = config.clone();
    if let Some(github) = shown.github.as_mut() {
        if github.token.is_some() {
            github.token = Some("********".to_string());
        }
    }
    toml::to_string_pretty(&shown).context("Failed to render config")
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
