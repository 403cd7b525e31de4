//! GitHub backend for reviewer-tools.
//!
//! Implements the directory, review history, pull request and reviewer
//! request capabilities on top of the GitHub REST API.

mod auth;
mod client;
mod types;

pub use auth::resolve_token;
pub use client::GitHubClient;
pub use types::*;

/// Default GitHub API URL.
pub const DEFAULT_GITHUB_URL: &str = "https://api.github.com";
