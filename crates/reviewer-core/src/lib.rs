//! Core traits, types, and error handling for reviewer-tools.
//!
//! This crate holds the domain model shared by the assignment engine, the
//! API plugins and the MCP server: team configuration, reviewer statistics,
//! the narrow capability traits every external system is accessed through,
//! and the TOML configuration layer.

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::{Config, ConfigSource, GitHubConfig, LogConfig};
pub use error::{Error, Result};
pub use provider::{
    DirectoryProvider, Notifier, PullRequestProvider, ReviewHistoryProvider, ReviewerAssigner,
};
pub use types::{
    PullRequestInfo, PullRequestRef, ReviewerStats, TeamConfig, TeamMember,
    DEFAULT_WORKLOAD_FACTOR, PENDING_REVIEW_WEIGHT,
};
