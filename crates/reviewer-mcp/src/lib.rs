//! MCP (Model Context Protocol) server for reviewer-tools.
//!
//! Exposes `assign_reviewer`, `list_teams` and `open_review_thread` to AI
//! assistants over newline-delimited JSON-RPC on stdio.

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod transport;

pub use handlers::{ToolError, ToolHandler};
pub use server::McpServer;
