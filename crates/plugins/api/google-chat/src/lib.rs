//! Google Chat notifier for reviewer-tools.
//!
//! Posts messages to a space through its incoming webhook, replying in a
//! thread identified either by a client-chosen key or by a resource name.

mod client;
mod types;

pub use client::{thread_name_from_url, GoogleChatClient};
pub use types::*;
