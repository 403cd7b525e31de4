//! Google Chat webhook payloads.

use serde::{Deserialize, Serialize};

/// Message posted to a webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub text: String,
    pub thread: ChatThread,
}

/// Thread a message is posted into.
///
/// Resource names (`spaces/<space>/threads/<thread>`) address an existing
/// thread; any other key is a client-chosen thread key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatThread {
    Name { name: String },
    Key {
        #[serde(rename = "threadKey")]
        thread_key: String,
    },
}

impl ChatThread {
    pub fn from_key(key: &str) -> Self {
        if key.starts_with("spaces/") {
            ChatThread::Name {
                name: key.to_string(),
            }
        } else {
            ChatThread::Key {
                thread_key: key.to_string(),
            }
        }
    }
}

/// Message returned by the webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessageResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub thread: Option<ChatThreadResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatThreadResponse {
    #[serde(default)]
    pub name: Option<String>,
}
