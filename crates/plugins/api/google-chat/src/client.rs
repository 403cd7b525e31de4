//! Google Chat webhook client.

use async_trait::async_trait;
use reviewer_core::{Error, Notifier, Result};
use tracing::{debug, warn};

use crate::types::{ChatMessage, ChatMessageResponse, ChatThread};

/// Replies go into the thread when it exists, otherwise start a new one.
const REPLY_OPTION: &str = "messageReplyOption=REPLY_MESSAGE_FALLBACK_TO_NEW_THREAD";

/// Google Chat webhook client.
#[derive(Clone, Default)]
pub struct GoogleChatClient {
    client: reqwest::Client,
}

impl GoogleChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post `text` into `thread_key` and return the created message.
    pub async fn send(
        &self,
        webhook_url: &str,
        thread_key: &str,
        text: &str,
    ) -> Result<ChatMessageResponse> {
        let url = reply_url(webhook_url);
        let message = ChatMessage {
            text: text.to_string(),
            thread: ChatThread::from_key(thread_key),
        };

        debug!(thread_key, "Google Chat POST request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json; charset=UTF-8")
            .json(&message)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "Google Chat webhook error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        // An unparseable body still means the message was accepted
        Ok(response.json().await.unwrap_or_default())
    }
}

#[async_trait]
impl Notifier for GoogleChatClient {
    async fn post_message(&self, webhook_url: &str, thread_key: &str, text: &str) -> Result<()> {
        let created = self.send(webhook_url, thread_key, text).await?;
        debug!(
            message = created.name.as_deref().unwrap_or_default(),
            thread = created
                .thread
                .as_ref()
                .and_then(|t| t.name.as_deref())
                .unwrap_or_default(),
            "Message posted"
        );
        Ok(())
    }
}

fn reply_url(webhook_url: &str) -> String {
    let separator = if webhook_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", webhook_url, separator, REPLY_OPTION)
}

/// Thread resource name from a Google Chat web link.
///
/// `https://chat.google.com/room/<space>/<thread>?cls=7` becomes
/// `spaces/<space>/threads/<thread>`. Returns `None` for links that do not
/// point at a thread.
pub fn thread_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let mut segments = path.split('/').skip_while(|s| *s != "room").skip(1);
    let space = segments.next().filter(|s| !s.is_empty())?;
    let thread = segments.next().filter(|s| !s.is_empty())?;
    Some(format!("spaces/{}/threads/{}", space, thread))
}
