use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{error, info};

use super::{LinkConfig, NotificationEvent, Notifier};
use crate::{MonitorError, Result};

const POST_MESSAGE: &str = "/api/v1/chat.postMessage";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostMessage<'a> {
    room_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tmid: Option<&'a str>,
}

/// Posts messages into one Rocket.Chat room with a personal access token.
pub struct RocketChatNotifier {
    client: Client,
    endpoint: Url,
    user_id: String,
    auth_token: String,
    room_id: String,
    thread_id: Option<String>,
    links: LinkConfig,
}

impl std::fmt::Debug for RocketChatNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocketChatNotifier")
            .field("endpoint", &self.endpoint.as_str())
            .field("user_id", &self.user_id)
            .field("room_id", &self.room_id)
            .finish_non_exhaustive()
    }
}

impl RocketChatNotifier {
    pub fn new(
        host: &str,
        user_id: &str,
        auth_token: &str,
        room_id: &str,
        links: LinkConfig,
    ) -> Result<Self> {
        let endpoint = Url::parse(host)
            .and_then(|base| base.join(POST_MESSAGE))
            .map_err(|e| MonitorError::InvalidInput(format!("invalid chat host {host}: {e}")))?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint,
            user_id: user_id.to_string(),
            auth_token: auth_token.to_string(),
            room_id: room_id.to_string(),
            thread_id: None,
            links,
        })
    }

    /// Posts into a thread instead of the room timeline.
    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        let body = PostMessage {
            room_id: &self.room_id,
            text,
            tmid: self.thread_id.as_deref(),
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-User-Id", &self.user_id)
            .header("X-Auth-Token", &self.auth_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MonitorError::Internal(format!(
                "chat.postMessage returned {status}: {detail}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RocketChatNotifier {
    async fn notify(&self, event: &NotificationEvent) {
        let text = event.render(&self.links);
        match self.send_message(&text).await {
            Ok(()) => info!(room_id = %self.room_id, "notification sent"),
            Err(e) => error!(room_id = %self.room_id, "failed to send notification: {e}"),
        }
    }
}
