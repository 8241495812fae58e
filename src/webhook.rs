use std::time::Duration;

use serde::Serialize;
use tracing::debug;

/// Upper bound on a single webhook call; the automation side may run a
/// long model invocation before answering.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(120);

/// JSON body posted to the automation webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPayload {
    pub content: String,
    pub username: String,
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardingError {
    #[error("timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    #[error("request failed")]
    Transport(#[source] reqwest::Error),

    #[error("request failed with status code {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to build webhook client")]
    Client(#[source] reqwest::Error),
}

impl ForwardingError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ForwardingError::Timeout(timeout)
        } else {
            ForwardingError::Transport(err)
        }
    }
}

/// Posts payloads to a single configured webhook URL.
pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ForwardingError> {
        Self::with_timeout(url, WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, ForwardingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ForwardingError::Client)?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    /// Sends one payload. Any response with a success status counts as
    /// delivered; the body is ignored.
    pub async fn forward(&self, payload: &OutboundPayload) -> Result<(), ForwardingError> {
        debug!("Posting message {} to {}", payload.message_id, self.url);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ForwardingError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForwardingError::Status(status));
        }

        Ok(())
    }
}
