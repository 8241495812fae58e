use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::platform::{ChatChannel, IncomingMessage};
use crate::webhook::{ForwardingError, OutboundPayload, WebhookClient};

pub const PROCESSING_ERROR_REPLY: &str =
    "⚠️ Sorry, there was an error processing your request. Make sure n8n is running!";

/// What the relay did with one message event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Authored by a bot account.
    IgnoredBot,
    /// Did not start with the command prefix.
    IgnoredNoPrefix,
    /// Prefix with nothing after it; usage hint sent.
    UsageHint,
    /// Webhook accepted the payload.
    Forwarded,
    /// Webhook call failed; error reply sent.
    Failed,
}

/// Strips `prefix` from the start of `text` and trims the remainder.
/// Matching is case-sensitive and anchored at the first byte.
pub fn extract_command<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix).map(str::trim)
}

pub fn usage_hint(prefix: &str) -> String {
    format!(
        "Please provide a message after the command. Example: `{} Hello`",
        prefix
    )
}

/// Renders a forwarding error with its whole source chain.
pub fn failure_reason(err: ForwardingError) -> String {
    format!("{:#}", anyhow::Error::from(err))
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Forwards prefixed chat messages to the automation webhook.
pub struct Relay {
    config: Arc<Config>,
    webhook: WebhookClient,
}

impl Relay {
    pub fn new(config: Arc<Config>, webhook: WebhookClient) -> Self {
        Self { config, webhook }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handles one message-creation event. Forwarding failures are logged
    /// and reported in-channel; they never propagate to the caller.
    pub async fn handle(&self, msg: &IncomingMessage, channel: &dyn ChatChannel) -> Disposition {
        if msg.author_is_bot {
            return Disposition::IgnoredBot;
        }

        let user_message = match extract_command(&msg.text, &self.config.prefix) {
            Some(text) => text,
            None => return Disposition::IgnoredNoPrefix,
        };

        if user_message.is_empty() {
            if let Err(e) = channel.reply(&usage_hint(&self.config.prefix)).await {
                warn!("Failed to send usage hint: {:#}", e);
            }
            return Disposition::UsageHint;
        }

        info!(
            "[{}] Message from {}: {}",
            now_iso8601(),
            msg.user_name,
            user_message
        );

        // Typing is cosmetic; the forward proceeds whether or not it lands.
        if let Err(e) = channel.send_typing().await {
            debug!("Typing indicator failed: {:#}", e);
        }

        match self.forward(msg, user_message).await {
            Ok(()) => {
                info!("✓ Forwarded to n8n successfully");
                Disposition::Forwarded
            }
            Err(e) => {
                error!("Error forwarding to n8n: {}", failure_reason(e));
                if let Err(e) = channel.reply(PROCESSING_ERROR_REPLY).await {
                    warn!("Failed to send error reply: {:#}", e);
                }
                Disposition::Failed
            }
        }
    }

    async fn forward(&self, msg: &IncomingMessage, content: &str) -> Result<(), ForwardingError> {
        let payload = OutboundPayload {
            content: content.to_string(),
            username: msg.user_name.clone(),
            user_id: msg.user_id.clone(),
            channel_id: msg.channel_id.clone(),
            message_id: msg.message_id.clone(),
            timestamp: now_iso8601(),
        };
        self.webhook.forward(&payload).await
    }
}
