pub mod discord;

use anyhow::Result;
use async_trait::async_trait;

/// A chat message as delivered by the gateway, stripped of platform types.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform-specific user ID as string
    pub user_id: String,
    /// Username of the author
    pub user_name: String,
    /// Whether the author is a bot account
    pub author_is_bot: bool,
    /// Platform-specific channel ID as string
    pub channel_id: String,
    /// Platform-specific message ID as string
    pub message_id: String,
    /// The message text
    pub text: String,
}

/// The originating channel of a message, as seen by the relay.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Reply to the originating message.
    async fn reply(&self, text: &str) -> Result<()>;

    /// Show the typing indicator in the channel.
    async fn send_typing(&self) -> Result<()>;
}
