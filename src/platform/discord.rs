use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{Client, Context, EventHandler, GatewayIntents, Message, Ready};
use tracing::{debug, info};

use crate::platform::{ChatChannel, IncomingMessage};
use crate::relay::Relay;

/// Guild messages plus their text; nothing else is needed.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// The channel a Discord message arrived in.
struct DiscordChannel<'a> {
    ctx: &'a Context,
    msg: &'a Message,
}

#[async_trait]
impl ChatChannel for DiscordChannel<'_> {
    async fn reply(&self, text: &str) -> Result<()> {
        self.msg
            .reply(self.ctx, text)
            .await
            .context("Failed to reply on Discord")?;
        Ok(())
    }

    async fn send_typing(&self) -> Result<()> {
        self.msg
            .channel_id
            .broadcast_typing(&self.ctx.http)
            .await
            .context("Failed to send typing indicator")
    }
}

fn to_incoming(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        user_id: msg.author.id.to_string(),
        user_name: msg.author.name.clone(),
        author_is_bot: msg.author.bot,
        channel_id: msg.channel_id.to_string(),
        message_id: msg.id.to_string(),
        text: msg.content.clone(),
    }
}

struct Handler {
    relay: Arc<Relay>,
    announced: AtomicBool,
}

impl Handler {
    fn new(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            announced: AtomicBool::new(false),
        }
    }

    /// True only for the first session; reconnects re-fire `ready`.
    fn first_ready(&self) -> bool {
        !self.announced.swap(true, Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        if !self.first_ready() {
            debug!("Gateway session resumed as {}", ready.user.tag());
            return;
        }

        let config = self.relay.config();
        info!("========================================");
        info!("✓ Discord bot logged in as {}", ready.user.tag());
        info!("✓ Forwarding to: {}", config.webhook_url);
        info!("✓ Listening for: {} <message>", config.prefix);
        info!("========================================");
        info!("Bot is ready! Example: {} Tell me a joke", config.prefix);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let incoming = to_incoming(&msg);
        let channel = DiscordChannel {
            ctx: &ctx,
            msg: &msg,
        };
        let disposition = self.relay.handle(&incoming, &channel).await;
        debug!("Message {} handled: {:?}", incoming.message_id, disposition);
    }
}

/// Connect to the Discord gateway and dispatch events until shutdown.
/// Returns an error if the session cannot be established.
pub async fn run(relay: Arc<Relay>) -> Result<()> {
    info!("Starting Discord bot...");

    let token = relay.config().token.clone();
    let mut client = Client::builder(&token, intents())
        .event_handler(Handler::new(relay))
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        result = client.start() => {
            result.context("Failed to login to Discord")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            shard_manager.shutdown_all().await;
        }
    }

    Ok(())
}
