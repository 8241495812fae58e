mod config;
mod platform;
mod relay;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, FileConfig};
use crate::relay::Relay;
use crate::webhook::WebhookClient;

/// Route panics from event tasks into the log; tokio keeps the process alive.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Unhandled fault: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    install_panic_hook();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // An explicit path must exist; the default one is optional
    let (config_path, required) = match std::env::args().nth(1) {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from("config.toml"), false),
    };

    let file = FileConfig::read(&config_path, required)?;
    serve(file, |key| std::env::var(key).ok()).await
}

/// Validates configuration, then runs the gateway until shutdown.
async fn serve<F>(file: FileConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let config = Config::from_sources(file, lookup)?;

    info!("Configuration loaded");
    info!("  Webhook: {}", config.webhook_url);
    info!("  Prefix: {}", config.prefix);

    let webhook = WebhookClient::new(config.webhook_url.clone())?;
    let relay = Arc::new(Relay::new(Arc::new(config), webhook));

    platform::discord::run(relay)
        .await
        .context("Please check your DISCORD_BOT_TOKEN environment variable")?;

    info!("Relay stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_missing_token_fails_before_connecting() {
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            serve(FileConfig::default(), |_| None),
        )
        .await
        .expect("startup without a token must not wait on the gateway");

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("DISCORD_BOT_TOKEN environment variable is required"));
        assert!(!message.contains("Failed to login"));
        assert!(!message.contains("Failed to create Discord client"));
    }
}
