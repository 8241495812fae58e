use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_WEBHOOK_URL: &str = "http://n8n:5678/webhook/discord-claude";
pub const DEFAULT_PREFIX: &str = "!claude";

pub const ENV_BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_WEBHOOK_URL: &str = "N8N_WEBHOOK_URL";
pub const ENV_PREFIX: &str = "BOT_PREFIX";

/// Immutable process-wide settings, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub token: String,
    pub webhook_url: String,
    pub prefix: String,
}

/// On-disk shape of `config.toml`. Every field is optional so the file can
/// carry only what the environment doesn't.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub webhook: WebhookSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct DiscordSection {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WebhookSection {
    #[serde(default)]
    pub url: Option<String>,
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Reads `path`. When `required` is false a missing file yields an
    /// empty config instead of an error.
    pub fn read(path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Merges defaults, file values and environment lookups (highest wins).
    pub fn from_sources<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = non_empty(lookup(ENV_BOT_TOKEN))
            .or_else(|| non_empty(file.discord.bot_token))
            .with_context(|| format!("{} environment variable is required!", ENV_BOT_TOKEN))?;

        let webhook_url = non_empty(lookup(ENV_WEBHOOK_URL))
            .or_else(|| non_empty(file.webhook.url))
            .unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string());

        let prefix = non_empty(lookup(ENV_PREFIX))
            .or_else(|| non_empty(file.discord.prefix))
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        Ok(Self {
            token,
            webhook_url,
            prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let err = Config::from_sources(FileConfig::default(), env(&[])).unwrap_err();
        assert!(err.to_string().contains("DISCORD_BOT_TOKEN"));
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let result = Config::from_sources(FileConfig::default(), env(&[(ENV_BOT_TOKEN, "  ")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_applied() {
        let config =
            Config::from_sources(FileConfig::default(), env(&[(ENV_BOT_TOKEN, "abc")])).unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.webhook_url, DEFAULT_WEBHOOK_URL);
        assert_eq!(config.prefix, DEFAULT_PREFIX);
    }

    #[test]
    fn test_file_values_used_when_env_unset() {
        let file = FileConfig::parse(
            r#"
[discord]
bot_token = "from-file"
prefix = "!bot"

[webhook]
url = "http://localhost:9000/hook"
"#,
        )
        .unwrap();
        let config = Config::from_sources(file, env(&[])).unwrap();
        assert_eq!(config.token, "from-file");
        assert_eq!(config.prefix, "!bot");
        assert_eq!(config.webhook_url, "http://localhost:9000/hook");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileConfig::parse(
            r#"
[discord]
bot_token = "from-file"
prefix = "!bot"
"#,
        )
        .unwrap();
        let config = Config::from_sources(
            file,
            env(&[
                (ENV_BOT_TOKEN, "from-env"),
                (ENV_PREFIX, "!ask"),
                (ENV_WEBHOOK_URL, "http://hooks/relay"),
            ]),
        )
        .unwrap();
        assert_eq!(config.token, "from-env");
        assert_eq!(config.prefix, "!ask");
        assert_eq!(config.webhook_url, "http://hooks/relay");
    }

    #[test]
    fn test_optional_missing_file_is_empty() {
        let file = FileConfig::read(Path::new("/nonexistent/relaybot.toml"), false).unwrap();
        assert!(file.discord.bot_token.is_none());
        assert!(file.webhook.url.is_none());
    }

    #[test]
    fn test_required_missing_file_is_an_error() {
        assert!(FileConfig::read(Path::new("/nonexistent/relaybot.toml"), true).is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(FileConfig::parse("[discord\nbot_token = ").is_err());
    }
}
