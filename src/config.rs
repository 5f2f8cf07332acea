use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub database: PathBuf,
    pub telegram: TelegramConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub token: String,
    /// Reply sent to anyone who writes to the bot directly.
    #[serde(default = "default_stray_reply")]
    pub stray_reply: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub channel_id: String,
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
}

/// SOCKS5 proxy used for every outbound request to both platforms.
#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Username/password pair, only when both halves are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user, password))
            }
            _ => None,
        }
    }

    /// `socks5h://` so hostnames are resolved on the proxy side.
    pub fn url(&self) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("socks5h://{}:{}", self.host, self.port))
            .with_context(|| format!("Invalid proxy address {}:{}", self.host, self.port))?;

        if let Some((user, password)) = self.credentials() {
            url.set_username(user)
                .map_err(|_| anyhow::anyhow!("Proxy URL cannot carry a username"))?;
            url.set_password(Some(password))
                .map_err(|_| anyhow::anyhow!("Proxy URL cannot carry a password"))?;
        }

        Ok(url)
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("reposter.db")
}

fn default_stray_reply() -> String {
    "I'm just a bot. Why would you care what I'm up to?".to_string()
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            bail!("[telegram] token must not be empty");
        }
        if self.discord.token.trim().is_empty() {
            bail!("[discord] token must not be empty");
        }
        if self.discord.channel_id.trim().is_empty() {
            bail!("[discord] channel_id must not be empty");
        }
        if let Some(proxy) = &self.proxy {
            if proxy.host.trim().is_empty() {
                bail!("[proxy] host must not be empty");
            }
            if proxy.port == 0 {
                bail!("[proxy] port must not be 0");
            }
            proxy.url().context("[proxy] settings do not form a valid address")?;
        }
        Ok(())
    }
}
