mod config;
mod media;
mod platform;
mod relay;
mod store;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::media::MediaFetcher;
use crate::platform::discord::DiscordClient;
use crate::platform::telegram::{self, TelegramSource};
use crate::platform::Destination;
use crate::relay::RelayEngine;
use crate::store::PostStore;

/// Exit status for a missing or unusable configuration file
const EXIT_BAD_CONFIG: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reposter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(config_path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("Usage: reposter <config.toml>");
        std::process::exit(EXIT_BAD_CONFIG);
    };

    info!("Loading configuration from: {}", config_path.display());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Incorrect config path or contents: {:#}", e);
            std::process::exit(EXIT_BAD_CONFIG);
        }
    };

    info!("Configuration loaded successfully");
    info!("  Database: {}", config.database.display());
    info!("  Discord channel: {}", config.discord.channel_id);
    info!("  Proxy: {}", config.proxy.is_some());

    let http = transport::http_client(config.proxy.as_ref())?;

    let discord = DiscordClient::connect(http.clone(), &config.discord)
        .await
        .context("Discord session cannot be established")?;
    let destination: Arc<dyn Destination> = Arc::new(discord);

    let tg_client = transport::telegram_client(config.proxy.as_ref())?;
    let source = Arc::new(
        TelegramSource::connect(&config.telegram.token, tg_client)
            .await
            .context("Telegram bot cannot be initialized")?,
    );

    let store = PostStore::open(&config.database).context("Database cannot be initialized")?;

    let media = Arc::new(MediaFetcher::new(source.clone(), http));
    let engine = Arc::new(RelayEngine::new(
        config.discord.channel_id.clone(),
        destination.clone(),
        media,
        source.clone(),
        store,
        config.telegram.stray_reply.clone(),
    ));

    info!("Relay is starting...");
    telegram::run(source.bot(), engine).await?;

    destination.close().await;
    info!("Shut down");

    Ok(())
}
