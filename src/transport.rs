use anyhow::{Context, Result};
use tracing::info;

use crate::config::ProxyConfig;

fn with_proxy(
    builder: reqwest::ClientBuilder,
    proxy: Option<&ProxyConfig>,
) -> Result<reqwest::ClientBuilder> {
    let Some(proxy) = proxy else {
        return Ok(builder);
    };

    let url = proxy.url()?;
    let proxy = reqwest::Proxy::all(url.as_str()).context("Failed to configure SOCKS5 proxy")?;
    Ok(builder.proxy(proxy))
}

/// Shared client for media downloads and the Discord REST API.
pub fn http_client(proxy: Option<&ProxyConfig>) -> Result<reqwest::Client> {
    if let Some(p) = proxy {
        info!(
            "Routing outbound traffic through SOCKS5 proxy {}:{} (auth: {})",
            p.host,
            p.port,
            p.credentials().is_some()
        );
    }

    with_proxy(reqwest::Client::builder(), proxy)?
        .build()
        .context("Failed to build HTTP client")
}

/// Client for the Telegram bot API, keeping teloxide's long-polling timeouts.
pub fn telegram_client(proxy: Option<&ProxyConfig>) -> Result<reqwest::Client> {
    with_proxy(teloxide::net::default_reqwest_settings(), proxy)?
        .build()
        .context("Failed to build Telegram HTTP client")
}
