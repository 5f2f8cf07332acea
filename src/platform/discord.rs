use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{Destination, MediaUpload, SendError, SentMessage};
use crate::config::DiscordConfig;

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    id: String,
    username: String,
}

/// Discord REST client for the destination channel
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl DiscordClient {
    /// Open a session: the token is verified against `/users/@me` before any
    /// update is processed.
    pub async fn connect(http: reqwest::Client, config: &DiscordConfig) -> Result<Self> {
        let client = Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        };

        let response = client
            .http
            .get(client.url("/users/@me"))
            .header("Authorization", client.authorization())
            .send()
            .await
            .context("Failed to reach Discord")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Discord API error ({}): {}", status, error_body);
        }

        let me: CurrentUser = response
            .json()
            .await
            .context("Failed to parse Discord user")?;
        info!("Authorized on Discord as {} ({})", me.username, me.id);

        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn post_message(
        &self,
        channel_id: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<SentMessage, SendError> {
        debug!("Posting message to Discord channel {}", channel_id);
        let response = request
            .header("Authorization", self.authorization())
            .send()
            .await?;
        let message: MessageResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SendError::Decode(e.to_string()))?;
        Ok(SentMessage { id: message.id })
    }

    fn messages_url(&self, channel_id: &str) -> String {
        self.url(&format!("/channels/{}/messages", channel_id))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SendError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn file_part(upload: MediaUpload) -> Result<Part, SendError> {
    let MediaUpload {
        file_name,
        content_type,
        body,
    } = upload;

    let len = body.content_length();
    let stream = reqwest::Body::wrap_stream(body.into_stream());
    let part = match len {
        Some(len) => Part::stream_with_length(stream, len),
        None => Part::stream(stream),
    };

    Ok(part.file_name(file_name).mime_str(&content_type)?)
}

#[async_trait]
impl Destination for DiscordClient {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<SentMessage, SendError> {
        let request = self
            .http
            .post(self.messages_url(channel_id))
            .json(&json!({ "content": text }));
        self.post_message(channel_id, request).await
    }

    async fn send_file(
        &self,
        channel_id: &str,
        upload: MediaUpload,
    ) -> Result<SentMessage, SendError> {
        let form = Form::new()
            .percent_encode_noop()
            .part("files[0]", file_part(upload)?);
        let request = self.http.post(self.messages_url(channel_id)).multipart(form);
        self.post_message(channel_id, request).await
    }

    async fn send_file_with_message(
        &self,
        channel_id: &str,
        content: &str,
        upload: MediaUpload,
    ) -> Result<SentMessage, SendError> {
        let form = Form::new()
            .percent_encode_noop()
            .text("payload_json", json!({ "content": content }).to_string())
            .part("files[0]", file_part(upload)?);
        let request = self.http.post(self.messages_url(channel_id)).multipart(form);
        self.post_message(channel_id, request).await
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), SendError> {
        debug!("Editing Discord message {} in {}", message_id, channel_id);
        let response = self
            .http
            .patch(self.url(&format!("/channels/{}/messages/{}", channel_id, message_id)))
            .header("Authorization", self.authorization())
            .json(&json!({ "content": content }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn close(&self) {
        info!("Discord session closed");
    }
}
