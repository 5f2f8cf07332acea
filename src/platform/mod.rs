pub mod discord;
pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use crate::media::MediaBody;

/// A file ready to be uploaded to the destination channel
#[derive(Debug)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub body: MediaBody,
}

/// Message created on the destination platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Where relayed posts end up.
#[async_trait]
pub trait Destination: Send + Sync {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<SentMessage, SendError>;

    /// Upload a file with no message body.
    async fn send_file(
        &self,
        channel_id: &str,
        upload: MediaUpload,
    ) -> Result<SentMessage, SendError>;

    /// Upload a file with `content` as the body of the same message.
    async fn send_file_with_message(
        &self,
        channel_id: &str,
        content: &str,
        upload: MediaUpload,
    ) -> Result<SentMessage, SendError>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), SendError>;

    /// Release the session at shutdown.
    async fn close(&self);
}

/// Resolves source platform file ids to direct download URLs.
#[async_trait]
pub trait FileResolver: Send + Sync {
    async fn direct_url(&self, file_id: &str) -> anyhow::Result<String>;
}

/// Replies to chats on the source platform.
#[async_trait]
pub trait SourceChat: Send + Sync {
    async fn reply(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
}
