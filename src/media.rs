use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::debug;

use crate::platform::FileResolver;
use crate::relay::update::FileRef;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot resolve download URL for file {file_id}: {reason}")]
    UrlResolution { file_id: String, reason: String },

    // reqwest errors are stored without their URL, which carries the bot token
    #[error("cannot download file {file_id}: {source}")]
    NetworkGet {
        file_id: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Streamed media contents, consumed once by the upload.
pub struct MediaBody {
    stream: BoxStream<'static, Result<Bytes, FetchError>>,
    len: Option<u64>,
}

impl MediaBody {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let len = Some(bytes.len() as u64);
        Self {
            stream: stream::once(async move { Ok::<_, FetchError>(bytes) }).boxed(),
            len,
        }
    }

    fn from_response(file_id: String, response: reqwest::Response) -> Self {
        let len = response.content_length();
        let stream = response
            .bytes_stream()
            .map_err(move |e| FetchError::NetworkGet {
                file_id: file_id.clone(),
                source: e.without_url(),
            })
            .boxed();
        Self { stream, len }
    }

    /// Content length, when the server announced one.
    pub fn content_length(&self) -> Option<u64> {
        self.len
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes, FetchError>> {
        self.stream
    }

    /// Drain the stream into memory.
    #[cfg(test)]
    pub async fn into_bytes(self) -> Result<Bytes, FetchError> {
        self.stream
            .try_fold(bytes::BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .map(bytes::BytesMut::freeze)
    }
}

impl fmt::Debug for MediaBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBody").field("len", &self.len).finish()
    }
}

/// Turns a file reference into its bytes.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self, file: &FileRef) -> Result<MediaBody, FetchError>;
}

/// Resolves the file through the source platform, then downloads it over the
/// shared (possibly proxied) HTTP client.
pub struct MediaFetcher {
    resolver: Arc<dyn FileResolver>,
    http: reqwest::Client,
}

impl MediaFetcher {
    pub fn new(resolver: Arc<dyn FileResolver>, http: reqwest::Client) -> Self {
        Self { resolver, http }
    }
}

#[async_trait]
impl MediaSource for MediaFetcher {
    async fn fetch(&self, file: &FileRef) -> Result<MediaBody, FetchError> {
        let url = self
            .resolver
            .direct_url(&file.id)
            .await
            .map_err(|e| FetchError::UrlResolution {
                file_id: file.id.clone(),
                reason: format!("{:#}", e),
            })?;

        debug!("Downloading file {}", file.id);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| FetchError::NetworkGet {
                file_id: file.id.clone(),
                source: e.without_url(),
            })?;

        Ok(MediaBody::from_response(file.id.clone(), response))
    }
}
