pub mod classify;
pub mod update;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::media::{FetchError, MediaSource};
use crate::platform::{Destination, MediaUpload, SendError, SourceChat};
use crate::store::{PostStore, StoreError};
use classify::{classify, ClassifiedContent};
use update::{ChannelPost, InboundUpdate};

/// What happened to a single update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The post was sent; `recorded` is false when the mapping could not be
    /// stored because one already existed.
    Relayed {
        destination_id: String,
        recorded: bool,
    },
    Unsupported,
    Edited { destination_id: String },
    /// The edit carried neither text nor caption.
    NothingToEdit,
    Replied,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("cannot send to destination: {0}")]
    Send(#[from] SendError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot reply to chat {chat_id}: {reason}")]
    Reply { chat_id: i64, reason: String },
}

/// Relays channel posts to the destination and keeps edits in sync.
pub struct RelayEngine {
    channel_id: String,
    destination: Arc<dyn Destination>,
    media: Arc<dyn MediaSource>,
    source: Arc<dyn SourceChat>,
    store: PostStore,
    stray_reply: String,
}

impl RelayEngine {
    pub fn new(
        channel_id: impl Into<String>,
        destination: Arc<dyn Destination>,
        media: Arc<dyn MediaSource>,
        source: Arc<dyn SourceChat>,
        store: PostStore,
        stray_reply: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            destination,
            media,
            source,
            store,
            stray_reply: stray_reply.into(),
        }
    }

    /// Process one update, logging instead of propagating any failure.
    pub async fn handle(&self, update: InboundUpdate) {
        let label = describe(&update);
        match self.process(update).await {
            Ok(outcome) => debug!("{}: {:?}", label, outcome),
            Err(RelayError::Store(StoreError::NotFound(id))) => {
                warn!("{}: post {} was never relayed, edit dropped", label, id);
            }
            Err(e) => error!("{}: abandoned: {}", label, e),
        }
    }

    pub async fn process(&self, update: InboundUpdate) -> Result<RelayOutcome, RelayError> {
        match update {
            InboundUpdate::NewPost(post) => self.relay_post(&post).await,
            InboundUpdate::EditedPost(post) => self.relay_edit(&post).await,
            InboundUpdate::DirectMessage { chat_id } => {
                self.source
                    .reply(chat_id, &self.stray_reply)
                    .await
                    .map_err(|e| RelayError::Reply {
                        chat_id,
                        reason: format!("{:#}", e),
                    })?;
                Ok(RelayOutcome::Replied)
            }
        }
    }

    async fn relay_post(&self, post: &ChannelPost) -> Result<RelayOutcome, RelayError> {
        let classification = classify(post);
        let content = &classification.content;

        let sent = if let ClassifiedContent::Text(text) = content {
            self.destination.send_text(&self.channel_id, text).await?
        } else if let Some(media) = content.media() {
            let body = self.media.fetch(media.file).await?;
            let upload = MediaUpload {
                file_name: media.file_name,
                content_type: media.content_type.to_string(),
                body,
            };
            match classification.caption.as_deref() {
                Some(caption) => {
                    self.destination
                        .send_file_with_message(&self.channel_id, caption, upload)
                        .await?
                }
                None => self.destination.send_file(&self.channel_id, upload).await?,
            }
        } else {
            debug!("Post {} has no relayable content", post.message_id);
            return Ok(RelayOutcome::Unsupported);
        };

        info!(
            "Relayed {} post {} as message {}",
            content.kind(),
            post.message_id,
            sent.id
        );

        // The message is out; a failed write is logged, not rolled back
        let recorded = match self.store.create(post.message_id, &sent.id).await {
            Ok(()) => true,
            Err(e @ StoreError::UniquenessViolation { .. }) => {
                warn!("Post {} relayed but not recorded: {}", post.message_id, e);
                false
            }
            Err(e) => return Err(e.into()),
        };

        Ok(RelayOutcome::Relayed {
            destination_id: sent.id,
            recorded,
        })
    }

    async fn relay_edit(&self, post: &ChannelPost) -> Result<RelayOutcome, RelayError> {
        let mapping = self.store.find_by_source(post.message_id).await?;

        let Some(body) = post.edit_body() else {
            debug!("Edit of post {} has no text or caption", post.message_id);
            return Ok(RelayOutcome::NothingToEdit);
        };

        self.destination
            .edit_message(&self.channel_id, &mapping.destination_message_id, body)
            .await?;

        info!(
            "Edited message {} for post {}",
            mapping.destination_message_id, post.message_id
        );
        Ok(RelayOutcome::Edited {
            destination_id: mapping.destination_message_id,
        })
    }
}

fn describe(update: &InboundUpdate) -> String {
    match update {
        InboundUpdate::NewPost(post) => format!("new post {}", post.message_id),
        InboundUpdate::EditedPost(post) => format!("edited post {}", post.message_id),
        InboundUpdate::DirectMessage { chat_id } => format!("direct message in {}", chat_id),
    }
}
