use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{debug, info};

use super::{FileResolver, SourceChat};
use crate::relay::update::{AudioRef, ChannelPost, DocumentRef, FileRef, InboundUpdate};
use crate::relay::RelayEngine;

/// Bot API handle for the source channel
#[derive(Clone)]
pub struct TelegramSource {
    bot: Bot,
}

impl TelegramSource {
    /// Log in with `getMe`; fails when the token is rejected or unreachable.
    pub async fn connect(token: &str, client: reqwest::Client) -> Result<Self> {
        let bot = Bot::with_client(token, client);
        let me = bot.get_me().await.context("Failed to authorize Telegram bot")?;
        info!(
            "Authorized on account @{}",
            me.user.username.as_deref().unwrap_or_default()
        );
        Ok(Self { bot })
    }

    #[cfg(test)]
    fn from_bot(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }
}

/// Telegram serves files from `<api>/file/bot<token>/<file_path>`
fn file_url(api_url: &str, token: &str, file_path: &str) -> String {
    format!(
        "{}/file/bot{}/{}",
        api_url.trim_end_matches('/'),
        token,
        file_path
    )
}

#[async_trait]
impl FileResolver for TelegramSource {
    async fn direct_url(&self, file_id: &str) -> Result<String> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .context("getFile request failed")?;
        let api_url = self.bot.api_url();
        Ok(file_url(api_url.as_str(), self.bot.token(), &file.path))
    }
}

#[async_trait]
impl SourceChat for TelegramSource {
    async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .context("sendMessage request failed")?;
        Ok(())
    }
}

impl From<&Message> for ChannelPost {
    fn from(msg: &Message) -> Self {
        ChannelPost {
            message_id: i64::from(msg.id.0),
            text: msg.text().map(str::to_string),
            caption: msg.caption().map(str::to_string),
            photo: msg.photo().map(|sizes| {
                sizes
                    .iter()
                    .map(|ps| FileRef::new(ps.file.id.to_string()))
                    .collect()
            }),
            document: msg.document().map(|d| DocumentRef {
                file: FileRef::new(d.file.id.to_string()),
                file_name: d.file_name.clone(),
            }),
            video: msg.video().map(|v| FileRef::new(v.file.id.to_string())),
            video_note: msg.video_note().map(|v| FileRef::new(v.file.id.to_string())),
            audio: msg.audio().map(|a| AudioRef {
                file: FileRef::new(a.file.id.to_string()),
                performer: a.performer.clone(),
                title: a.title.clone(),
            }),
            voice: msg.voice().map(|v| FileRef::new(v.file.id.to_string())),
        }
    }
}

/// Poll Telegram until Ctrl-C, feeding every update through the engine one at
/// a time.
pub async fn run(bot: Bot, engine: Arc<RelayEngine>) -> Result<()> {
    info!("Starting Telegram update loop...");

    let handler = dptree::entry()
        .branch(Update::filter_channel_post().endpoint(on_channel_post))
        .branch(Update::filter_edited_channel_post().endpoint(on_edited_channel_post))
        .branch(Update::filter_message().endpoint(on_direct_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        // Single queue for every update: strictly sequential processing
        .distribution_function(|_| Some(()))
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Telegram update loop stopped");
    Ok(())
}

async fn on_channel_post(msg: Message, engine: Arc<RelayEngine>) -> ResponseResult<()> {
    engine
        .handle(InboundUpdate::NewPost(ChannelPost::from(&msg)))
        .await;
    Ok(())
}

async fn on_edited_channel_post(msg: Message, engine: Arc<RelayEngine>) -> ResponseResult<()> {
    engine
        .handle(InboundUpdate::EditedPost(ChannelPost::from(&msg)))
        .await;
    Ok(())
}

async fn on_direct_message(msg: Message, engine: Arc<RelayEngine>) -> ResponseResult<()> {
    engine
        .handle(InboundUpdate::DirectMessage {
            chat_id: msg.chat.id.0,
        })
        .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Bytes, extract::State, http::Uri, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::Mutex;

    fn channel_message(payload: serde_json::Value) -> Message {
        let mut value = json!({
            "message_id": 42,
            "date": 1700000000,
            "chat": { "id": -1001234567890i64, "type": "channel", "title": "News" }
        });
        for (k, v) in payload.as_object().unwrap() {
            value[k] = v.clone();
        }
        serde_json::from_value(value).expect("deserialize channel post")
    }

    #[test]
    fn test_text_post_conversion() {
        let post = ChannelPost::from(&channel_message(json!({ "text": "hello" })));
        assert_eq!(post.message_id, 42);
        assert_eq!(post.text(), Some("hello"));
        assert!(post.photo.is_none());
        assert!(post.caption.is_none());
    }

    #[test]
    fn test_photo_post_conversion_keeps_size_order() {
        let post = ChannelPost::from(&channel_message(json!({
            "caption": "cap",
            "photo": [
                { "file_id": "small", "file_unique_id": "s", "width": 90, "height": 90, "file_size": 100 },
                { "file_id": "large", "file_unique_id": "l", "width": 1280, "height": 1280, "file_size": 90000 }
            ]
        })));
        assert_eq!(post.caption(), Some("cap"));
        assert_eq!(
            post.photo,
            Some(vec![FileRef::new("small"), FileRef::new("large")])
        );
    }

    #[test]
    fn test_document_and_audio_conversion() {
        let post = ChannelPost::from(&channel_message(json!({
            "document": {
                "file_id": "doc-1",
                "file_unique_id": "d",
                "file_name": "report.pdf",
                "mime_type": "application/pdf",
                "file_size": 1024
            }
        })));
        assert_eq!(
            post.document,
            Some(DocumentRef {
                file: FileRef::new("doc-1"),
                file_name: Some("report.pdf".to_string()),
            })
        );

        let msg = channel_message(json!({
            "audio": {
                "file_id": "audio-1",
                "file_unique_id": "a",
                "duration": 180,
                "performer": "Band",
                "title": "Song",
                "mime_type": "audio/mpeg",
                "file_size": 4096
            }
        }));
        // An incomplete media object silently parses as an empty message
        assert!(msg.audio().is_some());
        let post = ChannelPost::from(&msg);
        let audio = post.audio.clone().unwrap();
        assert_eq!(audio.file, FileRef::new("audio-1"));
        assert_eq!(audio.performer.as_deref(), Some("Band"));
        assert_eq!(audio.title.as_deref(), Some("Song"));

        let classification = crate::relay::classify::classify(&post);
        assert_eq!(classification.content.kind(), "audio");
    }

    #[test]
    fn test_voice_conversion() {
        let post = ChannelPost::from(&channel_message(json!({
            "voice": {
                "file_id": "voice-file-id",
                "file_unique_id": "voice-unique-id",
                "duration": 1,
                "mime_type": "audio/ogg",
                "file_size": 123
            }
        })));
        assert_eq!(post.voice, Some(FileRef::new("voice-file-id")));
    }

    #[test]
    fn test_file_url() {
        assert_eq!(
            file_url("https://api.telegram.org/", "123:abc", "photos/file_1.jpg"),
            "https://api.telegram.org/file/bot123:abc/photos/file_1.jpg"
        );
    }

    #[derive(Clone, Default)]
    struct MockTelegramApi {
        methods: Arc<Mutex<Vec<String>>>,
    }

    async fn telegram_api_handler(
        State(state): State<MockTelegramApi>,
        uri: Uri,
        body: Bytes,
    ) -> Json<serde_json::Value> {
        let method = uri.path().rsplit('/').next().unwrap_or_default().to_string();
        state.methods.lock().unwrap().push(method.clone());
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();

        match method.as_str() {
            "GetFile" if body["file_id"] == "missing" => Json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: invalid file_id"
            })),
            "GetFile" => Json(json!({
                "ok": true,
                "result": {
                    "file_id": body["file_id"],
                    "file_unique_id": "u1",
                    "file_size": 10,
                    "file_path": "photos/file_1.jpg"
                }
            })),
            "SendMessage" => Json(json!({
                "ok": true,
                "result": {
                    "message_id": 1,
                    "date": 0,
                    "chat": { "id": body["chat_id"], "type": "private", "first_name": "Alice" },
                    "text": body["text"]
                }
            })),
            _ => Json(json!({ "ok": true, "result": true })),
        }
    }

    async fn mock_source() -> (MockTelegramApi, TelegramSource, String) {
        let mock = MockTelegramApi::default();
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(mock.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let api_url = reqwest::Url::parse(&format!("http://{addr}/")).unwrap();
        let bot = Bot::new("test-token").set_api_url(api_url);
        (mock, TelegramSource::from_bot(bot), format!("http://{addr}"))
    }

    #[tokio::test]
    async fn test_direct_url_resolves_file_path() {
        let (mock, source, base) = mock_source().await;

        let url = source.direct_url("file-1").await.unwrap();
        assert_eq!(url, format!("{base}/file/bottest-token/photos/file_1.jpg"));
        assert_eq!(mock.methods.lock().unwrap().as_slice(), ["GetFile"]);
    }

    #[tokio::test]
    async fn test_direct_url_reports_api_error() {
        let (_mock, source, _base) = mock_source().await;

        let err = source.direct_url("missing").await.unwrap_err();
        assert!(format!("{:#}", err).contains("getFile request failed"));
    }

    #[tokio::test]
    async fn test_reply_sends_message() {
        let (mock, source, _base) = mock_source().await;

        source.reply(1001, "just a bot").await.unwrap();
        assert_eq!(mock.methods.lock().unwrap().as_slice(), ["SendMessage"]);
    }
}
