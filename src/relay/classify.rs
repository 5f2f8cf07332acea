use super::update::{ChannelPost, FileRef};

/// The single payload a post is relayed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedContent {
    Text(String),
    Photo(FileRef),
    Document {
        file: FileRef,
        file_name: Option<String>,
    },
    Video(FileRef),
    VideoNote(FileRef),
    Audio {
        file: FileRef,
        performer: Option<String>,
        title: Option<String>,
    },
    Voice(FileRef),
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub content: ClassifiedContent,
    pub caption: Option<String>,
}

/// How a media payload is labelled when uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSpec<'a> {
    pub file: &'a FileRef,
    pub file_name: String,
    pub content_type: &'static str,
}

impl ClassifiedContent {
    /// `None` for text and unsupported content.
    pub fn media(&self) -> Option<MediaSpec<'_>> {
        let (file, file_name, content_type) = match self {
            ClassifiedContent::Text(_) | ClassifiedContent::Unsupported => return None,
            ClassifiedContent::Photo(file) => (file, "photo.jpg".to_string(), "image/jpeg"),
            ClassifiedContent::Document { file, file_name } => (
                file,
                file_name.clone().unwrap_or_else(|| "document".to_string()),
                "application/octet-stream",
            ),
            ClassifiedContent::Video(file) => (file, "video.mp4".to_string(), "video/mp4"),
            ClassifiedContent::VideoNote(file) => {
                (file, "videonote.mp4".to_string(), "video/mp4")
            }
            ClassifiedContent::Audio {
                file,
                performer,
                title,
            } => (
                file,
                format!(
                    "{} - {}.mp3",
                    performer.as_deref().unwrap_or_default(),
                    title.as_deref().unwrap_or_default()
                ),
                "audio/mpeg",
            ),
            ClassifiedContent::Voice(file) => (file, "voice.ogg".to_string(), "audio/ogg"),
        };

        Some(MediaSpec {
            file,
            file_name,
            content_type,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedContent::Text(_) => "text",
            ClassifiedContent::Photo(_) => "photo",
            ClassifiedContent::Document { .. } => "document",
            ClassifiedContent::Video(_) => "video",
            ClassifiedContent::VideoNote(_) => "video_note",
            ClassifiedContent::Audio { .. } => "audio",
            ClassifiedContent::Voice(_) => "voice",
            ClassifiedContent::Unsupported => "unsupported",
        }
    }
}

/// Pick the one payload a post carries.
///
/// Priority: text, photo, document, video, video note, audio, voice. A photo
/// field with no sizes still claims the post and yields `Unsupported`.
pub fn classify(post: &ChannelPost) -> Classification {
    let content = if let Some(text) = post.text() {
        ClassifiedContent::Text(text.to_string())
    } else if let Some(sizes) = &post.photo {
        // Largest size is last
        sizes
            .last()
            .cloned()
            .map(ClassifiedContent::Photo)
            .unwrap_or(ClassifiedContent::Unsupported)
    } else if let Some(doc) = &post.document {
        ClassifiedContent::Document {
            file: doc.file.clone(),
            file_name: doc.file_name.clone(),
        }
    } else if let Some(video) = &post.video {
        ClassifiedContent::Video(video.clone())
    } else if let Some(note) = &post.video_note {
        ClassifiedContent::VideoNote(note.clone())
    } else if let Some(audio) = &post.audio {
        ClassifiedContent::Audio {
            file: audio.file.clone(),
            performer: audio.performer.clone(),
            title: audio.title.clone(),
        }
    } else if let Some(voice) = &post.voice {
        ClassifiedContent::Voice(voice.clone())
    } else {
        ClassifiedContent::Unsupported
    };

    Classification {
        content,
        caption: post.caption().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::update::{AudioRef, DocumentRef};

    fn file(id: &str) -> FileRef {
        FileRef::new(id)
    }

    #[test]
    fn test_text_post() {
        let post = ChannelPost {
            message_id: 1,
            text: Some("hello".to_string()),
            ..Default::default()
        };
        let c = classify(&post);
        assert_eq!(c.content, ClassifiedContent::Text("hello".to_string()));
        assert!(c.caption.is_none());
        assert!(c.content.media().is_none());
    }

    #[test]
    fn test_text_wins_over_media() {
        let post = ChannelPost {
            text: Some("hello".to_string()),
            photo: Some(vec![file("p1")]),
            voice: Some(file("v1")),
            ..Default::default()
        };
        assert_eq!(
            classify(&post).content,
            ClassifiedContent::Text("hello".to_string())
        );
    }

    #[test]
    fn test_empty_text_falls_through() {
        let post = ChannelPost {
            text: Some(String::new()),
            voice: Some(file("v1")),
            ..Default::default()
        };
        assert_eq!(classify(&post).content, ClassifiedContent::Voice(file("v1")));
    }

    #[test]
    fn test_photo_picks_largest_size() {
        let post = ChannelPost {
            photo: Some(vec![file("small"), file("medium"), file("large")]),
            caption: Some("cap".to_string()),
            ..Default::default()
        };
        let c = classify(&post);
        assert_eq!(c.content, ClassifiedContent::Photo(file("large")));
        assert_eq!(c.caption.as_deref(), Some("cap"));

        let media = c.content.media().unwrap();
        assert_eq!(media.file.id, "large");
        assert_eq!(media.file_name, "photo.jpg");
        assert_eq!(media.content_type, "image/jpeg");
    }

    #[test]
    fn test_empty_photo_list_is_unsupported() {
        let post = ChannelPost {
            photo: Some(Vec::new()),
            document: Some(DocumentRef {
                file: file("d1"),
                file_name: Some("a.pdf".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(classify(&post).content, ClassifiedContent::Unsupported);
    }

    #[test]
    fn test_priority_order() {
        let full = ChannelPost {
            photo: Some(vec![file("p")]),
            document: Some(DocumentRef {
                file: file("d"),
                file_name: Some("report.pdf".to_string()),
            }),
            video: Some(file("v")),
            video_note: Some(file("n")),
            audio: Some(AudioRef {
                file: file("a"),
                performer: Some("Band".to_string()),
                title: Some("Song".to_string()),
            }),
            voice: Some(file("o")),
            ..Default::default()
        };

        let mut post = full.clone();
        let mut seen = Vec::new();
        loop {
            let content = classify(&post).content;
            seen.push(content.kind());
            match content {
                ClassifiedContent::Photo(_) => post.photo = None,
                ClassifiedContent::Document { .. } => post.document = None,
                ClassifiedContent::Video(_) => post.video = None,
                ClassifiedContent::VideoNote(_) => post.video_note = None,
                ClassifiedContent::Audio { .. } => post.audio = None,
                ClassifiedContent::Voice(_) => post.voice = None,
                ClassifiedContent::Text(_) | ClassifiedContent::Unsupported => break,
            }
        }

        assert_eq!(
            seen,
            vec![
                "photo",
                "document",
                "video",
                "video_note",
                "audio",
                "voice",
                "unsupported"
            ]
        );
    }

    #[test]
    fn test_media_labels() {
        let cases = [
            (
                ClassifiedContent::Document {
                    file: file("d"),
                    file_name: Some("report.pdf".to_string()),
                },
                "report.pdf",
                "application/octet-stream",
            ),
            (
                ClassifiedContent::Document {
                    file: file("d"),
                    file_name: None,
                },
                "document",
                "application/octet-stream",
            ),
            (ClassifiedContent::Video(file("v")), "video.mp4", "video/mp4"),
            (
                ClassifiedContent::VideoNote(file("n")),
                "videonote.mp4",
                "video/mp4",
            ),
            (
                ClassifiedContent::Audio {
                    file: file("a"),
                    performer: Some("Band".to_string()),
                    title: Some("Song".to_string()),
                },
                "Band - Song.mp3",
                "audio/mpeg",
            ),
            (ClassifiedContent::Voice(file("o")), "voice.ogg", "audio/ogg"),
        ];

        for (content, name, content_type) in cases {
            let media = content.media().unwrap();
            assert_eq!(media.file_name, name);
            assert_eq!(media.content_type, content_type);
        }
    }

    #[test]
    fn test_audio_without_tags() {
        let content = ClassifiedContent::Audio {
            file: file("a"),
            performer: None,
            title: Some("Untitled".to_string()),
        };
        assert_eq!(content.media().unwrap().file_name, " - Untitled.mp3");
    }

    #[test]
    fn test_post_without_payload_is_unsupported() {
        let post = ChannelPost {
            message_id: 7,
            caption: Some("orphan caption".to_string()),
            ..Default::default()
        };
        let c = classify(&post);
        assert_eq!(c.content, ClassifiedContent::Unsupported);
        assert!(c.content.media().is_none());
    }
}
