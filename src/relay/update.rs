/// Opaque reference to a file stored on the source platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub id: String,
}

impl FileRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub file: FileRef,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRef {
    pub file: FileRef,
    pub performer: Option<String>,
    pub title: Option<String>,
}

/// A channel post as seen by the relay, one optional field per payload kind.
///
/// More than one payload field may be populated; the classifier decides
/// which one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelPost {
    pub message_id: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
    /// Photo sizes, smallest first.
    pub photo: Option<Vec<FileRef>>,
    pub document: Option<DocumentRef>,
    pub video: Option<FileRef>,
    pub video_note: Option<FileRef>,
    pub audio: Option<AudioRef>,
    pub voice: Option<FileRef>,
}

impl ChannelPost {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref().filter(|c| !c.is_empty())
    }

    /// New body for an edited post: text first, caption otherwise.
    pub fn edit_body(&self) -> Option<&str> {
        self.text().or_else(|| self.caption())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUpdate {
    NewPost(ChannelPost),
    EditedPost(ChannelPost),
    /// Someone wrote to the bot directly.
    DirectMessage { chat_id: i64 },
}
